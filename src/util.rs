//! Small utility helpers used across modules.

use std::path::{Component, Path, PathBuf};

use crate::error::{Result, TrainerError};

/// True if the char lies in the CJK Unified Ideographs block (U+4E00..=U+9FFF).
/// This is the only range the direction heuristics look at.
pub fn is_cjk(ch: char) -> bool {
  ('\u{4E00}'..='\u{9FFF}').contains(&ch)
}

/// True if any char of `s` is CJK.
pub fn contains_cjk(s: &str) -> bool {
  s.chars().any(is_cjk)
}

/// Looks like a plain English term: ASCII letters, whitespace, `-` and `'` only.
pub fn is_english_word(s: &str) -> bool {
  !s.is_empty()
    && s
      .chars()
      .all(|c| c.is_ascii_alphabetic() || c.is_whitespace() || c == '-' || c == '\'')
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with whole input lines.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  match s.char_indices().nth(max) {
    None => s.to_string(),
    Some((cut, _)) => format!("{}… ({} bytes total)", &s[..cut], s.len()),
  }
}

/// Join a client-supplied path onto `root`. Only plain relative paths are
/// accepted: absolute paths, drive prefixes and `..` are rejected.
pub fn resolve_within(root: &Path, requested: &Path) -> Result<PathBuf> {
  let plain = requested
    .components()
    .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
  if !plain || requested.file_name().is_none() {
    return Err(TrainerError::InvalidRequest(format!(
      "path must be relative to the output root without '..': {}",
      requested.display()
    )));
  }
  Ok(root.join(requested))
}

/// Fresh per-test directory under the system temp dir.
#[cfg(test)]
pub fn scratch_dir() -> std::path::PathBuf {
  let dir = std::env::temp_dir().join(format!("vocab-drill-{}", uuid::Uuid::new_v4()));
  std::fs::create_dir_all(&dir).expect("create scratch dir");
  dir
}
