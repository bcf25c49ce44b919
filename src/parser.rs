//! Heuristic record parser: raw line or table cells → optional `WordPair`.
//!
//! Text lines go through an ordered list of independent rules; the first rule
//! that produces a pair wins. Table rows (CSV, Markdown) skip the line rules and
//! use the column heuristic on pre-split cells. Nothing here fails loudly: an
//! unparseable record is `None` and the caller skips it.

use crate::domain::WordPair;
use crate::util::{contains_cjk, is_english_word};

type LineRule = fn(&str) -> Option<WordPair>;

/// Tried in order, first match wins.
const LINE_RULES: &[(&str, LineRule)] = &[
  ("pipe", parse_pipe_fields),
  ("separator", parse_single_separator),
  ("whitespace", parse_whitespace_tokens),
];

/// Separators for the single-split rule, highest priority first.
const SEPARATORS: &[&str] = &[",", "：", ":", "\t", "  "];

/// Parse one line of a `.txt` vocabulary file.
pub fn parse_line(line: &str) -> Option<WordPair> {
  let line = line.trim();
  if line.is_empty() {
    return None;
  }
  LINE_RULES.iter().find_map(|(_, rule)| rule(line))
}

/// Name of the rule that accepts `line`, if any.
#[cfg(test)]
fn matching_rule(line: &str) -> Option<&'static str> {
  let line = line.trim();
  LINE_RULES
    .iter()
    .find(|(_, rule)| rule(line).is_some())
    .map(|(name, _)| *name)
}

/// `word|pos|meaning...` with at least three fields; the meaning keeps any extra `|`.
fn parse_pipe_fields(line: &str) -> Option<WordPair> {
  if !line.contains('|') {
    return None;
  }
  let parts: Vec<&str> = line.split('|').collect();
  if parts.len() < 3 {
    return None;
  }
  let english = parts[0].trim();
  let meaning = parts[2..].join("|");
  let meaning = meaning.trim();
  if english.is_empty() || meaning.is_empty() || contains_cjk(english) {
    return None;
  }
  Some(WordPair::new(english, meaning))
}

/// Split once on the first separator present; the CJK-bearing side is Chinese.
fn parse_single_separator(line: &str) -> Option<WordPair> {
  let sep = SEPARATORS.iter().find(|sep| line.contains(**sep))?;
  let (first, second) = line.split_once(sep)?;
  let (first, second) = (first.trim(), second.trim());
  if first.is_empty() || second.is_empty() {
    return None;
  }
  if contains_cjk(first) {
    Some(WordPair::new(second, first))
  } else {
    Some(WordPair::new(first, second))
  }
}

/// Classify whitespace tokens by script and join each side back with spaces.
fn parse_whitespace_tokens(line: &str) -> Option<WordPair> {
  let (chinese, english): (Vec<&str>, Vec<&str>) =
    line.split_whitespace().partition(|tok| contains_cjk(tok));
  if english.is_empty() || chinese.is_empty() {
    return None;
  }
  Some(WordPair::new(english.join(" "), chinese.join(" ")))
}

/// Column heuristic for table rows: column 0 is the candidate term, column 2
/// the candidate meaning. Needs at least three cells.
///
/// An English-looking term with a CJK meaning is taken as is. A CJK term with a
/// CJK-free meaning is swapped. Anything undecided keeps column 0 as English.
pub fn parse_cells<S: AsRef<str>>(cells: &[S]) -> Option<WordPair> {
  if cells.len() < 3 {
    return None;
  }
  let term = cells[0].as_ref().trim();
  let meaning = cells[2].as_ref().trim();
  if term.is_empty() || meaning.is_empty() {
    return None;
  }

  let meaning_is_chinese = contains_cjk(meaning);
  if is_english_word(term) && meaning_is_chinese {
    return Some(WordPair::new(term, meaning));
  }
  // Swap only on a CJK term beside a CJK-free meaning; every other row keeps column 0 as English.
  if contains_cjk(term) && !meaning_is_chinese {
    return Some(WordPair::new(meaning, term));
  }
  Some(WordPair::new(term, meaning))
}

/// `|------|------|` header separator: every cell is empty or a run of `-`,
/// and at least one cell is non-empty.
pub fn is_table_separator(line: &str) -> bool {
  if !line.contains('|') {
    return false;
  }
  let mut saw_dashes = false;
  for cell in line.split('|').map(str::trim) {
    if cell.is_empty() {
      continue;
    }
    if !cell.chars().all(|c| c == '-') {
      return false;
    }
    saw_dashes = true;
  }
  saw_dashes
}

/// Non-empty trimmed cells of a `|`-prefixed Markdown row.
pub fn table_cells(line: &str) -> Option<Vec<&str>> {
  let line = line.trim();
  if !line.starts_with('|') {
    return None;
  }
  Some(line.split('|').map(str::trim).filter(|c| !c.is_empty()).collect())
}
