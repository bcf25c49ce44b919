//! Dictation sheet rendering.
//!
//! A sheet is a title, a two-column table with the known side filled in and the
//! other side left blank, then a page break and the answer key in table order.

use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use crate::allocator::Batch;
use crate::domain::Direction;
use crate::error::{Result, TrainerError};

const BLANK: &str = "__________";
const PAGE_BREAK: &str = "<div style=\"page-break-after: always;\"></div>";

/// Everything a sink needs to render one set.
#[derive(Clone, Copy, Debug)]
pub struct DictationSheet<'a> {
    pub direction: Direction,
    pub batch: &'a Batch,
    /// Number of sets in the request; the set index is only shown when > 1.
    pub total_sets: usize,
}

impl DictationSheet<'_> {
    pub fn title(&self) -> String {
        let base = format!("{} dictation", self.direction.label());
        if self.total_sets > 1 {
            format!("{base} - Set {}", self.batch.set_number)
        } else {
            base
        }
    }

    fn instruction(&self) -> &'static str {
        match self.direction {
            Direction::EnToZh => "Write the Chinese meaning of each English word.",
            Direction::ZhToEn => "Write the English word for each Chinese meaning.",
        }
    }
}

/// Renders and persists dictation sheets.
pub trait DocumentSink {
    fn render(&self, sheet: &DictationSheet<'_>) -> String;

    fn write(&self, sheet: &DictationSheet<'_>, path: &Path) -> Result<()> {
        let body = self.render(sheet);
        std::fs::write(path, body).map_err(|source| TrainerError::Write { path: path.to_path_buf(), source })
    }
}

/// Markdown sheet with an HTML page-break marker before the answers.
#[derive(Clone, Copy, Debug, Default)]
pub struct MarkdownSheetSink;

impl DocumentSink for MarkdownSheetSink {
    #[instrument(level = "debug", skip_all, fields(set = sheet.batch.set_number, words = sheet.batch.pairs.len()))]
    fn render(&self, sheet: &DictationSheet<'_>) -> String {
        let direction = sheet.direction;
        let mut out = String::new();

        out.push_str(&format!("# {}\n\n", sheet.title()));
        out.push_str(sheet.instruction());
        out.push_str("\n\n");
        out.push_str(&format!("**Words: {}**", sheet.batch.pairs.len()));
        if sheet.batch.was_pool_reset {
            out.push_str(" (word list reset)");
        }
        out.push_str("\n\n");

        let (known_head, unknown_head) = match direction {
            Direction::EnToZh => ("English", "Chinese"),
            Direction::ZhToEn => ("Chinese", "English"),
        };
        out.push_str(&format!("| {known_head} | {unknown_head} |\n|------|------|\n"));
        for pair in &sheet.batch.pairs {
            out.push_str(&format!("| {} | {BLANK} |\n", escape_cell(direction.known(pair))));
        }

        out.push('\n');
        out.push_str(PAGE_BREAK);
        out.push_str("\n\n## Answers\n\n");
        for pair in &sheet.batch.pairs {
            out.push_str(&format!("**{}**: {}  \n", direction.known(pair), direction.unknown(pair)));
        }
        debug!(target: "export", bytes = out.len(), "Sheet rendered");
        out
    }
}

fn escape_cell(s: &str) -> String {
    s.replace('|', "\\|")
}

/// `words.md` → `words_2.md` when several sets are written; unchanged for one set.
pub fn set_path(base: &Path, set_number: usize, total_sets: usize) -> PathBuf {
    if total_sets <= 1 {
        return base.to_path_buf();
    }
    let stem = base.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    let name = match base.extension() {
        Some(ext) => format!("{stem}_{set_number}.{}", ext.to_string_lossy()),
        None => format!("{stem}_{set_number}"),
    };
    base.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::WordPair;
    use crate::util::scratch_dir;

    fn batch(reset: bool) -> Batch {
        Batch {
            set_number: 2,
            pairs: vec![WordPair::new("run", "跑|走"), WordPair::new("cat", "猫")],
            was_pool_reset: reset,
        }
    }

    #[test]
    fn set_paths() {
        assert_eq!(set_path(Path::new("out/words.md"), 1, 1), PathBuf::from("out/words.md"));
        assert_eq!(set_path(Path::new("out/words.md"), 3, 4), PathBuf::from("out/words_3.md"));
        assert_eq!(set_path(Path::new("words"), 2, 2), PathBuf::from("words_2"));
        assert_eq!(set_path(Path::new("a.b.md"), 1, 2), PathBuf::from("a.b_1.md"));
    }

    #[test]
    fn en_to_zh_sheet_layout() {
        let b = batch(false);
        let sheet = DictationSheet { direction: Direction::EnToZh, batch: &b, total_sets: 3 };
        let md = MarkdownSheetSink.render(&sheet);

        assert!(md.starts_with("# English → Chinese dictation - Set 2\n"));
        assert!(md.contains("| English | Chinese |"));
        assert!(md.contains("| run | __________ |"));
        assert!(md.contains("| cat | __________ |"));
        assert!(!md.contains("word list reset"));

        let (questions, answers) = md.split_once(PAGE_BREAK).unwrap();
        assert!(!questions.contains("猫"));
        let run = answers.find("**run**: 跑|走").unwrap();
        let cat = answers.find("**cat**: 猫").unwrap();
        assert!(run < cat);
    }

    #[test]
    fn zh_to_en_single_set_sheet() {
        let b = batch(true);
        let sheet = DictationSheet { direction: Direction::ZhToEn, batch: &b, total_sets: 1 };
        let md = MarkdownSheetSink.render(&sheet);

        assert!(md.starts_with("# Chinese → English dictation\n"));
        assert!(md.contains("**Words: 2** (word list reset)"));
        assert!(md.contains("| 跑\\|走 | __________ |"));
        assert!(md.contains("**猫**: cat"));
    }

    #[test]
    fn write_reports_failures() {
        let dir = scratch_dir();
        let b = batch(false);
        let sheet = DictationSheet { direction: Direction::EnToZh, batch: &b, total_sets: 1 };

        let ok = dir.join("sheet.md");
        MarkdownSheetSink.write(&sheet, &ok).unwrap();
        assert!(std::fs::read_to_string(&ok).unwrap().contains("## Answers"));

        let bad = dir.join("missing-dir").join("sheet.md");
        assert!(matches!(MarkdownSheetSink.write(&sheet, &bad), Err(TrainerError::Write { .. })));
    }
}
