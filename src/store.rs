//! Vocabulary loading: file → `VocabularyStore`.
//!
//! The store is built once per load and never mutated afterwards. A failed load
//! returns an error and produces no store, so the caller's previous vocabulary
//! stays in place.

use std::path::Path;

use tracing::{debug, info, instrument};

use crate::domain::WordPair;
use crate::error::{Result, TrainerError};
use crate::parser::{is_table_separator, parse_cells, parse_line, table_cells};
use crate::util::trunc_for_log;

/// Supported vocabulary file shapes, chosen by extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    Text,
    Csv,
    Markdown,
}

impl SourceKind {
    /// Case-insensitive extension check; anything else is rejected before reading.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("txt") => Ok(SourceKind::Text),
            Some("csv") => Ok(SourceKind::Csv),
            Some("md") => Ok(SourceKind::Markdown),
            _ => Err(TrainerError::UnsupportedFormat { path: path.to_path_buf() }),
        }
    }
}

/// Ordered pairs in file order. Duplicate English terms are kept.
#[derive(Clone, Debug, Default)]
pub struct VocabularyStore {
    pairs: Vec<WordPair>,
}

impl VocabularyStore {
    pub fn new(pairs: Vec<WordPair>) -> Self {
        Self { pairs }
    }

    /// Read and parse a vocabulary file. Fails on unknown extension, IO errors,
    /// or when not a single record parses.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self> {
        let kind = SourceKind::from_path(path)?;
        let text = std::fs::read_to_string(path).map_err(|source| TrainerError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        let store = Self::new(parse_source(kind, &text));
        if store.is_empty() {
            return Err(TrainerError::NoPairs { path: path.to_path_buf() });
        }
        info!(target: "vocab", ?kind, pairs = store.len(), "Vocabulary loaded");
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn pairs(&self) -> &[WordPair] {
        &self.pairs
    }

    pub fn iter(&self) -> std::slice::Iter<'_, WordPair> {
        self.pairs.iter()
    }
}

/// Parse the whole text according to `kind`. Unparseable records are skipped.
pub fn parse_source(kind: SourceKind, text: &str) -> Vec<WordPair> {
    match kind {
        SourceKind::Text => parse_text(text),
        SourceKind::Csv => parse_csv(text),
        SourceKind::Markdown => parse_markdown(text),
    }
}

fn parse_text(text: &str) -> Vec<WordPair> {
    let mut out = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        match parse_line(line) {
            Some(pair) => out.push(pair),
            None if !line.trim().is_empty() => {
                debug!(target: "vocab", line = lineno + 1, text = %trunc_for_log(line, 40), "Skipping unparseable line");
            }
            None => {}
        }
    }
    out
}

/// Header row skipped; rows need at least three columns.
fn parse_csv(text: &str) -> Vec<WordPair> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut out = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                debug!(target: "vocab", row = idx + 2, error = %e, "Skipping malformed CSV row");
                continue;
            }
        };
        let cells: Vec<&str> = record.iter().collect();
        if let Some(pair) = parse_cells(&cells) {
            out.push(pair);
        }
    }
    out
}

/// Data rows only count after a header separator row.
fn parse_markdown(text: &str) -> Vec<WordPair> {
    let mut out = Vec::new();
    let mut table_started = false;
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if is_table_separator(line) {
            table_started = true;
            continue;
        }
        if !table_started {
            continue;
        }
        if let Some(pair) = table_cells(line).and_then(|cells| parse_cells(&cells)) {
            out.push(pair);
        }
    }
    out
}
