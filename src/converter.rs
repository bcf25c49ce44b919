//! Vocabulary format conversion: `word pos.meaning` lines → Markdown, CSV, JSON
//! and pipe-delimited text.
//!
//! This is independent from the quiz and the export pools. The conversion runs
//! on a blocking worker and streams coarse progress events over a channel; it
//! cannot be cancelled once started.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument};

use crate::error::{Result, TrainerError};

/// One converted entry, in input order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub word: String,
    pub pos: String,
    pub meaning: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    Markdown,
    Csv,
    Json,
    Txt,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 4] = [OutputFormat::Markdown, OutputFormat::Csv, OutputFormat::Json, OutputFormat::Txt];

    pub fn file_name(&self) -> &'static str {
        match self {
            OutputFormat::Markdown => "words.md",
            OutputFormat::Csv => "words.csv",
            OutputFormat::Json => "words.json",
            OutputFormat::Txt => "words.txt",
        }
    }
}

/// Progress milestones emitted by the worker.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ConvertEvent {
    Started { percent: u8 },
    Loaded { entries: usize, percent: u8 },
    Written { format: OutputFormat, path: PathBuf, percent: u8 },
}

#[derive(Clone, Debug, Serialize)]
pub struct ConvertSummary {
    pub entries: usize,
    pub written: Vec<PathBuf>,
}

/// `word<space>pos.meaning`; lines without a second field or without `.` are dropped.
pub fn parse_entry(line: &str) -> Option<Entry> {
    let line = line.trim();
    let (word, definition) = line.split_once(' ')?;
    let (pos, meaning) = definition.split_once('.')?;
    Some(Entry {
        word: word.to_string(),
        pos: pos.trim().to_string(),
        meaning: meaning.trim().to_string(),
    })
}

pub fn parse_entries(text: &str) -> Vec<Entry> {
    text.lines().filter_map(parse_entry).collect()
}

pub fn render(format: OutputFormat, entries: &[Entry]) -> Result<String> {
    match format {
        OutputFormat::Markdown => {
            let mut out = String::from("| 单词 | 词性 | 释义 |\n|------|------|------|\n");
            for e in entries {
                out.push_str(&format!("| {} | {} | {} |\n", e.word, e.pos, e.meaning));
            }
            Ok(out)
        }
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(Vec::new());
            // explicit header: an empty input still gets one
            writer.write_record(["word", "pos", "meaning"])?;
            for e in entries {
                writer.write_record([&e.word, &e.pos, &e.meaning])?;
            }
            let bytes = writer
                .into_inner()
                .map_err(|e| TrainerError::Csv(csv::Error::from(e.into_error())))?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
        OutputFormat::Json => Ok(serde_json::to_string_pretty(entries)?),
        OutputFormat::Txt => Ok(entries
            .iter()
            .map(|e| format!("{}|{}|{}\n", e.word, e.pos, e.meaning))
            .collect()),
    }
}

fn progress_after(written: usize, selected: usize) -> u8 {
    (30 + 70 * written / selected.max(1)) as u8
}

/// Synchronous conversion; `on_event` sees every milestone.
#[instrument(level = "info", skip_all, fields(input = %input.display(), output_dir = %output_dir.display(), formats = formats.len()))]
pub fn convert_file(
    input: &Path,
    output_dir: &Path,
    formats: &[OutputFormat],
    mut on_event: impl FnMut(ConvertEvent),
) -> Result<ConvertSummary> {
    if formats.is_empty() {
        return Err(TrainerError::InvalidRequest("select at least one output format".into()));
    }
    on_event(ConvertEvent::Started { percent: 10 });

    let text = std::fs::read_to_string(input).map_err(|source| TrainerError::Unreadable {
        path: input.to_path_buf(),
        source,
    })?;
    let entries = parse_entries(&text);
    info!(target: "convert", entries = entries.len(), "Input parsed");
    on_event(ConvertEvent::Loaded { entries: entries.len(), percent: 30 });

    std::fs::create_dir_all(output_dir).map_err(|source| TrainerError::Write {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let mut written = Vec::with_capacity(formats.len());
    for (idx, format) in formats.iter().enumerate() {
        let path = output_dir.join(format.file_name());
        let body = render(*format, &entries)?;
        std::fs::write(&path, body).map_err(|source| TrainerError::Write { path: path.clone(), source })?;
        info!(target: "convert", ?format, path = %path.display(), "Format written");
        on_event(ConvertEvent::Written {
            format: *format,
            path: path.clone(),
            percent: progress_after(idx + 1, formats.len()),
        });
        written.push(path);
    }

    Ok(ConvertSummary { entries: entries.len(), written })
}

/// Run `convert_file` on the blocking pool. Events arrive on the receiver while
/// the worker runs; the channel closes when it finishes.
pub fn spawn_conversion(
    input: PathBuf,
    output_dir: PathBuf,
    formats: Vec<OutputFormat>,
) -> (JoinHandle<Result<ConvertSummary>>, mpsc::UnboundedReceiver<ConvertEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = tokio::task::spawn_blocking(move || {
        let result = convert_file(&input, &output_dir, &formats, |ev| {
            // the listener may have gone away; the conversion still finishes
            let _ = tx.send(ev);
        });
        if let Err(e) = &result {
            error!(target: "convert", input = %input.display(), error = %e, "Conversion failed");
        }
        result
    });
    (handle, rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::scratch_dir;

    fn sample() -> Vec<Entry> {
        parse_entries("apple n.苹果\nrun v. 跑，奔跑\nbroken\nhello interj hi\n  go v.去  \n")
    }

    #[test]
    fn entry_parsing_drops_malformed_lines() {
        let entries = sample();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0], Entry { word: "apple".into(), pos: "n".into(), meaning: "苹果".into() });
        assert_eq!(entries[1].meaning, "跑，奔跑");
        assert_eq!(entries[2].word, "go");
        assert_eq!(parse_entry("word"), None);
        assert_eq!(parse_entry("word noun"), None);
    }

    #[test]
    fn renders_every_format() {
        let entries = sample();

        let md = render(OutputFormat::Markdown, &entries).unwrap();
        assert!(md.starts_with("| 单词 | 词性 | 释义 |\n|------|------|------|\n"));
        assert!(md.contains("| apple | n | 苹果 |\n"));

        let csv = render(OutputFormat::Csv, &entries).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("word,pos,meaning"));
        assert_eq!(lines.next(), Some("apple,n,苹果"));
        assert!(csv.contains("run,v,\"跑，奔跑\"") || csv.contains("run,v,跑，奔跑"));

        let json = render(OutputFormat::Json, &entries).unwrap();
        let back: Vec<Entry> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entries);
        assert!(json.contains("苹果"));

        let txt = render(OutputFormat::Txt, &entries).unwrap();
        assert_eq!(txt.lines().next(), Some("apple|n|苹果"));

        assert_eq!(render(OutputFormat::Csv, &[]).unwrap().trim(), "word,pos,meaning");
    }

    #[test]
    fn progress_matches_milestones() {
        assert_eq!(progress_after(1, 4), 47);
        assert_eq!(progress_after(4, 4), 100);
        assert_eq!(progress_after(1, 1), 100);
    }

    #[tokio::test]
    async fn worker_streams_events_and_writes_files() {
        let dir = scratch_dir();
        let input = dir.join("raw.txt");
        std::fs::write(&input, "apple n.苹果\nrun v.跑\n").unwrap();
        let out = dir.join("output");

        let (handle, mut rx) = spawn_conversion(input, out.clone(), vec![OutputFormat::Json, OutputFormat::Txt]);
        let mut events = Vec::new();
        while let Some(ev) = rx.recv().await {
            events.push(ev);
        }
        let summary = handle.await.unwrap().unwrap();

        assert_eq!(summary.entries, 2);
        assert_eq!(summary.written, vec![out.join("words.json"), out.join("words.txt")]);
        assert_eq!(events.first(), Some(&ConvertEvent::Started { percent: 10 }));
        assert_eq!(events[1], ConvertEvent::Loaded { entries: 2, percent: 30 });
        assert!(matches!(events.last(), Some(ConvertEvent::Written { format: OutputFormat::Txt, percent: 100, .. })));
        assert_eq!(std::fs::read_to_string(out.join("words.txt")).unwrap(), "apple|n|苹果\nrun|v|跑\n");
    }

    #[tokio::test]
    async fn worker_reports_load_failure() {
        let dir = scratch_dir();
        let (handle, mut rx) = spawn_conversion(dir.join("nope.txt"), dir.join("out"), OutputFormat::ALL.to_vec());
        let mut events = Vec::new();
        while let Some(ev) = rx.recv().await {
            events.push(ev);
        }
        assert_eq!(events, vec![ConvertEvent::Started { percent: 10 }]);
        assert!(matches!(handle.await.unwrap(), Err(TrainerError::Unreadable { .. })));
    }

    #[test]
    fn empty_format_selection_is_rejected() {
        let dir = scratch_dir();
        let err = convert_file(&dir.join("x.txt"), &dir, &[], |_| {}).unwrap_err();
        assert!(matches!(err, TrainerError::InvalidRequest(_)));
    }
}
