//! Typed failures surfaced to the HTTP/WebSocket shell.
//!
//! Line-level parse failures never show up here: an unparseable record is an
//! `Option::None` and is skipped by the loader.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrainerError {
    /// The file extension is not one of `.txt`, `.csv`, `.md`.
    #[error("Unsupported file format: {path} (expected .txt, .csv or .md)")]
    UnsupportedFormat { path: PathBuf },

    #[error("Failed to read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file was readable but no record produced a word pair.
    #[error("No word pairs could be parsed from {path}")]
    NoPairs { path: PathBuf },

    #[error("No vocabulary loaded")]
    NoVocabulary,

    #[error("No quiz direction chosen")]
    NoDirection,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Batch size {requested} exceeds the vocabulary size {available}")]
    BatchTooLarge { requested: usize, available: usize },

    /// `batch_size * sets` exceeds the vocabulary and the caller did not accept repeats.
    #[error("{requested_sets} sets requested but only {max_unique_sets} fit without repeating words; confirmation required")]
    RepeatsNotConfirmed {
        requested_sets: usize,
        max_unique_sets: usize,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The background conversion task panicked or was aborted.
    #[error("Conversion worker failed: {0}")]
    Worker(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TrainerError {
    /// Stable snake_case tag used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            TrainerError::UnsupportedFormat { .. } => "unsupported_format",
            TrainerError::Unreadable { .. } => "unreadable",
            TrainerError::NoPairs { .. } => "no_pairs",
            TrainerError::NoVocabulary => "no_vocabulary",
            TrainerError::NoDirection => "no_direction",
            TrainerError::InvalidRequest(_) => "invalid_request",
            TrainerError::BatchTooLarge { .. } => "batch_too_large",
            TrainerError::RepeatsNotConfirmed { .. } => "repeats_not_confirmed",
            TrainerError::Write { .. } => "write_failed",
            TrainerError::Worker(_) => "worker",
            TrainerError::Csv(_) => "csv",
            TrainerError::Json(_) => "json",
        }
    }
}

pub type Result<T> = std::result::Result<T, TrainerError>;
