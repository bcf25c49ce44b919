//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::converter::{ConvertEvent, ConvertSummary, OutputFormat};
use crate::domain::Direction;
use crate::logic::ExportReport;
use crate::session::{Advance, AnswerOutcome, SessionState, SessionStats};

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    Load {
        path: PathBuf,
    },
    ChooseDirection {
        direction: Direction,
    },
    Next,
    SubmitAnswer {
        answer: String,
    },
    RevealAnswer,
    HideAnswer,
    ToggleAnswer,
    Stats,
    Export(ExportIn),
    Convert(ConvertIn),
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Loaded {
        total: usize,
    },
    Word {
        direction: Direction,
        prompt: String,
        stats: SessionStats,
    },
    PassComplete {
        stats: SessionStats,
    },
    AnswerResult(AnswerOut),
    Answer(RevealOut),
    Stats(StatsOut),
    Exported(ExportReport),
    ConvertProgress(ConvertEvent),
    Converted(ConvertSummary),
    Error {
        kind: String,
        message: String,
    },
}

/// Result of choosing a direction or moving to the next word.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AdvanceOut {
    Word {
        direction: Direction,
        prompt: String,
        stats: SessionStats,
    },
    PassComplete {
        stats: SessionStats,
    },
}

/// Only the known side is sent; the answer stays on the server until revealed.
pub fn to_advance_out(direction: Direction, advance: &Advance, stats: SessionStats) -> AdvanceOut {
    match advance {
        Advance::Presented(pair) => AdvanceOut::Word {
            direction,
            prompt: direction.known(pair).to_string(),
            stats,
        },
        Advance::PassComplete => AdvanceOut::PassComplete { stats },
    }
}

impl From<AdvanceOut> for ServerWsMessage {
    fn from(out: AdvanceOut) -> Self {
        match out {
            AdvanceOut::Word { direction, prompt, stats } => ServerWsMessage::Word { direction, prompt, stats },
            AdvanceOut::PassComplete { stats } => ServerWsMessage::PassComplete { stats },
        }
    }
}

//
// HTTP request/response DTOs
//

#[derive(Serialize)]
pub struct SessionOut {
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
pub struct LoadIn {
    pub path: PathBuf,
}
#[derive(Serialize)]
pub struct LoadOut {
    pub total: usize,
}

#[derive(Debug, Deserialize)]
pub struct DirectionIn {
    pub direction: Direction,
}

#[derive(Deserialize)]
pub struct AnswerIn {
    pub answer: String,
}
/// `accepted` is false when there was no current word or the answer was blank.
#[derive(Debug, Serialize)]
pub struct AnswerOut {
    pub accepted: bool,
    pub correct: bool,
    pub expected: Option<String>,
    pub stats: SessionStats,
}

impl AnswerOut {
    pub fn new(outcome: Option<AnswerOutcome>, stats: SessionStats) -> Self {
        match outcome {
            Some(o) => Self { accepted: true, correct: o.correct, expected: Some(o.expected), stats },
            None => Self { accepted: false, correct: false, expected: None, stats },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RevealOut {
    pub shown: bool,
    pub answer: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsOut {
    pub state: SessionState,
    pub direction: Option<Direction>,
    pub answer_shown: bool,
    #[serde(flatten)]
    pub stats: SessionStats,
    /// Words left before each export pool resets; absent until a vocabulary is loaded.
    pub export_remaining: Option<ExportRemaining>,
}

#[derive(Debug, Serialize)]
pub struct ExportRemaining {
    pub en_to_zh: usize,
    pub zh_to_en: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportIn {
    pub direction: Direction,
    #[serde(default)]
    pub batch_size: Option<usize>,
    #[serde(default = "one")]
    pub sets: usize,
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub confirm_repeats: bool,
}

fn one() -> usize {
    1
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertIn {
    pub input: PathBuf,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub formats: Option<Vec<OutputFormat>>,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorOut {
    pub error: String,
    pub kind: &'static str,
}
