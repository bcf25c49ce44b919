//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Driving the quiz (direction, next word, answers, reveal)
//!   - Exporting dictation sets (request limits, repeat confirmation, per-set writes)
//!   - Starting and finishing a format conversion

use std::path::PathBuf;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::allocator::Capacity;
use crate::config::{ConvertConfig, ExportConfig};
use crate::converter::{spawn_conversion, ConvertEvent, ConvertSummary, OutputFormat};
use crate::domain::Direction;
use crate::error::{Result, TrainerError};
use crate::protocol::{to_advance_out, AdvanceOut, AnswerOut, ConvertIn, ExportIn, ExportRemaining, RevealOut, StatsOut};
use crate::sheet::{set_path, DictationSheet, DocumentSink};
use crate::trainer::Trainer;
use crate::util::{resolve_within, trunc_for_log};

#[instrument(level = "info", skip(trainer))]
pub fn choose_direction(trainer: &mut Trainer, direction: Direction) -> Result<AdvanceOut> {
  let advance = trainer.session_mut().choose_direction(direction)?;
  Ok(to_advance_out(direction, &advance, trainer.stats()))
}

#[instrument(level = "debug", skip(trainer))]
pub fn next_word(trainer: &mut Trainer) -> Result<AdvanceOut> {
  let advance = trainer.session_mut().advance()?;
  let direction = trainer.session().direction().ok_or(TrainerError::NoDirection)?;
  Ok(to_advance_out(direction, &advance, trainer.stats()))
}

#[instrument(level = "info", skip(trainer, answer), fields(answer = %trunc_for_log(answer, 40)))]
pub fn submit_answer(trainer: &mut Trainer, answer: &str) -> AnswerOut {
  let outcome = trainer.session_mut().submit(answer);
  match &outcome {
    Some(o) => info!(target: "vocab", correct = o.correct, "Answer checked"),
    None => debug!(target: "vocab", "Answer ignored (no current word or blank input)"),
  }
  AnswerOut::new(outcome, trainer.stats())
}

pub fn reveal_answer(trainer: &mut Trainer) -> RevealOut {
  let answer = trainer.session_mut().reveal_answer().map(str::to_string);
  RevealOut { shown: answer.is_some(), answer }
}

pub fn hide_answer(trainer: &mut Trainer) -> RevealOut {
  trainer.session_mut().hide_answer();
  RevealOut { shown: false, answer: None }
}

pub fn toggle_answer(trainer: &mut Trainer) -> RevealOut {
  let session = trainer.session_mut();
  let shown = session.toggle_answer();
  let answer = if shown { session.answer().map(str::to_string) } else { None };
  RevealOut { shown, answer }
}

pub fn stats(trainer: &Trainer) -> StatsOut {
  let session = trainer.session();
  StatsOut {
    state: session.state(),
    direction: session.direction(),
    answer_shown: session.answer_shown(),
    stats: trainer.stats(),
    export_remaining: trainer.allocator().ok().map(|a| ExportRemaining {
      en_to_zh: a.remaining(Direction::EnToZh),
      zh_to_en: a.remaining(Direction::ZhToEn),
    }),
  }
}

/// Outcome of one set's write. A failed write does not stop the export: `error`
/// is set on that set, later sets are still written, and the batch stays in
/// the export pool.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetReport {
  pub set_number: usize,
  pub path: PathBuf,
  pub words: usize,
  pub was_pool_reset: bool,
  pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportReport {
  pub direction: Direction,
  pub sets: Vec<SetReport>,
  /// Words not yet exported in this direction since the last reset.
  pub remaining: usize,
  /// The request asked for more words than the vocabulary holds and repeats were accepted.
  pub repeats: bool,
}

/// Validate, allocate and write every requested set.
///
/// Nothing is written when a precondition fails, the path escapes the export
/// root, or repeats were not confirmed.
/// Once allocation succeeds, a failed write is recorded on its set and the
/// remaining sets are still attempted.
#[instrument(level = "info", skip(trainer, cfg, sink), fields(direction = ?req.direction, batch_size = ?req.batch_size, sets = req.sets))]
pub fn export_sets(trainer: &mut Trainer, req: &ExportIn, cfg: &ExportConfig, sink: &impl DocumentSink) -> Result<ExportReport> {
  let batch_size = req.batch_size.unwrap_or(cfg.default_batch_size);
  let sets = req.sets;
  if batch_size == 0 || batch_size > cfg.max_batch_size {
    return Err(TrainerError::InvalidRequest(format!("batch size must be between 1 and {}", cfg.max_batch_size)));
  }
  if sets == 0 || sets > cfg.max_sets {
    return Err(TrainerError::InvalidRequest(format!("number of sets must be between 1 and {}", cfg.max_sets)));
  }

  let base = match &req.path {
    Some(path) => resolve_within(&cfg.root_dir, path)?,
    None => cfg.root_dir.join(&cfg.default_path),
  };

  let allocator = trainer.allocator_mut()?;
  let repeats = match allocator.check_request(batch_size, sets)? {
    Capacity::Fits => false,
    Capacity::NeedsConfirmation { max_unique_sets } if !req.confirm_repeats => {
      warn!(target: "export", requested_sets = sets, max_unique_sets, "Export needs repeat confirmation");
      return Err(TrainerError::RepeatsNotConfirmed { requested_sets: sets, max_unique_sets });
    }
    Capacity::NeedsConfirmation { .. } => true,
  };

  let allocation = allocator.allocate(req.direction, batch_size, sets)?;

  let mut reports = Vec::with_capacity(allocation.batches.len());
  for batch in &allocation.batches {
    let path = set_path(&base, batch.set_number, sets);
    let sheet = DictationSheet { direction: allocation.direction, batch, total_sets: sets };
    let error = match sink.write(&sheet, &path) {
      Ok(()) => {
        info!(target: "export", set = batch.set_number, path = %path.display(), words = batch.pairs.len(), "Dictation sheet written");
        None
      }
      Err(e) => {
        error!(target: "export", set = batch.set_number, path = %path.display(), error = %e, "Dictation sheet write failed");
        Some(e.to_string())
      }
    };
    reports.push(SetReport {
      set_number: batch.set_number,
      path,
      words: batch.pairs.len(),
      was_pool_reset: batch.was_pool_reset,
      error,
    });
  }

  Ok(ExportReport { direction: allocation.direction, sets: reports, remaining: allocation.remaining, repeats })
}

/// Resolve defaults and start the conversion worker.
#[instrument(level = "info", skip_all, fields(input = %req.input.display()))]
pub fn start_conversion(
  req: ConvertIn,
  cfg: &ConvertConfig,
) -> Result<(JoinHandle<Result<ConvertSummary>>, mpsc::UnboundedReceiver<ConvertEvent>)> {
  let formats = req.formats.unwrap_or_else(|| OutputFormat::ALL.to_vec());
  if formats.is_empty() {
    return Err(TrainerError::InvalidRequest("select at least one output format".into()));
  }
  let output_dir = match &req.output_dir {
    Some(dir) => resolve_within(&cfg.root_dir, dir)?,
    None => cfg.root_dir.join(&cfg.output_dir),
  };
  Ok(spawn_conversion(req.input, output_dir, formats))
}

pub async fn finish_conversion(handle: JoinHandle<Result<ConvertSummary>>) -> Result<ConvertSummary> {
  let summary = handle.await.map_err(|e| TrainerError::Worker(e.to_string()))??;
  info!(target: "convert", entries = summary.entries, files = summary.written.len(), "Conversion finished");
  Ok(summary)
}

/// Run a conversion to completion, logging progress instead of streaming it.
pub async fn convert(req: ConvertIn, cfg: &ConvertConfig) -> Result<ConvertSummary> {
  let (handle, mut rx) = start_conversion(req, cfg)?;
  while let Some(ev) = rx.recv().await {
    debug!(target: "convert", ?ev, "Conversion progress");
  }
  finish_conversion(handle).await
}
