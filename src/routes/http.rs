//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs its parameters and basic result info.

use std::sync::Arc;
use axum::{
  extract::{Path, State},
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use tracing::{info, instrument, warn};

use crate::error::TrainerError;
use crate::logic;
use crate::protocol::*;
use crate::sheet::MarkdownSheetSink;
use crate::state::{AppState, SharedTrainer};

/// Handler-level failure: an unknown session or a typed trainer error.
#[derive(Debug)]
pub enum ApiError {
  UnknownSession(String),
  Trainer(TrainerError),
}

impl From<TrainerError> for ApiError {
  fn from(e: TrainerError) -> Self {
    ApiError::Trainer(e)
  }
}

fn status_for(e: &TrainerError) -> StatusCode {
  match e {
    TrainerError::UnsupportedFormat { .. } | TrainerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
    TrainerError::Unreadable { .. } => StatusCode::BAD_REQUEST,
    TrainerError::NoPairs { .. }
    | TrainerError::NoVocabulary
    | TrainerError::NoDirection
    | TrainerError::BatchTooLarge { .. } => StatusCode::UNPROCESSABLE_ENTITY,
    TrainerError::RepeatsNotConfirmed { .. } => StatusCode::CONFLICT,
    TrainerError::Write { .. } | TrainerError::Worker(_) | TrainerError::Csv(_) | TrainerError::Json(_) => {
      StatusCode::INTERNAL_SERVER_ERROR
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, body) = match self {
      ApiError::UnknownSession(id) => (
        StatusCode::NOT_FOUND,
        ErrorOut { error: format!("Unknown session: {id}"), kind: "unknown_session" },
      ),
      ApiError::Trainer(e) => (status_for(&e), ErrorOut { error: e.to_string(), kind: e.kind() }),
    };
    warn!(target: "vocab_drill_backend", status = status.as_u16(), kind = body.kind, error = %body.error, "HTTP request failed");
    (status, Json(body)).into_response()
  }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

async fn session(state: &AppState, id: &str) -> Result<SharedTrainer, ApiError> {
  state.get_session(id).await.ok_or_else(|| ApiError::UnknownSession(id.to_string()))
}

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state))]
pub async fn http_create_session(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  let session_id = state.create_session().await;
  (StatusCode::CREATED, Json(SessionOut { session_id }))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_delete_session(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<StatusCode, ApiError> {
  if state.remove_session(&id).await {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::UnknownSession(id))
  }
}

#[instrument(level = "info", skip(state, body), fields(%id, path = %body.path.display()))]
pub async fn http_load(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<LoadIn>,
) -> ApiResult<LoadOut> {
  let trainer = session(&state, &id).await?;
  let total = trainer.lock().await.load_path(&body.path)?;
  info!(target: "vocab", session = %id, total, "HTTP vocabulary loaded");
  Ok(Json(LoadOut { total }))
}

#[instrument(level = "info", skip(state), fields(%id, direction = ?body.direction))]
pub async fn http_choose_direction(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<DirectionIn>,
) -> ApiResult<AdvanceOut> {
  let trainer = session(&state, &id).await?;
  let out = logic::choose_direction(&mut *trainer.lock().await, body.direction)?;
  Ok(Json(out))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_next(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult<AdvanceOut> {
  let trainer = session(&state, &id).await?;
  let out = logic::next_word(&mut *trainer.lock().await)?;
  Ok(Json(out))
}

#[instrument(level = "info", skip(state, body), fields(%id, answer_len = body.answer.len()))]
pub async fn http_answer(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<AnswerIn>,
) -> ApiResult<AnswerOut> {
  let trainer = session(&state, &id).await?;
  let out = logic::submit_answer(&mut *trainer.lock().await, &body.answer);
  Ok(Json(out))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_reveal(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult<RevealOut> {
  let trainer = session(&state, &id).await?;
  let out = logic::reveal_answer(&mut *trainer.lock().await);
  Ok(Json(out))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_hide(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult<RevealOut> {
  let trainer = session(&state, &id).await?;
  let out = logic::hide_answer(&mut *trainer.lock().await);
  Ok(Json(out))
}

#[instrument(level = "debug", skip(state), fields(%id))]
pub async fn http_stats(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult<StatsOut> {
  let trainer = session(&state, &id).await?;
  let out = logic::stats(&*trainer.lock().await);
  Ok(Json(out))
}

#[instrument(level = "info", skip(state, body), fields(%id))]
pub async fn http_export(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<ExportIn>,
) -> ApiResult<logic::ExportReport> {
  let trainer = session(&state, &id).await?;
  let report = logic::export_sets(&mut *trainer.lock().await, &body, &state.config.export, &MarkdownSheetSink)?;
  info!(target: "export", session = %id, sets = report.sets.len(), remaining = report.remaining, "HTTP export finished");
  Ok(Json(report))
}

#[instrument(level = "info", skip(state, body), fields(input = %body.input.display()))]
pub async fn http_convert(State(state): State<Arc<AppState>>, Json(body): Json<ConvertIn>) -> ApiResult<crate::converter::ConvertSummary> {
  let summary = logic::convert(body, &state.config.convert).await?;
  Ok(Json(summary))
}
