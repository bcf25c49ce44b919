//! WebSocket upgrade + message loop. Each connection owns its own trainer; each
//! client message is parsed as JSON and forwarded to core logic. Most requests get
//! a single JSON reply; `convert` also streams progress messages before its result.

use std::future::Future;
use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{debug, error, info, instrument, warn};

use crate::error::TrainerError;
use crate::logic;
use crate::protocol::{ClientWsMessage, ConvertIn, ServerWsMessage};
use crate::sheet::MarkdownSheetSink;
use crate::state::AppState;
use crate::trainer::Trainer;

/// Where server messages go. The live socket in production.
pub trait Outbox {
  fn send_msg(&mut self, msg: &ServerWsMessage) -> impl Future<Output = Result<(), axum::Error>> + Send;
}

impl Outbox for WebSocket {
  async fn send_msg(&mut self, msg: &ServerWsMessage) -> Result<(), axum::Error> {
    let out = serde_json::to_string(msg).unwrap_or_else(|e| {
      serde_json::json!({ "type": "error", "kind": "json", "message": format!("Serialization error: {}", e) }).to_string()
    });
    self.send(Message::Text(out)).await
  }
}

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "vocab_drill_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "vocab_drill_backend", "WebSocket connected");
  let mut trainer = Trainer::new();
  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        if let Err(e) = handle_text(&txt, &mut trainer, &state, &mut socket).await {
          error!(target: "vocab_drill_backend", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "vocab_drill_backend", "WebSocket disconnected");
}

/// Parse one text frame, run it, and send the reply. Only a failed send is an error.
async fn handle_text<O: Outbox + Send>(
  txt: &str,
  trainer: &mut Trainer,
  state: &AppState,
  out: &mut O,
) -> Result<(), axum::Error> {
  let reply_msg = match serde_json::from_str::<ClientWsMessage>(txt) {
    Ok(incoming) => {
      debug!(target: "vocab_drill_backend", "WS received: {:?}", &incoming);
      handle_client_ws(incoming, trainer, state, out).await
    }
    Err(e) => ServerWsMessage::Error { kind: "invalid_json".into(), message: format!("Invalid JSON: {}", e) },
  };
  out.send_msg(&reply_msg).await
}

fn error_msg(e: TrainerError) -> ServerWsMessage {
  warn!(target: "vocab_drill_backend", kind = e.kind(), error = %e, "WS request failed");
  ServerWsMessage::Error { kind: e.kind().into(), message: e.to_string() }
}

#[instrument(level = "info", skip(trainer, state, out))]
async fn handle_client_ws<O: Outbox + Send>(
  msg: ClientWsMessage,
  trainer: &mut Trainer,
  state: &AppState,
  out: &mut O,
) -> ServerWsMessage {
  let result = match msg {
    ClientWsMessage::Ping => Ok(ServerWsMessage::Pong),

    ClientWsMessage::Load { path } => trainer.load_path(&path).map(|total| {
      info!(target: "vocab", path = %path.display(), total, "WS vocabulary loaded");
      ServerWsMessage::Loaded { total }
    }),

    ClientWsMessage::ChooseDirection { direction } => logic::choose_direction(trainer, direction).map(Into::into),

    ClientWsMessage::Next => logic::next_word(trainer).map(Into::into),

    ClientWsMessage::SubmitAnswer { answer } => Ok(ServerWsMessage::AnswerResult(logic::submit_answer(trainer, &answer))),

    ClientWsMessage::RevealAnswer => Ok(ServerWsMessage::Answer(logic::reveal_answer(trainer))),

    ClientWsMessage::HideAnswer => Ok(ServerWsMessage::Answer(logic::hide_answer(trainer))),

    ClientWsMessage::ToggleAnswer => Ok(ServerWsMessage::Answer(logic::toggle_answer(trainer))),

    ClientWsMessage::Stats => Ok(ServerWsMessage::Stats(logic::stats(trainer))),

    ClientWsMessage::Export(req) => {
      logic::export_sets(trainer, &req, &state.config.export, &MarkdownSheetSink).map(ServerWsMessage::Exported)
    }

    ClientWsMessage::Convert(req) => stream_conversion(req, state, out).await,
  };
  result.unwrap_or_else(error_msg)
}

/// Forward every progress event as it arrives, then hand back the final result.
/// A client that stops listening does not stop the worker.
async fn stream_conversion<O: Outbox + Send>(
  req: ConvertIn,
  state: &AppState,
  out: &mut O,
) -> Result<ServerWsMessage, TrainerError> {
  let (handle, mut rx) = logic::start_conversion(req, &state.config.convert)?;
  let mut listening = true;
  while let Some(ev) = rx.recv().await {
    if listening && out.send_msg(&ServerWsMessage::ConvertProgress(ev)).await.is_err() {
      warn!(target: "convert", "Client stopped receiving conversion progress");
      listening = false;
    }
  }
  logic::finish_conversion(handle).await.map(ServerWsMessage::Converted)
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::{json, Value};

  use crate::config::TrainerConfig;
  use crate::util::scratch_dir;

  /// Records what would have gone over the wire, as JSON.
  #[derive(Default)]
  struct Recorded(Vec<Value>);

  impl Outbox for Recorded {
    async fn send_msg(&mut self, msg: &ServerWsMessage) -> Result<(), axum::Error> {
      self.0.push(serde_json::to_value(msg).unwrap());
      Ok(())
    }
  }

  /// Fails every send, like a client that went away.
  struct Closed;

  impl Outbox for Closed {
    async fn send_msg(&mut self, _msg: &ServerWsMessage) -> Result<(), axum::Error> {
      Err(axum::Error::new("connection closed"))
    }
  }

  fn state_in(root: &std::path::Path) -> AppState {
    let mut config = TrainerConfig::default();
    config.export.root_dir = root.to_path_buf();
    config.convert.root_dir = root.to_path_buf();
    AppState::with_config(config)
  }

  async fn send(text: &str, trainer: &mut Trainer, state: &AppState) -> Vec<Value> {
    let mut out = Recorded::default();
    handle_text(text, trainer, state, &mut out).await.unwrap();
    out.0
  }

  #[tokio::test]
  async fn invalid_json_gets_an_error_reply() {
    let state = state_in(&scratch_dir());
    let mut trainer = Trainer::new();

    for text in ["not json", r#"{"type":"fly_away"}"#, r#"{"type":"load"}"#] {
      let replies = send(text, &mut trainer, &state).await;
      assert_eq!(replies.len(), 1);
      assert_eq!(replies[0]["type"], "error");
      assert_eq!(replies[0]["kind"], "invalid_json");
    }
  }

  #[tokio::test]
  async fn quiz_messages_are_dispatched() {
    let dir = scratch_dir();
    let words = dir.join("words.txt");
    std::fs::write(&words, "cat 猫\ndog 狗\n").unwrap();
    let state = state_in(&dir);
    let mut trainer = Trainer::new();

    assert_eq!(send(r#"{"type":"ping"}"#, &mut trainer, &state).await, vec![json!({ "type": "pong" })]);

    let replies = send(r#"{"type":"next"}"#, &mut trainer, &state).await;
    assert_eq!(replies[0]["type"], "error");
    assert_eq!(replies[0]["kind"], "no_vocabulary");

    let load = json!({ "type": "load", "path": &words }).to_string();
    let replies = send(&load, &mut trainer, &state).await;
    assert_eq!(replies, vec![json!({ "type": "loaded", "total": 2 })]);

    let replies = send(r#"{"type":"choose_direction","direction":"en_to_zh"}"#, &mut trainer, &state).await;
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0]["type"], "word");
    assert_eq!(replies[0]["direction"], "en_to_zh");
    let prompt = replies[0]["prompt"].as_str().unwrap();
    assert!(prompt == "cat" || prompt == "dog");

    let replies = send(r#"{"type":"reveal_answer"}"#, &mut trainer, &state).await;
    assert_eq!(replies[0]["type"], "answer");
    assert_eq!(replies[0]["shown"], true);
  }

  #[tokio::test]
  async fn conversion_streams_progress_before_result() {
    let dir = scratch_dir();
    let input = dir.join("raw.txt");
    std::fs::write(&input, "apple n.苹果\nrun v.跑\n").unwrap();
    let state = state_in(&dir);
    let mut trainer = Trainer::new();

    let req = json!({ "type": "convert", "input": &input, "outputDir": "out", "formats": ["markdown", "txt"] });
    let replies = send(&req.to_string(), &mut trainer, &state).await;
    let types: Vec<&str> = replies.iter().map(|m| m["type"].as_str().unwrap()).collect();
    assert_eq!(types, vec!["convert_progress", "convert_progress", "convert_progress", "convert_progress", "converted"]);

    assert_eq!(replies[0]["event"], "started");
    assert_eq!(replies[0]["percent"], 10);
    assert_eq!(replies[1]["event"], "loaded");
    assert_eq!(replies[1]["entries"], 2);
    assert_eq!(replies[3]["event"], "written");
    assert_eq!(replies[3]["percent"], 100);
    assert_eq!(replies[4]["entries"], 2);
    assert!(dir.join("out").join("words.txt").exists());
  }

  #[tokio::test]
  async fn conversion_finishes_when_client_is_gone() {
    let dir = scratch_dir();
    let input = dir.join("raw.txt");
    std::fs::write(&input, "apple n.苹果\n").unwrap();
    let state = state_in(&dir);
    let mut trainer = Trainer::new();

    let req = json!({ "type": "convert", "input": &input, "outputDir": "out", "formats": ["json"] });
    let msg: ClientWsMessage = serde_json::from_value(req).unwrap();
    let reply = handle_client_ws(msg, &mut trainer, &state, &mut Closed).await;
    assert!(matches!(reply, ServerWsMessage::Converted(ref s) if s.entries == 1));
    assert!(dir.join("out").join("words.json").exists());
  }
}
