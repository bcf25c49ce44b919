//! Vocab Drill · English/Chinese vocabulary trainer backend
//!
//! - Loads word lists from .txt, .csv and .md files
//! - Quiz loop with a learned set and shuffled rounds, in either direction
//! - Dictation sheet export with per-direction no-repeat pools
//! - `word pos.meaning` list conversion to Markdown/CSV/JSON/TXT
//! - Axum HTTP + WebSocket API, static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT                : u16 (default 3000)
//!   TRAINER_CONFIG_PATH : path to TOML config (export limits, converter output dir)
//!   LOG_LEVEL           : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT          : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod error;
mod config;
mod parser;
mod store;
mod session;
mod allocator;
mod sheet;
mod converter;
mod trainer;
mod state;
mod protocol;
mod logic;
mod routes;

use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Shared state: trainer config and the HTTP session map.
  let state = Arc::new(AppState::new());

  let app = build_router(state.clone());

  // Expire idle HTTP sessions in the background.
  let sweeper = state.clone();
  tokio::spawn(async move {
    let mut tick = tokio::time::interval(Duration::from_secs(60));
    loop {
      tick.tick().await;
      sweeper.prune_sessions().await;
    }
  });

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "vocab_drill_backend", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  info!(target: "vocab_drill_backend", "Server stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "vocab_drill_backend", error = %e, "Failed to listen for Ctrl+C");
    std::future::pending::<()>().await;
  }
  info!(target: "vocab_drill_backend", "Shutdown requested");
}
