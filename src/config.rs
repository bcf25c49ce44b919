//! Loading trainer configuration (export limits, converter defaults, session
//! limits, allowed CORS origins) from TOML.
//!
//! See `TrainerConfig` for the expected schema. Every key is optional.

use std::path::PathBuf;

use serde::Deserialize;
use tracing::{error, info};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct TrainerConfig {
  #[serde(default)]
  pub export: ExportConfig,
  #[serde(default)]
  pub convert: ConvertConfig,
  #[serde(default)]
  pub sessions: SessionConfig,
  #[serde(default)]
  pub http: HttpConfig,
}

/// Dictation export limits and defaults. Client paths are resolved under `root_dir`.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
  pub default_batch_size: usize,
  pub max_batch_size: usize,
  pub max_sets: usize,
  pub default_path: PathBuf,
  pub root_dir: PathBuf,
}

impl Default for ExportConfig {
  fn default() -> Self {
    Self {
      default_batch_size: 50,
      max_batch_size: 1000,
      max_sets: 20,
      default_path: PathBuf::from("words_dictation.md"),
      root_dir: PathBuf::from("."),
    }
  }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
  pub output_dir: PathBuf,
  pub root_dir: PathBuf,
}

impl Default for ConvertConfig {
  fn default() -> Self {
    Self { output_dir: PathBuf::from("output"), root_dir: PathBuf::from(".") }
  }
}

/// Bounds on the HTTP session map. WebSocket trainers live on their connection.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
  pub max_sessions: usize,
  /// Sessions untouched for this long are dropped.
  pub idle_ttl_secs: u64,
}

impl Default for SessionConfig {
  fn default() -> Self {
    Self { max_sessions: 256, idle_ttl_secs: 30 * 60 }
  }
}

/// Cross-origin access. Empty means same-origin only (the bundled SPA).
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
  pub allowed_origins: Vec<String>,
}

impl TrainerConfig {
  pub fn from_toml(s: &str) -> Result<Self, toml::de::Error> {
    toml::from_str(s)
  }
}

/// Attempt to load `TrainerConfig` from TRAINER_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_config_from_env() -> Option<TrainerConfig> {
  let path = std::env::var("TRAINER_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match TrainerConfig::from_toml(&s) {
      Ok(cfg) => {
        info!(target: "vocab_drill_backend", %path, "Loaded trainer config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "vocab_drill_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "vocab_drill_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
