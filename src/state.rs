//! Application state: trainer configuration and the per-learner HTTP sessions.
//!
//! Each HTTP session owns one `Trainer` behind its own mutex, so requests for
//! different learners never wait on each other. WebSocket connections keep
//! their trainer on the connection task instead and do not appear here.
//!
//! The session map is bounded: idle sessions expire after `idle_ttl_secs`, and
//! when `max_sessions` is reached the least recently used one is dropped.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use tokio::sync::{Mutex, RwLock};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::config::{load_config_from_env, TrainerConfig};
use crate::trainer::Trainer;

pub type SharedTrainer = Arc<Mutex<Trainer>>;

struct SessionEntry {
    trainer: SharedTrainer,
    last_seen: Instant,
    /// Bumped on every access; orders eviction without relying on clock resolution.
    last_tick: u64,
}

#[derive(Default)]
pub struct SessionMap {
    entries: HashMap<String, SessionEntry>,
    tick: u64,
}

impl SessionMap {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<RwLock<SessionMap>>,
    pub config: TrainerConfig,
}

impl AppState {
    /// Build state from env: load the optional TOML config, start with no sessions.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let config = load_config_from_env().unwrap_or_default();
        info!(
            target: "vocab_drill_backend",
            default_batch_size = config.export.default_batch_size,
            max_batch_size = config.export.max_batch_size,
            max_sets = config.export.max_sets,
            export_root = %config.export.root_dir.display(),
            convert_root = %config.convert.root_dir.display(),
            max_sessions = config.sessions.max_sessions,
            idle_ttl_secs = config.sessions.idle_ttl_secs,
            "Trainer configuration"
        );
        Self::with_config(config)
    }

    pub fn with_config(config: TrainerConfig) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(SessionMap::default())),
            config,
        }
    }

    fn idle_ttl(&self) -> Duration {
        Duration::from_secs(self.config.sessions.idle_ttl_secs)
    }

    /// Register a fresh, empty trainer and return its id. Expired sessions are
    /// dropped first; at capacity the least recently used one makes room.
    #[instrument(level = "debug", skip(self))]
    pub async fn create_session(&self) -> String {
        let id = Uuid::new_v4().to_string();
        let mut map = self.sessions.write().await;
        prune_idle(&mut map, self.idle_ttl(), Instant::now());

        let cap = self.config.sessions.max_sessions.max(1);
        while map.entries.len() >= cap {
            let Some(oldest) = map.entries.iter().min_by_key(|(_, e)| e.last_tick).map(|(k, _)| k.clone()) else {
                break;
            };
            map.entries.remove(&oldest);
            info!(target: "vocab_drill_backend", session = %oldest, "Session evicted (capacity)");
        }

        let tick = map.next_tick();
        map.entries.insert(
            id.clone(),
            SessionEntry {
                trainer: Arc::new(Mutex::new(Trainer::new())),
                last_seen: Instant::now(),
                last_tick: tick,
            },
        );
        info!(target: "vocab_drill_backend", session = %id, active = map.len(), "Session created");
        id
    }

    /// Look up a session and mark it as used. Expired sessions are not returned.
    #[instrument(level = "debug", skip(self), fields(%id))]
    pub async fn get_session(&self, id: &str) -> Option<SharedTrainer> {
        let mut map = self.sessions.write().await;
        let now = Instant::now();
        let ttl = self.idle_ttl();
        let tick = map.next_tick();
        let entry = map.entries.get_mut(id)?;
        if now.duration_since(entry.last_seen) > ttl {
            map.entries.remove(id);
            info!(target: "vocab_drill_backend", session = %id, "Session expired");
            return None;
        }
        entry.last_seen = now;
        entry.last_tick = tick;
        Some(Arc::clone(&entry.trainer))
    }

    /// Drop a session. Returns false when the id was unknown.
    #[instrument(level = "debug", skip(self), fields(%id))]
    pub async fn remove_session(&self, id: &str) -> bool {
        let removed = self.sessions.write().await.entries.remove(id).is_some();
        if removed {
            info!(target: "vocab_drill_backend", session = %id, "Session removed");
        }
        removed
    }

    /// Drop every session idle for longer than the configured TTL.
    pub async fn prune_sessions(&self) -> usize {
        let mut map = self.sessions.write().await;
        prune_idle(&mut map, self.idle_ttl(), Instant::now())
    }
}

fn prune_idle(map: &mut SessionMap, ttl: Duration, now: Instant) -> usize {
    let before = map.entries.len();
    map.entries.retain(|_, e| now.duration_since(e.last_seen) <= ttl);
    let pruned = before - map.entries.len();
    if pruned > 0 {
        info!(target: "vocab_drill_backend", pruned, active = map.entries.len(), "Idle sessions expired");
    }
    pruned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;

    fn state(max_sessions: usize, idle_ttl_secs: u64) -> AppState {
        let mut config = TrainerConfig::default();
        config.sessions = SessionConfig { max_sessions, idle_ttl_secs };
        AppState::with_config(config)
    }

    #[tokio::test]
    async fn sessions_are_independent() {
        let state = state(8, 60);
        let a = state.create_session().await;
        let b = state.create_session().await;
        assert_ne!(a, b);
        assert!(state.get_session(&a).await.is_some());
        assert!(state.get_session("nope").await.is_none());

        let ta = state.get_session(&a).await.unwrap();
        let tb = state.get_session(&b).await.unwrap();
        assert!(!Arc::ptr_eq(&ta, &tb));
    }

    #[tokio::test]
    async fn removed_sessions_are_gone() {
        let state = state(8, 60);
        let a = state.create_session().await;
        assert!(state.remove_session(&a).await);
        assert!(!state.remove_session(&a).await);
        assert!(state.get_session(&a).await.is_none());
    }

    #[tokio::test]
    async fn capacity_evicts_least_recently_used() {
        let state = state(2, 60);
        let a = state.create_session().await;
        let b = state.create_session().await;
        state.get_session(&a).await.unwrap();

        let c = state.create_session().await;
        assert_eq!(state.sessions.read().await.len(), 2);
        assert!(state.get_session(&b).await.is_none());
        assert!(state.get_session(&a).await.is_some());
        assert!(state.get_session(&c).await.is_some());

        for _ in 0..10 {
            state.create_session().await;
        }
        assert_eq!(state.sessions.read().await.len(), 2);
    }

    #[tokio::test]
    async fn idle_sessions_expire() {
        let state = state(8, 0);
        let a = state.create_session().await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(state.get_session(&a).await.is_none());

        state.create_session().await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(state.prune_sessions().await, 1);
        assert_eq!(state.sessions.read().await.len(), 0);
    }
}
