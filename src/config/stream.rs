// src/config/stream.rs
//! Stream cadence and hosting settings.
//!
//! Load order: `$NBA_CONFIG_PATH` (must exist when set) → `config/stream.toml`
//! (optional) → built-in defaults, then `NBA_*` env overrides on top.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_STREAM_CONFIG_PATH: &str = "config/stream.toml";
pub const ENV_STREAM_CONFIG_PATH: &str = "NBA_CONFIG_PATH";

pub const ENV_INITIAL_WAIT_MS: &str = "NBA_INITIAL_WAIT_MS";
pub const ENV_DRAIN_POLL_MS: &str = "NBA_DRAIN_POLL_MS";
pub const ENV_TICK_INTERVAL_MS: &str = "NBA_TICK_INTERVAL_MS";
pub const ENV_STATIC_ROOT: &str = "NBA_STATIC_ROOT";
pub const ENV_SEED: &str = "NBA_SEED";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// How long a new connection waits for its first preferences message.
    pub initial_wait_ms: u64,
    /// Per-poll wait while draining queued updates after a tick. 0 = non-blocking.
    pub drain_poll_ms: u64,
    /// Pause between ticks.
    pub tick_interval_ms: u64,
    /// Prebuilt frontend (`index.html` + `assets/`).
    pub static_root: PathBuf,
    /// Optional channel blueprint overrides (TOML).
    pub channels_path: PathBuf,
    /// Seed for reproducible sessions; entropy when absent.
    pub seed: Option<u64>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            initial_wait_ms: 2_000,
            drain_poll_ms: 50,
            tick_interval_ms: 3_000,
            static_root: PathBuf::from("frontend/build/client"),
            channels_path: PathBuf::from("config/channels.toml"),
            seed: None,
        }
    }
}

impl StreamConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading stream config from {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parsing stream config {}", path.display()))
    }

    /// File (env path or default path) + env overrides.
    pub fn load_default() -> Result<Self> {
        let mut cfg = match std::env::var(ENV_STREAM_CONFIG_PATH) {
            Ok(p) => {
                let pb = PathBuf::from(p);
                if !pb.exists() {
                    return Err(anyhow!("{ENV_STREAM_CONFIG_PATH} points to non-existent path"));
                }
                Self::load_from_file(&pb)?
            }
            Err(_) => {
                let default_path = PathBuf::from(DEFAULT_STREAM_CONFIG_PATH);
                if default_path.exists() {
                    Self::load_from_file(&default_path)?
                } else {
                    Self::default()
                }
            }
        };
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Some(v) = env_u64(ENV_INITIAL_WAIT_MS) {
            self.initial_wait_ms = v;
        }
        if let Some(v) = env_u64(ENV_DRAIN_POLL_MS) {
            self.drain_poll_ms = v;
        }
        if let Some(v) = env_u64(ENV_TICK_INTERVAL_MS) {
            self.tick_interval_ms = v;
        }
        if let Some(v) = env_u64(ENV_SEED) {
            self.seed = Some(v);
        }
        if let Ok(root) = std::env::var(ENV_STATIC_ROOT) {
            if !root.trim().is_empty() {
                self.static_root = PathBuf::from(root);
            }
        }
    }

    pub fn initial_wait(&self) -> Duration {
        Duration::from_millis(self.initial_wait_ms)
    }

    pub fn drain_poll(&self) -> Duration {
        Duration::from_millis(self.drain_poll_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

fn env_u64(name: &str) -> Option<u64> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(target: "config", var = name, value = %raw, "ignoring unparseable override");
            None
        }
    }
}
