//! # Stream Session
//! One connection's preference state and tick cadence.
//!
//! ```text
//! AwaitingInitial → Streaming → DrainingUpdates → Sleeping → Streaming → …
//!                 any receive/send reporting a close or failure → Closed
//! ```
//!
//! Preferences have exactly one reader and one writer (this task), so no
//! locking is involved. Every update replaces the previous one wholesale.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use metrics::{counter, gauge};
use rand::Rng;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::StreamConfig;
use crate::pipeline::{self, Catalogs};
use crate::preferences::SessionPreferences;
use crate::telemetry;
use crate::transport::{Inbound, Transport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingInitial,
    Streaming,
    DrainingUpdates,
    Sleeping,
    Closed,
}

/// Timing knobs for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    pub initial_wait: Duration,
    pub drain_poll: Duration,
    pub tick_interval: Duration,
}

impl Default for Cadence {
    fn default() -> Self {
        Self {
            initial_wait: Duration::from_secs(2),
            drain_poll: Duration::from_millis(50),
            tick_interval: Duration::from_secs(3),
        }
    }
}

impl From<&StreamConfig> for Cadence {
    fn from(cfg: &StreamConfig) -> Self {
        Self {
            initial_wait: cfg.initial_wait(),
            drain_poll: cfg.drain_poll(),
            tick_interval: cfg.tick_interval(),
        }
    }
}

/// What a finished session reports back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub id: u64,
    pub ticks: u64,
    pub updates: u64,
}

pub struct StreamSession<T, R> {
    id: u64,
    transport: T,
    catalogs: Arc<Catalogs>,
    cadence: Cadence,
    rng: R,
    preferences: SessionPreferences,
    state: SessionState,
    ticks: u64,
    updates: u64,
}

impl<T, R> StreamSession<T, R>
where
    T: Transport,
    R: Rng + Send,
{
    pub fn new(id: u64, transport: T, catalogs: Arc<Catalogs>, cadence: Cadence, rng: R) -> Self {
        Self {
            id,
            transport,
            catalogs,
            cadence,
            rng,
            preferences: SessionPreferences::default(),
            state: SessionState::AwaitingInitial,
            ticks: 0,
            updates: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn preferences(&self) -> &SessionPreferences {
        &self.preferences
    }

    /// Drive the session until the peer goes away.
    pub async fn run(mut self) -> SessionSummary {
        info!(target: "session", id = self.id, "session opened");
        counter!(telemetry::SESSIONS_OPENED).increment(1);
        gauge!(telemetry::SESSIONS_ACTIVE).increment(1.0);

        while self.state != SessionState::Closed {
            self.state = self.step().await;
        }

        gauge!(telemetry::SESSIONS_ACTIVE).decrement(1.0);
        info!(
            target: "session",
            id = self.id,
            ticks = self.ticks,
            updates = self.updates,
            "session closed"
        );
        SessionSummary {
            id: self.id,
            ticks: self.ticks,
            updates: self.updates,
        }
    }

    /// Perform the current state's work and return the next state.
    pub async fn step(&mut self) -> SessionState {
        match self.state {
            SessionState::AwaitingInitial => self.await_initial().await,
            SessionState::Streaming => self.emit_tick().await,
            SessionState::DrainingUpdates => self.drain_updates().await,
            SessionState::Sleeping => self.sleep_until_next_tick().await,
            SessionState::Closed => SessionState::Closed,
        }
    }

    async fn await_initial(&mut self) -> SessionState {
        match self.transport.recv_within(self.cadence.initial_wait).await {
            Inbound::Message(text) => {
                self.adopt(&text);
                SessionState::Streaming
            }
            Inbound::Idle => {
                debug!(target: "session", id = self.id, "no initial preferences; selecting all");
                SessionState::Streaming
            }
            other => self.closed_by(other),
        }
    }

    async fn emit_tick(&mut self) -> SessionState {
        let tick = pipeline::recommend(&self.catalogs, &self.preferences, Utc::now(), &mut self.rng);
        let payload = match serde_json::to_string(&tick) {
            Ok(p) => p,
            Err(e) => {
                warn!(target: "session", id = self.id, error = %e, "tick serialization failed");
                return SessionState::Closed;
            }
        };

        if let Err(e) = self.transport.send_text(payload).await {
            debug!(target: "session", id = self.id, error = %e, "peer gone during send");
            return SessionState::Closed;
        }

        self.ticks += 1;
        counter!(telemetry::TICKS_EMITTED).increment(1);
        debug!(
            target: "session",
            id = self.id,
            tick = self.ticks,
            channel = %tick.right_channel.id,
            sources = tick.data_sources.len(),
            "tick emitted"
        );
        SessionState::DrainingUpdates
    }

    async fn drain_updates(&mut self) -> SessionState {
        loop {
            match self.transport.recv_within(self.cadence.drain_poll).await {
                Inbound::Message(text) => self.adopt(&text),
                Inbound::Idle => return SessionState::Sleeping,
                other => return self.closed_by(other),
            }
        }
    }

    /// Updates arriving while asleep are adopted right away so the next tick sees them.
    async fn sleep_until_next_tick(&mut self) -> SessionState {
        let deadline = Instant::now() + self.cadence.tick_interval;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return SessionState::Streaming;
            }
            match self.transport.recv_within(remaining).await {
                Inbound::Message(text) => self.adopt(&text),
                Inbound::Idle => return SessionState::Streaming,
                other => return self.closed_by(other),
            }
        }
    }

    /// Last write wins; malformed input resets to select-all.
    fn adopt(&mut self, text: &str) {
        self.updates += 1;
        counter!(telemetry::PREFERENCE_UPDATES).increment(1);

        let prefs = match SessionPreferences::try_parse(text) {
            Some(p) => p,
            None => {
                counter!(telemetry::PREFERENCE_PARSE_FAILURES).increment(1);
                debug!(target: "session", id = self.id, len = text.len(), "unparseable preferences; selecting all");
                SessionPreferences::default()
            }
        };
        info!(
            target: "session",
            id = self.id,
            sources = ?prefs.selected_sources,
            channels = ?prefs.selected_channels,
            "preferences adopted"
        );
        self.preferences = prefs;
    }

    fn closed_by(&self, inbound: Inbound) -> SessionState {
        match inbound {
            Inbound::Error(e) => {
                warn!(target: "session", id = self.id, error = %e, "transport error; closing")
            }
            _ => debug!(target: "session", id = self.id, "peer closed"),
        }
        SessionState::Closed
    }
}
