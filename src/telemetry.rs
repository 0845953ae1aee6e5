//! Prometheus exposition for session/tick counters.
//!
//! The binary installs the recorder; without it the `metrics` macros are
//! no-ops, which is what tests run against.

use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub const SESSIONS_OPENED: &str = "nba_sessions_opened_total";
pub const SESSIONS_ACTIVE: &str = "nba_sessions_active";
pub const TICKS_EMITTED: &str = "nba_ticks_emitted_total";
pub const PREFERENCE_UPDATES: &str = "nba_preference_updates_total";
pub const PREFERENCE_PARSE_FAILURES: &str = "nba_preference_parse_failures_total";

pub struct Telemetry {
    pub handle: PrometheusHandle,
}

impl Telemetry {
    /// Install the global Prometheus recorder. Fails if one is already installed.
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new().install_recorder()?;
        ensure_described();
        Ok(Self { handle })
    }

    /// Router exposing `/metrics` in the Prometheus text format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

fn ensure_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(SESSIONS_OPENED, "Websocket sessions accepted.");
        describe_gauge!(SESSIONS_ACTIVE, "Websocket sessions currently streaming.");
        describe_counter!(TICKS_EMITTED, "Recommendation ticks sent to clients.");
        describe_counter!(PREFERENCE_UPDATES, "Inbound preference messages received.");
        describe_counter!(
            PREFERENCE_PARSE_FAILURES,
            "Inbound preference messages that were not a JSON object."
        );
    });
}
