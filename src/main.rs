//! Next-best-action stream: binary entrypoint.
//! Boots the Axum server: static frontend, `/ws` recommendation stream,
//! health and Prometheus routes.

use next_best_action::{api, config::StreamConfig, telemetry::Telemetry, AppState};
use shuttle_axum::ShuttleAxum;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact logs by default; `NBA_LOG_FORMAT=json` switches to JSON lines.
/// Filter comes from `RUST_LOG` when set.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("next_best_action=info,session=info,http=info,config=info,warn"));

    let json = std::env::var("NBA_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    // The hosting runtime may already own the global subscriber.
    let _ = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
    };
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = StreamConfig::load_default()?;
    info!(
        target: "config",
        tick_interval_ms = config.tick_interval_ms,
        drain_poll_ms = config.drain_poll_ms,
        seeded = config.seed.is_some(),
        static_root = %config.static_root.display(),
        "stream config loaded"
    );

    let mut router = api::router(AppState::from_config(config));
    match Telemetry::init() {
        Ok(telemetry) => router = router.merge(telemetry.router()),
        Err(e) => warn!(error = %e, "prometheus recorder unavailable; /metrics disabled"),
    }

    Ok(router.into())
}
