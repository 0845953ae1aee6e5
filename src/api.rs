use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::{
    extract::{State, WebSocketUpgrade},
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{debug, info};

use crate::config::StreamConfig;
use crate::pipeline::Catalogs;
use crate::rng::session_rng;
use crate::session::{Cadence, StreamSession};
use crate::transport::WebSocketTransport;

pub const FALLBACK_INDEX: &str = "<!DOCTYPE html><html><body><p>Build the frontend to serve static assets or run the Vite dev server.</p></body></html>";

#[derive(Clone)]
pub struct AppState {
    pub catalogs: Arc<Catalogs>,
    pub config: Arc<StreamConfig>,
    next_session: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(config: StreamConfig, catalogs: Catalogs) -> Self {
        Self {
            catalogs: Arc::new(catalogs),
            config: Arc::new(config),
            next_session: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Catalogs resolved from the config's override paths.
    pub fn from_config(config: StreamConfig) -> Self {
        let catalogs = Catalogs::load(&config);
        Self::new(config, catalogs)
    }

    fn next_session_id(&self) -> u64 {
        self.next_session.fetch_add(1, Ordering::Relaxed)
    }
}

pub fn router(state: AppState) -> Router {
    let mut app = Router::new()
        .route("/", get(index))
        .route("/health", get(|| async { "ok" }))
        .route("/ws", get(ws_handler));

    let assets = state.config.static_root.join("assets");
    if assets.is_dir() {
        info!(target: "http", dir = %assets.display(), "serving static assets");
        app = app.nest_service("/assets", ServeDir::new(assets));
    }

    app.layer(CorsLayer::very_permissive()).with_state(state)
}

async fn index(State(state): State<AppState>) -> Html<String> {
    let path = state.config.static_root.join("index.html");
    match tokio::fs::read_to_string(&path).await {
        Ok(html) => Html(html),
        Err(e) => {
            debug!(target: "http", path = %path.display(), error = %e, "index missing; serving notice");
            Html(FALLBACK_INDEX.to_string())
        }
    }
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| async move {
        let id = state.next_session_id();
        let session = StreamSession::new(
            id,
            WebSocketTransport::new(socket),
            Arc::clone(&state.catalogs),
            Cadence::from(state.config.as_ref()),
            session_rng(state.config.seed, id),
        );
        session.run().await;
    })
}
