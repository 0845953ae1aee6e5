// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod audience;
pub mod channels;
pub mod config;
pub mod estimates;
pub mod message;
pub mod pipeline;
pub mod preferences;
pub mod rng;
pub mod session;
pub mod sources;
pub mod telemetry;
pub mod timing;
pub mod transport;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::pipeline::{recommend, Catalogs, RecommendationTick};
pub use crate::session::{Cadence, SessionState, StreamSession};
