//! Simulated performance estimates.
//!
//! These are uniform draws over fixed ranges and carry no statistical
//! relationship to the rest of the recommendation.

use rand::Rng;
use serde::Serialize;

use crate::sources::round2;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    /// e.g. `"12%"`
    pub expected_lift: String,
    pub confidence_score: f64,
    pub sample_size: u32,
}

pub fn estimate<R: Rng + ?Sized>(rng: &mut R) -> Metrics {
    Metrics {
        expected_lift: format!("{}%", rng.random_range(4..=18u32)),
        confidence_score: round2(rng.random_range(0.55..=0.92)),
        sample_size: rng.random_range(1200..=4000u32),
    }
}
