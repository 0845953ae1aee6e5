//! Per-session random source.

use rand::rngs::StdRng;
use rand::SeedableRng;

/// Seeded sessions get `seed + session_id`, so each connection differs but a
/// whole run is reproducible. Without a seed, draw from OS entropy.
pub fn session_rng(seed: Option<u64>, session_id: u64) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(session_id)),
        None => StdRng::from_os_rng(),
    }
}
