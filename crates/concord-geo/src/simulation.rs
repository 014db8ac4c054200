use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::TravelMode;

/// Minute bounds per mode, per §4.2.
fn bounds(mode: TravelMode) -> (i64, i64) {
    match mode {
        TravelMode::Driving => (15, 120),
        TravelMode::Transit => (20, 150),
        TravelMode::Cycling => (30, 180),
        TravelMode::Walking => (60, 400),
    }
}

/// Deterministic simulated travel time: seeds a PRNG from a stable hash of
/// `(origin, destination, mode)` so the same inputs always produce the same
/// minute count, then draws within the mode's bounds.
pub fn simulate_travel_time(origin: &str, destination: &str, mode: TravelMode) -> i64 {
    let seed = seed_for(origin, destination, mode);
    let mut rng = StdRng::seed_from_u64(seed);
    let (low, high) = bounds(mode);
    rng.gen_range(low..=high)
}

fn seed_for(origin: &str, destination: &str, mode: TravelMode) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    origin.hash(&mut hasher);
    destination.hash(&mut hasher);
    mode.as_str().hash(&mut hasher);
    hasher.finish()
}
