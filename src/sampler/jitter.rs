//! Jittered poll intervals.

use std::time::Duration;

use rand::Rng;

/// Sleep before the next poll: uniform integer seconds in
/// `[floor(0.95 * base), floor(1.05 * base)]`.
pub fn next_interval<R: Rng + ?Sized>(base_secs: u64, rng: &mut R) -> Duration {
    let (lo, hi) = bounds(base_secs);
    Duration::from_secs(rng.gen_range(lo..=hi))
}

/// Inclusive bounds of the jittered interval in seconds.
pub fn bounds(base_secs: u64) -> (u64, u64) {
    let base = u128::from(base_secs);
    let scale = |pct: u128| u64::try_from(base * pct / 100).unwrap_or(u64::MAX);
    (scale(95), scale(105))
}
