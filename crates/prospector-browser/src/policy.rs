//! Adaptive pacing and fingerprint selection.
//!
//! The policy is a pure function of its configured bounds plus the
//! caller-supplied progress counter. It never touches the network or the
//! store; the Scrape Stage owns the counter and sleeps on the returned
//! durations.

use crate::fingerprint::{FingerprintProfile, CATALOG};
use rand::Rng;
use std::time::Duration;

/// Progress units needed to double the delay bounds.
const DEFAULT_RAMP: f64 = 50.0;
/// Upper cap on the delay scale factor.
const DEFAULT_CEILING: f64 = 2.0;
/// Probability of an occasional longer "reading pause".
const LONG_PAUSE_CHANCE: f64 = 0.2;

/// Produces human-plausible delays and a session fingerprint.
///
/// Delays are drawn uniformly from a bounded range whose bounds both grow
/// monotonically with the number of profiles already processed this
/// session, up to a fixed ceiling. Sustained constant pacing is a
/// detection signal; so is speeding up late in a session.
#[derive(Debug, Clone)]
pub struct BehaviorPolicy {
    delay_min_secs: f64,
    delay_max_secs: f64,
    ramp: f64,
    ceiling: f64,
}

impl BehaviorPolicy {
    /// Create a policy with the configured base delay range in seconds.
    #[must_use]
    pub fn new(delay_min_secs: u64, delay_max_secs: u64) -> Self {
        let min = delay_min_secs as f64;
        Self {
            delay_min_secs: min,
            delay_max_secs: (delay_max_secs as f64).max(min),
            ramp: DEFAULT_RAMP,
            ceiling: DEFAULT_CEILING,
        }
    }

    /// Scale factor for a given progress count: `1 + progress/ramp`,
    /// capped at the ceiling. Monotonic in `progress_count`.
    #[must_use]
    pub fn scale_factor(&self, progress_count: u32) -> f64 {
        (1.0 + f64::from(progress_count) / self.ramp).min(self.ceiling)
    }

    /// The delay range (seconds) the next draw will come from, before any
    /// long-pause extension.
    #[must_use]
    pub fn delay_bounds(&self, progress_count: u32) -> (f64, f64) {
        let f = self.scale_factor(progress_count);
        (self.delay_min_secs * f, self.delay_max_secs * f)
    }

    /// Draw the delay to sleep before the next profile.
    ///
    /// Roughly one draw in five is extended to 1.5-2.5x the upper bound,
    /// imitating a reader pausing on an interesting profile.
    #[must_use]
    pub fn next_delay(&self, progress_count: u32) -> Duration {
        let (lower, upper) = self.delay_bounds(progress_count);
        let mut rng = rand::thread_rng();

        let secs = if rng.gen_bool(LONG_PAUSE_CHANCE) {
            upper * rng.gen_range(1.5..=2.5)
        } else {
            rng.gen_range(lower..=upper)
        };

        Duration::from_secs_f64(secs)
    }

    /// Pick a fingerprint from the catalog.
    ///
    /// Callers sample once per session and reuse the result; switching
    /// fingerprints mid-session is an intra-session inconsistency.
    #[must_use]
    pub fn next_fingerprint(&self) -> FingerprintProfile {
        let mut rng = rand::thread_rng();
        CATALOG[rng.gen_range(0..CATALOG.len())]
    }
}
