//! Adaptive TTL from observed request patterns.
//!
//! Maintains a rolling window of request timestamps keyed by a coarse key
//! prefix (the segment before the first `:`). Prefixes requested more
//! often than every five minutes get double the default TTL; prefixes
//! requested less often than every thirty minutes get half.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// TTL multiplier for hot prefixes (average interval under five minutes).
pub const TTL_FAST_MULTIPLIER: f64 = 2.0;

/// TTL multiplier for cold prefixes (average interval over thirty minutes).
pub const TTL_SLOW_MULTIPLIER: f64 = 0.5;

/// Average inter-request interval below which a prefix counts as hot.
const FAST_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Average inter-request interval above which a prefix counts as cold.
const SLOW_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// Default rolling window length (24 hours).
const DEFAULT_WINDOW: Duration = Duration::from_secs(24 * 3600);

/// Rolling per-prefix request history.
///
/// Readers and writers go through `DashMap`, so recording a request never
/// contends with the cache's coordinating lock.
pub struct AccessPatternWindow {
    window: Duration,
    requests: DashMap<String, VecDeque<Instant>>,
}

impl Default for AccessPatternWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl AccessPatternWindow {
    /// Creates a window keeping request timestamps for `window`.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            requests: DashMap::new(),
        }
    }

    /// The coarse grouping prefix for a key: everything before the first
    /// `:`, or the whole key when it has no segments.
    pub fn prefix_of(key: &str) -> &str {
        key.split(':').next().unwrap_or(key)
    }

    /// Records one request for the key's prefix at `now`.
    pub fn record(&self, key: &str, now: Instant) {
        let prefix = Self::prefix_of(key);
        let mut timestamps = self
            .requests
            .entry(prefix.to_string())
            .or_insert_with(VecDeque::new);

        timestamps.push_back(now);

        // Trim timestamps that have left the rolling window
        let cutoff = now.checked_sub(self.window);
        if let Some(cutoff) = cutoff {
            while timestamps.front().is_some_and(|t| *t < cutoff) {
                timestamps.pop_front();
            }
        }
    }

    /// TTL multiplier for the key's prefix, one of
    /// [`TTL_FAST_MULTIPLIER`], `1.0`, or [`TTL_SLOW_MULTIPLIER`].
    ///
    /// A prefix with fewer than two recorded requests has no measurable
    /// interval and gets the neutral multiplier.
    pub fn ttl_multiplier(&self, key: &str) -> f64 {
        let prefix = Self::prefix_of(key);
        let Some(timestamps) = self.requests.get(prefix) else {
            return 1.0;
        };

        if timestamps.len() < 2 {
            return 1.0;
        }

        let first = *timestamps.front().expect("len checked");
        let last = *timestamps.back().expect("len checked");
        let span = last.saturating_duration_since(first);
        let average = span / (timestamps.len() as u32 - 1);

        if average < FAST_INTERVAL {
            TTL_FAST_MULTIPLIER
        } else if average > SLOW_INTERVAL {
            TTL_SLOW_MULTIPLIER
        } else {
            1.0
        }
    }

    /// Adapted TTL for a key: the default scaled by the prefix multiplier.
    pub fn adapted_ttl(&self, key: &str, default_ttl: Duration) -> Duration {
        default_ttl.mul_f64(self.ttl_multiplier(key))
    }

    /// Number of tracked prefixes.
    pub fn prefix_count(&self) -> usize {
        self.requests.len()
    }
}
