//! Eviction strategies and victim ordering.
//!
//! An eviction pass collects candidate metadata for every entry, orders
//! the candidates by the active strategy, and removes entries from the
//! front of that ordering until the cache is back under its limits.

use std::str::FromStr;
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Policy used to choose which entries to remove when over capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EvictionStrategy {
    /// Evict least-recently-accessed entries first.
    Lru,
    /// Evict expired entries first, then oldest-created.
    Ttl,
    /// Evict lowest-scoring entries first; expired entries always go.
    #[default]
    Adaptive,
}

impl EvictionStrategy {
    /// Short lowercase name for config files and logging.
    pub fn as_str(self) -> &'static str {
        match self {
            EvictionStrategy::Lru => "lru",
            EvictionStrategy::Ttl => "ttl",
            EvictionStrategy::Adaptive => "adaptive",
        }
    }
}

impl FromStr for EvictionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lru" => Ok(EvictionStrategy::Lru),
            "ttl" => Ok(EvictionStrategy::Ttl),
            "adaptive" => Ok(EvictionStrategy::Adaptive),
            other => Err(format!(
                "unknown eviction strategy '{other}', expected lru, ttl, or adaptive"
            )),
        }
    }
}

/// Per-entry metadata an eviction pass orders on.
#[derive(Debug, Clone)]
pub(crate) struct VictimCandidate {
    pub key: String,
    pub created_at: Instant,
    pub last_accessed: Instant,
    pub access_count: u64,
    pub size_bytes: u64,
    pub expired: bool,
}

impl VictimCandidate {
    /// Adaptive retention score: frequently-accessed, young, small entries
    /// score high; old or large entries score low and are evicted first.
    ///
    /// `score = access_count / age_hours - age_hours - size_mb`
    pub(crate) fn adaptive_score(&self, now: Instant) -> f64 {
        let age_secs = now.saturating_duration_since(self.created_at).as_secs_f64();
        // Floor the age at one second so brand-new entries don't divide by
        // zero into an unbounded score.
        let age_hours = (age_secs / 3600.0).max(1.0 / 3600.0);
        let size_mb = self.size_bytes as f64 / (1024.0 * 1024.0);

        self.access_count as f64 / age_hours - age_hours - size_mb
    }
}

/// Orders candidates so that the best victims come first.
pub(crate) fn order_victims(
    strategy: EvictionStrategy,
    candidates: &mut [VictimCandidate],
    now: Instant,
) {
    match strategy {
        EvictionStrategy::Lru => {
            candidates.sort_by_key(|c| c.last_accessed);
        }
        EvictionStrategy::Ttl => {
            // Expired entries first, then oldest-created
            candidates.sort_by_key(|c| (!c.expired, c.created_at));
        }
        EvictionStrategy::Adaptive => {
            // Expired entries always go first, regardless of score
            candidates.sort_by(|a, b| {
                (!a.expired, a.adaptive_score(now))
                    .partial_cmp(&(!b.expired, b.adaptive_score(now)))
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }
    }
}
