//! Adaptive request-response cache.
//!
//! [`AdaptiveCache`] is a bounded in-memory key/value store with a
//! pluggable eviction strategy (LRU, TTL, Adaptive-score) and, for the
//! Adaptive strategy, a TTL that adapts to how frequently a key prefix is
//! requested.
//!
//! The cache is owned by the governor; mitigation passes call
//! [`AdaptiveCache::shrink_to`] to force eviction under pressure.

mod adaptive_ttl;
mod entry;
mod stats;
mod store;
mod strategy;

pub use adaptive_ttl::{AccessPatternWindow, TTL_FAST_MULTIPLIER, TTL_SLOW_MULTIPLIER};
pub use entry::CacheEntry;
pub use stats::CacheStats;
pub use store::AdaptiveCache;
pub use strategy::EvictionStrategy;

use std::time::Duration;
use thiserror::Error;

/// Cache-related errors.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Entry larger than the per-entry budget (a tenth of cache memory).
    #[error("entry '{key}' too large for cache: {size} bytes > {limit} byte limit")]
    EntryTooLarge { key: String, size: u64, limit: u64 },
}

/// Cache configuration.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries (default: 512)
    pub max_entries: usize,
    /// Maximum total value size in bytes (default: 64 MB)
    pub max_memory_bytes: u64,
    /// TTL applied when `put` is called without one (default: 300s)
    pub default_ttl: Duration,
    /// Eviction strategy (default: Adaptive)
    pub strategy: EvictionStrategy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 512,
            max_memory_bytes: 64 * 1024 * 1024,
            default_ttl: Duration::from_secs(300),
            strategy: EvictionStrategy::Adaptive,
        }
    }
}

impl CacheConfig {
    /// Set the maximum entry count.
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// Set the memory budget in bytes.
    pub fn with_max_memory_bytes(mut self, bytes: u64) -> Self {
        self.max_memory_bytes = bytes;
        self
    }

    /// Set the default TTL.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Set the eviction strategy.
    pub fn with_strategy(mut self, strategy: EvictionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Per-entry size budget: no single entry may exceed a tenth of the
    /// cache's memory budget.
    pub fn max_entry_size(&self) -> u64 {
        self.max_memory_bytes / 10
    }
}
