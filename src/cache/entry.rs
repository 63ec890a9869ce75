//! Cache entry metadata.

use std::time::{Duration, Instant};

/// One cached value with the metadata eviction decisions need.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Cached payload
    pub value: Vec<u8>,
    /// Creation time, used for TTL expiry and age-based scoring
    pub created_at: Instant,
    /// Last access time, used for LRU ordering
    pub last_accessed: Instant,
    /// Number of hits against this entry
    pub access_count: u64,
    /// Time-to-live from `created_at`
    pub ttl: Duration,
    /// Payload size in bytes
    pub size_bytes: u64,
}

impl CacheEntry {
    /// Creates a new entry stamped at `now`.
    pub fn new(value: Vec<u8>, ttl: Duration, now: Instant) -> Self {
        let size_bytes = value.len() as u64;
        Self {
            value,
            created_at: now,
            last_accessed: now,
            access_count: 0,
            ttl,
            size_bytes,
        }
    }

    /// Age of the entry at `now`.
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.created_at)
    }

    /// Whether the entry has outlived its TTL at `now`.
    pub fn is_expired(&self, now: Instant) -> bool {
        self.age(now) > self.ttl
    }

    /// Records a hit: bumps the access count and recency.
    pub fn touch(&mut self, now: Instant) {
        self.last_accessed = now;
        self.access_count += 1;
    }
}
