//! The adaptive cache store.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::strategy::{order_victims, VictimCandidate};
use super::{AccessPatternWindow, CacheConfig, CacheEntry, CacheError, CacheStats, EvictionStrategy};

/// Bounded key/value store with strategy-driven eviction and adaptive TTL.
///
/// All mutation happens under one coordinating lock; the access-pattern
/// window used for adaptive TTL is independently synchronized so recording
/// a request never blocks a concurrent lookup.
///
/// The cache is owned by the governor and must only be driven through
/// these operations.
pub struct AdaptiveCache {
    config: CacheConfig,
    state: Mutex<CacheState>,
    stats: Mutex<CacheStats>,
    access_window: AccessPatternWindow,
}

struct CacheState {
    entries: HashMap<String, CacheEntry>,
    total_size: u64,
}

impl AdaptiveCache {
    /// Creates an empty cache with the given configuration.
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                total_size: 0,
            }),
            stats: Mutex::new(CacheStats::new()),
            access_window: AccessPatternWindow::default(),
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Looks up a key.
    ///
    /// Returns `None` on a miss or when the entry's TTL has elapsed;
    /// expired entries are removed on the way out. A hit updates the
    /// entry's recency and access count.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        let now = Instant::now();

        if self.config.strategy == EvictionStrategy::Adaptive {
            self.access_window.record(key, now);
        }

        let mut state = self.state.lock().unwrap();

        let expired = state.entries.get(key).map(|entry| entry.is_expired(now));
        let Some(expired) = expired else {
            drop(state);
            self.stats.lock().unwrap().record_miss();
            return None;
        };

        if expired {
            let removed = state.entries.remove(key).expect("entry checked above");
            state.total_size -= removed.size_bytes;
            let (total_size, entry_count) = (state.total_size, state.entries.len());
            drop(state);

            let mut stats = self.stats.lock().unwrap();
            stats.record_expiration();
            stats.record_miss();
            stats.update_size(total_size, entry_count);
            return None;
        }

        let entry = state.entries.get_mut(key).expect("entry checked above");
        entry.touch(now);
        let value = entry.value.clone();
        drop(state);

        self.stats.lock().unwrap().record_hit();
        Some(value)
    }

    /// Inserts or replaces a value.
    ///
    /// Without an explicit TTL the configured default applies, scaled by
    /// the adaptive access-pattern multiplier under the Adaptive strategy.
    /// Entries larger than a tenth of the memory budget are rejected and
    /// the cache is left untouched.
    pub fn put(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<(), CacheError> {
        let size = value.len() as u64;
        let limit = self.config.max_entry_size();
        if size > limit {
            warn!(key, size, limit, "Rejecting oversized cache entry");
            self.stats.lock().unwrap().record_rejected_oversize();
            return Err(CacheError::EntryTooLarge {
                key: key.to_string(),
                size,
                limit,
            });
        }

        let now = Instant::now();
        let ttl = ttl.unwrap_or_else(|| self.effective_default_ttl(key));

        let mut state = self.state.lock().unwrap();

        if let Some(previous) = state
            .entries
            .insert(key.to_string(), CacheEntry::new(value, ttl, now))
        {
            state.total_size -= previous.size_bytes;
        }
        state.total_size += size;

        let evicted = self.evict_over_limits(
            &mut state,
            self.config.max_entries,
            self.config.max_memory_bytes,
            now,
        );

        let (total_size, entry_count) = (state.total_size, state.entries.len());
        drop(state);

        let mut stats = self.stats.lock().unwrap();
        if evicted > 0 {
            stats.record_evictions(evicted);
        }
        stats.update_size(total_size, entry_count);

        Ok(())
    }

    /// Removes one key. Returns whether it was present.
    pub fn invalidate(&self, key: &str) -> bool {
        let mut state = self.state.lock().unwrap();
        let removed = state.entries.remove(key);
        if let Some(entry) = &removed {
            state.total_size -= entry.size_bytes;
        }
        let (total_size, entry_count) = (state.total_size, state.entries.len());
        drop(state);

        self.stats.lock().unwrap().update_size(total_size, entry_count);
        removed.is_some()
    }

    /// Removes every key starting with `prefix`. Returns the removed count.
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        let mut state = self.state.lock().unwrap();

        let victims: Vec<String> = state
            .entries
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();

        for key in &victims {
            if let Some(entry) = state.entries.remove(key) {
                state.total_size -= entry.size_bytes;
            }
        }
        let (total_size, entry_count) = (state.total_size, state.entries.len());
        drop(state);

        self.stats.lock().unwrap().update_size(total_size, entry_count);

        debug!(prefix, removed = victims.len(), "Invalidated cache prefix");
        victims.len()
    }

    /// Removes all entries and resets statistics.
    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap();
        state.entries.clear();
        state.total_size = 0;
        drop(state);

        *self.stats.lock().unwrap() = CacheStats::new();
    }

    /// Current statistics, with the live-entry gauges synchronized.
    pub fn get_stats(&self) -> CacheStats {
        let state = self.state.lock().unwrap();
        let (total_size, entry_count) = (state.total_size, state.entries.len());
        drop(state);

        let mut stats = self.stats.lock().unwrap();
        stats.update_size(total_size, entry_count);
        stats.clone()
    }

    /// Current number of entries.
    pub fn entry_count(&self) -> usize {
        self.state.lock().unwrap().entries.len()
    }

    /// Current total payload size in bytes.
    pub fn size_bytes(&self) -> u64 {
        self.state.lock().unwrap().total_size
    }

    /// Forces an eviction pass down to `ratio` of the configured limits.
    ///
    /// Used by governor mitigation: `shrink_to(0.5)` halves the allowed
    /// entry count and memory for this pass. Returns the number of entries
    /// evicted; calling it again with nothing to evict returns 0.
    pub fn shrink_to(&self, ratio: f64) -> u64 {
        let ratio = ratio.clamp(0.0, 1.0);
        let target_entries = (self.config.max_entries as f64 * ratio) as usize;
        let target_bytes = (self.config.max_memory_bytes as f64 * ratio) as u64;
        let now = Instant::now();

        let mut state = self.state.lock().unwrap();
        let evicted = self.evict_over_limits(&mut state, target_entries, target_bytes, now);
        let (total_size, entry_count) = (state.total_size, state.entries.len());
        drop(state);

        let mut stats = self.stats.lock().unwrap();
        if evicted > 0 {
            stats.record_evictions(evicted);
        }
        stats.update_size(total_size, entry_count);

        evicted
    }

    /// Default TTL for a key, adapted to the observed request pattern
    /// under the Adaptive strategy.
    fn effective_default_ttl(&self, key: &str) -> Duration {
        match self.config.strategy {
            EvictionStrategy::Adaptive => self
                .access_window
                .adapted_ttl(key, self.config.default_ttl),
            EvictionStrategy::Lru | EvictionStrategy::Ttl => self.config.default_ttl,
        }
    }

    /// Evicts entries (victims ordered by the active strategy) until the
    /// cache is under both targets. Returns the evicted count.
    fn evict_over_limits(
        &self,
        state: &mut CacheState,
        max_entries: usize,
        max_bytes: u64,
        now: Instant,
    ) -> u64 {
        if state.entries.len() <= max_entries && state.total_size <= max_bytes {
            return 0;
        }

        let mut candidates: Vec<VictimCandidate> = state
            .entries
            .iter()
            .map(|(key, entry)| VictimCandidate {
                key: key.clone(),
                created_at: entry.created_at,
                last_accessed: entry.last_accessed,
                access_count: entry.access_count,
                size_bytes: entry.size_bytes,
                expired: entry.is_expired(now),
            })
            .collect();

        order_victims(self.config.strategy, &mut candidates, now);

        let mut evicted = 0u64;
        for victim in candidates {
            if state.entries.len() <= max_entries && state.total_size <= max_bytes {
                break;
            }
            if let Some(entry) = state.entries.remove(&victim.key) {
                state.total_size -= entry.size_bytes;
                evicted += 1;
            }
        }

        if evicted > 0 {
            debug!(
                evicted,
                remaining = state.entries.len(),
                size_bytes = state.total_size,
                "Cache eviction pass complete"
            );
        }

        evicted
    }
}
