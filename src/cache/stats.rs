//! Cache statistics.

/// Counters describing cache effectiveness.
///
/// All counters are monotonically non-decreasing except across an explicit
/// `clear()`, which resets them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups that returned a live entry
    pub hits: u64,
    /// Lookups that found nothing (or only an expired entry)
    pub misses: u64,
    /// Entries removed by an eviction pass
    pub evictions: u64,
    /// Entries removed because their TTL had elapsed
    pub expirations: u64,
    /// Puts rejected for exceeding the per-entry size budget
    pub rejected_oversize: u64,
    /// Current number of live entries
    pub entry_count: usize,
    /// Current total payload size in bytes
    pub total_size_bytes: u64,
}

impl CacheStats {
    /// Creates zeroed stats.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_evictions(&mut self, count: u64) {
        self.evictions += count;
    }

    pub fn record_expiration(&mut self) {
        self.expirations += 1;
    }

    pub fn record_rejected_oversize(&mut self) {
        self.rejected_oversize += 1;
    }

    /// Updates the live-entry gauges.
    pub fn update_size(&mut self, total_size_bytes: u64, entry_count: usize) {
        self.total_size_bytes = total_size_bytes;
        self.entry_count = entry_count;
    }

    /// Hit rate in `[0.0, 1.0]`; 0.0 before any lookup.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
