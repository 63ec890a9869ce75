//! Default values for all configuration sections.

/// CPU usage percent that enters Warning.
pub const DEFAULT_CPU_WARNING: f64 = 70.0;

/// CPU usage percent that enters Critical.
pub const DEFAULT_CPU_CRITICAL: f64 = 90.0;

/// Memory usage percent that enters Warning.
pub const DEFAULT_MEMORY_WARNING: f64 = 75.0;

/// Memory usage percent that enters Critical.
pub const DEFAULT_MEMORY_CRITICAL: f64 = 90.0;

/// Concurrent task cap at Normal pressure.
pub const DEFAULT_MAX_CONCURRENT_NORMAL: usize = 4;

/// Concurrent task cap at Warning pressure.
pub const DEFAULT_MAX_CONCURRENT_WARNING: usize = 2;

/// Concurrent task cap at Critical pressure.
pub const DEFAULT_MAX_CONCURRENT_CRITICAL: usize = 1;

/// Monitoring loop interval in seconds.
pub const DEFAULT_MONITORING_INTERVAL_SECS: u64 = 10;

/// Enforcement interval as a multiple of the monitoring interval.
pub const DEFAULT_ENFORCEMENT_MULTIPLIER: u32 = 2;

/// Snapshot history ring length.
pub const DEFAULT_HISTORY_CAPACITY: usize = 200;

/// Completed-task history length.
pub const DEFAULT_TASK_HISTORY_CAPACITY: usize = 100;

/// Shutdown drain grace in seconds.
pub const DEFAULT_DRAIN_GRACE_SECS: u64 = 10;

/// Throttle base delay in milliseconds.
pub const DEFAULT_THROTTLE_BASE_DELAY_MS: u64 = 100;

/// Throttle delay ceiling in milliseconds.
pub const DEFAULT_THROTTLE_MAX_DELAY_MS: u64 = 5_000;

/// Cache entry limit.
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 512;

/// Cache memory budget in bytes (64 MB).
pub const DEFAULT_CACHE_MAX_MEMORY: u64 = 64 * 1024 * 1024;

/// Cache default TTL in seconds.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;
