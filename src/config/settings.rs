//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file. These
//! are pure data types; parsing lives in the `parser` module and the
//! conversion to runtime configs lives here.

use std::time::Duration;

use super::defaults::*;
use crate::cache::{CacheConfig, EvictionStrategy};
use crate::governor::GovernorConfig;
use crate::pressure::{ConcurrencyTable, ResourceLimits, ResourceThresholds};
use crate::scheduler::{SchedulerConfig, ThrottleConfig};

/// Complete configuration loaded from an INI file.
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    /// `[limits]` section
    pub limits: LimitsSettings,
    /// `[governor]` section
    pub governor: GovernorSettings,
    /// `[scheduler]` section
    pub scheduler: SchedulerSettings,
    /// `[cache]` section
    pub cache: CacheSettings,
}

/// Pressure thresholds and concurrency caps.
#[derive(Debug, Clone)]
pub struct LimitsSettings {
    pub cpu_warning: f64,
    pub cpu_critical: f64,
    pub memory_warning: f64,
    pub memory_critical: f64,
    pub max_concurrent_normal: usize,
    pub max_concurrent_warning: usize,
    pub max_concurrent_critical: usize,
}

impl Default for LimitsSettings {
    fn default() -> Self {
        Self {
            cpu_warning: DEFAULT_CPU_WARNING,
            cpu_critical: DEFAULT_CPU_CRITICAL,
            memory_warning: DEFAULT_MEMORY_WARNING,
            memory_critical: DEFAULT_MEMORY_CRITICAL,
            max_concurrent_normal: DEFAULT_MAX_CONCURRENT_NORMAL,
            max_concurrent_warning: DEFAULT_MAX_CONCURRENT_WARNING,
            max_concurrent_critical: DEFAULT_MAX_CONCURRENT_CRITICAL,
        }
    }
}

/// Governor loop behavior.
#[derive(Debug, Clone)]
pub struct GovernorSettings {
    pub monitoring_interval_secs: u64,
    pub enforcement_interval_multiplier: u32,
    pub auto_enforcement: bool,
    pub emergency_mode: bool,
    pub history_capacity: usize,
}

impl Default for GovernorSettings {
    fn default() -> Self {
        Self {
            monitoring_interval_secs: DEFAULT_MONITORING_INTERVAL_SECS,
            enforcement_interval_multiplier: DEFAULT_ENFORCEMENT_MULTIPLIER,
            auto_enforcement: true,
            emergency_mode: false,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

/// Scheduler throttling and history.
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub throttle_enabled: bool,
    pub throttle_base_delay_ms: u64,
    pub throttle_max_delay_ms: u64,
    pub task_history_capacity: usize,
    pub drain_grace_secs: u64,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            throttle_enabled: true,
            throttle_base_delay_ms: DEFAULT_THROTTLE_BASE_DELAY_MS,
            throttle_max_delay_ms: DEFAULT_THROTTLE_MAX_DELAY_MS,
            task_history_capacity: DEFAULT_TASK_HISTORY_CAPACITY,
            drain_grace_secs: DEFAULT_DRAIN_GRACE_SECS,
        }
    }
}

/// Cache sizing and strategy.
#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub max_entries: usize,
    pub max_memory_bytes: u64,
    pub default_ttl_secs: u64,
    pub strategy: EvictionStrategy,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_CACHE_MAX_ENTRIES,
            max_memory_bytes: DEFAULT_CACHE_MAX_MEMORY,
            default_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            strategy: EvictionStrategy::Adaptive,
        }
    }
}

impl ConfigFile {
    /// Builds the runtime governor configuration from these settings.
    pub fn to_governor_config(&self) -> GovernorConfig {
        GovernorConfig {
            limits: ResourceLimits {
                cpu: ResourceThresholds::new(self.limits.cpu_warning, self.limits.cpu_critical),
                memory: ResourceThresholds::new(
                    self.limits.memory_warning,
                    self.limits.memory_critical,
                ),
                max_concurrent_by_level: ConcurrencyTable {
                    normal: self.limits.max_concurrent_normal,
                    warning: self.limits.max_concurrent_warning,
                    critical: self.limits.max_concurrent_critical,
                },
            },
            monitoring_interval: Duration::from_secs(self.governor.monitoring_interval_secs),
            enforcement_interval_multiplier: self.governor.enforcement_interval_multiplier,
            auto_enforcement: self.governor.auto_enforcement,
            emergency_mode: self.governor.emergency_mode,
            history_capacity: self.governor.history_capacity,
            scheduler: SchedulerConfig {
                // The cap table is injected from `limits` by the governor
                concurrency: ConcurrencyTable {
                    normal: self.limits.max_concurrent_normal,
                    warning: self.limits.max_concurrent_warning,
                    critical: self.limits.max_concurrent_critical,
                },
                throttle: ThrottleConfig {
                    enabled: self.scheduler.throttle_enabled,
                    base_delay: Duration::from_millis(self.scheduler.throttle_base_delay_ms),
                    max_delay: Duration::from_millis(self.scheduler.throttle_max_delay_ms),
                },
                history_capacity: self.scheduler.task_history_capacity,
                drain_grace: Duration::from_secs(self.scheduler.drain_grace_secs),
            },
            cache: CacheConfig {
                max_entries: self.cache.max_entries,
                max_memory_bytes: self.cache.max_memory_bytes,
                default_ttl: Duration::from_secs(self.cache.default_ttl_secs),
                strategy: self.cache.strategy,
            },
            ..GovernorConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_consistent() {
        let config = ConfigFile::default();
        assert_eq!(config.limits.cpu_warning, 70.0);
        assert_eq!(config.limits.max_concurrent_critical, 1);
        assert!(config.governor.auto_enforcement);
        assert!(!config.governor.emergency_mode);
        assert_eq!(config.cache.strategy, EvictionStrategy::Adaptive);
    }

    #[test]
    fn test_to_governor_config_maps_fields() {
        let mut config = ConfigFile::default();
        config.limits.cpu_warning = 50.0;
        config.limits.max_concurrent_normal = 8;
        config.governor.monitoring_interval_secs = 5;
        config.cache.max_entries = 32;

        let governor = config.to_governor_config();
        assert_eq!(governor.limits.cpu.warning, 50.0);
        assert_eq!(governor.limits.max_concurrent_by_level.normal, 8);
        assert_eq!(governor.monitoring_interval, Duration::from_secs(5));
        assert_eq!(governor.cache.max_entries, 32);
        assert!(governor.validate().is_ok());
    }

    #[test]
    fn test_default_config_validates() {
        assert!(ConfigFile::default().to_governor_config().validate().is_ok());
    }
}
