//! Pressure levels, resource limits, and the pure pressure evaluator.
//!
//! A [`PressureLevel`] is a coarse classification of how close a resource
//! is to its configured limit. Levels are totally ordered so the worst
//! per-resource level can be taken as the overall level.

mod evaluator;
mod signal;

pub use evaluator::{evaluate, PressureReading};
pub use signal::{PressureSignal, PressureState, PressureSubscription};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse-grained pressure levels, ordered worst-last.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum PressureLevel {
    /// Resource usage is comfortably below the warning threshold.
    #[default]
    Normal,
    /// Usage has crossed the warning threshold.
    Warning,
    /// Usage has crossed the critical threshold.
    Critical,
}

impl PressureLevel {
    /// All levels, best to worst.
    pub const ALL: [PressureLevel; 3] = [
        PressureLevel::Normal,
        PressureLevel::Warning,
        PressureLevel::Critical,
    ];

    /// The next level down, saturating at `Normal`.
    pub fn one_below(self) -> PressureLevel {
        match self {
            PressureLevel::Critical => PressureLevel::Warning,
            PressureLevel::Warning | PressureLevel::Normal => PressureLevel::Normal,
        }
    }

    /// Short lowercase name for logging and status strings.
    pub fn as_str(self) -> &'static str {
        match self {
            PressureLevel::Normal => "normal",
            PressureLevel::Warning => "warning",
            PressureLevel::Critical => "critical",
        }
    }
}

/// A governed host resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Cpu,
    Memory,
}

impl Resource {
    /// All governed resources.
    pub const ALL: [Resource; 2] = [Resource::Cpu, Resource::Memory];

    /// Short lowercase name for logging and status strings.
    pub fn as_str(self) -> &'static str {
        match self {
            Resource::Cpu => "cpu",
            Resource::Memory => "memory",
        }
    }
}

/// Warning/critical thresholds for one resource, in percent (0-100).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceThresholds {
    /// Enter `Warning` when usage >= this value.
    pub warning: f64,
    /// Enter `Critical` when usage >= this value.
    pub critical: f64,
}

impl ResourceThresholds {
    /// Create thresholds, as `warning`/`critical` percentages.
    pub fn new(warning: f64, critical: f64) -> Self {
        Self { warning, critical }
    }

    /// Level for a measured percentage against these thresholds.
    pub fn level_for(&self, value: f64) -> PressureLevel {
        if value >= self.critical {
            PressureLevel::Critical
        } else if value >= self.warning {
            PressureLevel::Warning
        } else {
            PressureLevel::Normal
        }
    }

    /// The threshold that must be crossed to *enter* the given level.
    ///
    /// `Normal` has no entry threshold and returns 0.
    pub fn threshold_for(&self, level: PressureLevel) -> f64 {
        match level {
            PressureLevel::Normal => 0.0,
            PressureLevel::Warning => self.warning,
            PressureLevel::Critical => self.critical,
        }
    }
}

/// Maximum concurrent scheduler tasks per pressure level.
///
/// Caps must be monotonically non-increasing as pressure worsens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcurrencyTable {
    pub normal: usize,
    pub warning: usize,
    pub critical: usize,
}

impl Default for ConcurrencyTable {
    fn default() -> Self {
        Self {
            normal: 4,
            warning: 2,
            critical: 1,
        }
    }
}

impl ConcurrencyTable {
    /// The cap for a pressure level.
    pub fn cap_for(&self, level: PressureLevel) -> usize {
        match level {
            PressureLevel::Normal => self.normal,
            PressureLevel::Warning => self.warning,
            PressureLevel::Critical => self.critical,
        }
    }

    /// Validates that caps do not increase as pressure worsens and that
    /// every cap admits at least one task.
    pub fn validate(&self) -> Result<(), LimitsError> {
        if self.critical == 0 || self.warning == 0 || self.normal == 0 {
            return Err(LimitsError::ZeroConcurrency);
        }
        if self.warning > self.normal || self.critical > self.warning {
            return Err(LimitsError::NonMonotonicConcurrency {
                normal: self.normal,
                warning: self.warning,
                critical: self.critical,
            });
        }
        Ok(())
    }
}

/// Errors produced by limits validation.
#[derive(Debug, Error)]
pub enum LimitsError {
    #[error("concurrency caps must not increase with pressure: normal={normal}, warning={warning}, critical={critical}")]
    NonMonotonicConcurrency {
        normal: usize,
        warning: usize,
        critical: usize,
    },

    #[error("concurrency cap must admit at least one task at every level")]
    ZeroConcurrency,

    #[error("{resource:?} thresholds inverted: warning={warning} > critical={critical}")]
    InvertedThresholds {
        resource: Resource,
        warning: f64,
        critical: f64,
    },
}

/// Per-resource thresholds plus the concurrency cap table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceLimits {
    pub cpu: ResourceThresholds,
    pub memory: ResourceThresholds,
    pub max_concurrent_by_level: ConcurrencyTable,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            cpu: ResourceThresholds::new(70.0, 90.0),
            memory: ResourceThresholds::new(75.0, 90.0),
            max_concurrent_by_level: ConcurrencyTable::default(),
        }
    }
}

impl ResourceLimits {
    /// Thresholds for one resource.
    pub fn thresholds(&self, resource: Resource) -> ResourceThresholds {
        match resource {
            Resource::Cpu => self.cpu,
            Resource::Memory => self.memory,
        }
    }

    /// Validates thresholds and the concurrency table.
    pub fn validate(&self) -> Result<(), LimitsError> {
        for resource in Resource::ALL {
            let t = self.thresholds(resource);
            if t.warning > t.critical {
                return Err(LimitsError::InvertedThresholds {
                    resource,
                    warning: t.warning,
                    critical: t.critical,
                });
            }
        }
        self.max_concurrent_by_level.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_are_ordered() {
        assert!(PressureLevel::Normal < PressureLevel::Warning);
        assert!(PressureLevel::Warning < PressureLevel::Critical);
    }

    #[test]
    fn test_one_below_saturates() {
        assert_eq!(PressureLevel::Critical.one_below(), PressureLevel::Warning);
        assert_eq!(PressureLevel::Warning.one_below(), PressureLevel::Normal);
        assert_eq!(PressureLevel::Normal.one_below(), PressureLevel::Normal);
    }

    #[test]
    fn test_thresholds_level_for() {
        let t = ResourceThresholds::new(60.0, 80.0);
        assert_eq!(t.level_for(50.0), PressureLevel::Normal);
        assert_eq!(t.level_for(60.0), PressureLevel::Warning);
        assert_eq!(t.level_for(79.9), PressureLevel::Warning);
        assert_eq!(t.level_for(80.0), PressureLevel::Critical);
    }

    #[test]
    fn test_concurrency_table_monotonic() {
        let table = ConcurrencyTable::default();
        assert!(table.validate().is_ok());
        assert!(table.warning <= table.normal);
        assert!(table.critical <= table.warning);
    }

    #[test]
    fn test_concurrency_table_rejects_inversion() {
        let table = ConcurrencyTable {
            normal: 2,
            warning: 4,
            critical: 1,
        };
        assert!(matches!(
            table.validate(),
            Err(LimitsError::NonMonotonicConcurrency { .. })
        ));
    }

    #[test]
    fn test_concurrency_table_rejects_zero() {
        let table = ConcurrencyTable {
            normal: 4,
            warning: 2,
            critical: 0,
        };
        assert!(matches!(table.validate(), Err(LimitsError::ZeroConcurrency)));
    }

    #[test]
    fn test_limits_reject_inverted_thresholds() {
        let limits = ResourceLimits {
            cpu: ResourceThresholds::new(90.0, 70.0),
            ..Default::default()
        };
        assert!(matches!(
            limits.validate(),
            Err(LimitsError::InvertedThresholds {
                resource: Resource::Cpu,
                ..
            })
        ));
    }

    #[test]
    fn test_default_limits_validate() {
        assert!(ResourceLimits::default().validate().is_ok());
    }
}
