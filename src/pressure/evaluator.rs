//! Pure snapshot-to-pressure evaluation.
//!
//! [`evaluate`] is deterministic and performs no I/O: given one snapshot
//! and the configured limits it yields the raw (un-hysteresised) pressure
//! reading. The governor applies the downgrade band on top of this.

use super::{PressureLevel, Resource, ResourceLimits};
use crate::sampler::ResourceSnapshot;

/// Result of evaluating one snapshot against the limits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PressureReading {
    /// Worst per-resource level.
    pub level: PressureLevel,
    /// Raw level per resource.
    pub cpu: PressureLevel,
    /// Raw level per resource.
    pub memory: PressureLevel,
}

impl PressureReading {
    /// Raw level for one resource.
    pub fn level_for(&self, resource: Resource) -> PressureLevel {
        match resource {
            Resource::Cpu => self.cpu,
            Resource::Memory => self.memory,
        }
    }

    /// Whether a resource is under pressure (at or above its warning
    /// threshold).
    pub fn under_pressure(&self, resource: Resource) -> bool {
        self.level_for(resource) >= PressureLevel::Warning
    }

    /// Whether any resource is under pressure.
    pub fn any_under_pressure(&self) -> bool {
        Resource::ALL.iter().any(|r| self.under_pressure(*r))
    }
}

/// Evaluates a snapshot against the limits.
///
/// A resource is under pressure when its measured value is at or above its
/// warning threshold; the overall level is the maximum (worst) of the
/// per-resource levels.
pub fn evaluate(snapshot: &ResourceSnapshot, limits: &ResourceLimits) -> PressureReading {
    let cpu = limits.cpu.level_for(snapshot.cpu_percent);
    let memory = limits.memory.level_for(snapshot.memory_percent);

    PressureReading {
        level: cpu.max(memory),
        cpu,
        memory,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pressure::ResourceThresholds;
    use crate::sampler::ResourceSnapshot;

    fn snapshot(cpu: f64, memory: f64) -> ResourceSnapshot {
        ResourceSnapshot::for_test(cpu, memory)
    }

    fn limits() -> ResourceLimits {
        ResourceLimits {
            cpu: ResourceThresholds::new(60.0, 80.0),
            memory: ResourceThresholds::new(70.0, 85.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_all_normal() {
        let reading = evaluate(&snapshot(10.0, 20.0), &limits());
        assert_eq!(reading.level, PressureLevel::Normal);
        assert!(!reading.any_under_pressure());
    }

    #[test]
    fn test_level_is_worst_of_resources() {
        // CPU warning, memory critical -> overall critical
        let reading = evaluate(&snapshot(65.0, 90.0), &limits());
        assert_eq!(reading.cpu, PressureLevel::Warning);
        assert_eq!(reading.memory, PressureLevel::Critical);
        assert_eq!(reading.level, PressureLevel::Critical);
    }

    #[test]
    fn test_under_pressure_at_warning_threshold() {
        // Exactly at the warning threshold counts as under pressure
        let reading = evaluate(&snapshot(60.0, 20.0), &limits());
        assert!(reading.under_pressure(Resource::Cpu));
        assert!(!reading.under_pressure(Resource::Memory));
    }

    #[test]
    fn test_deterministic() {
        let snap = snapshot(72.5, 40.0);
        let l = limits();
        assert_eq!(evaluate(&snap, &l), evaluate(&snap, &l));
    }
}
