//! Governor status and advisory recommendations.

use serde::Serialize;

use crate::pressure::{PressureLevel, Resource, ResourceLimits};
use crate::sampler::ResourceSnapshot;

/// Per-resource slice of the status.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceStatus {
    pub resource: Resource,
    /// Effective (hysteresis-adjusted) level.
    pub level: PressureLevel,
    /// Measured value in percent.
    pub value_percent: f64,
    /// Raw comparison against the warning threshold.
    pub under_pressure: bool,
}

/// Point-in-time view of the governor.
///
/// An immutable copy, safe to hand to callbacks and display code without
/// touching governor internals.
#[derive(Debug, Clone, Serialize)]
pub struct GovernorStatus {
    /// Worst effective per-resource level.
    pub level: PressureLevel,
    /// One entry per governed resource.
    pub resources: Vec<ResourceStatus>,
    /// Limits currently exceeded, as human-readable strings.
    pub active_limits: Vec<String>,
    /// Advisory next steps for the operator or host integration.
    pub recommendations: Vec<String>,
    /// Whether the underlying snapshot was re-issued after a sampling
    /// failure.
    pub stale: bool,
}

impl GovernorStatus {
    /// Status of one resource.
    pub fn resource(&self, resource: Resource) -> Option<&ResourceStatus> {
        self.resources.iter().find(|r| r.resource == resource)
    }

    /// Whether any resource is under pressure.
    pub fn any_under_pressure(&self) -> bool {
        self.resources.iter().any(|r| r.under_pressure)
    }

    /// An all-normal status with no measurements (pre-start state).
    pub fn empty() -> Self {
        Self {
            level: PressureLevel::Normal,
            resources: Vec::new(),
            active_limits: Vec::new(),
            recommendations: Vec::new(),
            stale: false,
        }
    }
}

/// Builds a status from the latest snapshot and effective levels.
pub(crate) fn build_status(
    snapshot: &ResourceSnapshot,
    effective: [(Resource, PressureLevel); 2],
    limits: &ResourceLimits,
) -> GovernorStatus {
    let mut resources = Vec::with_capacity(2);
    let mut active_limits = Vec::new();

    for (resource, level) in effective {
        let thresholds = limits.thresholds(resource);
        let value = snapshot.value_for(resource);
        let under_pressure = value >= thresholds.warning;

        if value >= thresholds.critical {
            active_limits.push(format!(
                "{} usage {:.1}% >= critical threshold {:.1}%",
                resource.as_str(),
                value,
                thresholds.critical
            ));
        } else if value >= thresholds.warning {
            active_limits.push(format!(
                "{} usage {:.1}% >= warning threshold {:.1}%",
                resource.as_str(),
                value,
                thresholds.warning
            ));
        }

        resources.push(ResourceStatus {
            resource,
            level,
            value_percent: value,
            under_pressure,
        });
    }

    let level = resources
        .iter()
        .map(|r| r.level)
        .max()
        .unwrap_or(PressureLevel::Normal);

    let recommendations = recommend(&resources, level, snapshot.stale);

    GovernorStatus {
        level,
        resources,
        active_limits,
        recommendations,
        stale: snapshot.stale,
    }
}

/// Advisory strings for the current state.
fn recommend(
    resources: &[ResourceStatus],
    level: PressureLevel,
    stale: bool,
) -> Vec<String> {
    let mut recommendations = Vec::new();

    if stale {
        recommendations
            .push("Resource metrics are stale; check host monitoring availability".to_string());
    }

    for status in resources {
        match (status.resource, status.level) {
            (Resource::Cpu, PressureLevel::Critical) => {
                recommendations
                    .push("Pause or reschedule CPU-intensive background tasks".to_string());
            }
            (Resource::Cpu, PressureLevel::Warning) => {
                recommendations.push("Defer low-priority background work".to_string());
            }
            (Resource::Memory, PressureLevel::Critical) => {
                recommendations
                    .push("Clear caches and reduce the cache memory budget".to_string());
            }
            (Resource::Memory, PressureLevel::Warning) => {
                recommendations
                    .push("Shorten cache TTLs or lower the cache entry limit".to_string());
            }
            (_, PressureLevel::Normal) => {}
        }
    }

    if recommendations.is_empty() && level == PressureLevel::Normal {
        recommendations.push("Resource usage is within limits".to_string());
    }

    recommendations
}
