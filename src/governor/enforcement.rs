//! Mitigation actions and the enforcement history.
//!
//! Mitigations are a closed set of variants dispatched by `match` in the
//! governor core; there is no name-based lookup of enforcement steps.

use std::collections::VecDeque;
use std::time::SystemTime;

use serde::Serialize;

use super::status::GovernorStatus;
use crate::pressure::PressureLevel;

/// What initiated an enforcement pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnforcementTrigger {
    /// The enforcement loop.
    Automatic,
    /// A direct `enforce()` call.
    Manual,
}

/// The closed set of mitigations the governor can apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MitigationAction {
    /// Force a cache eviction pass down to a pressure-dependent ratio.
    ShrinkCache,
    /// Tighten the scheduler's concurrency cap beyond the pressure table.
    ReduceConcurrency,
    /// Ask the allocator to return free heap pages to the OS.
    MemoryTrim,
    /// Emergency only: drop the whole cache.
    EmergencyFlush,
}

impl MitigationAction {
    /// Mitigations applied, in order, on a Warning/Critical pass.
    pub const STANDARD: [MitigationAction; 3] = [
        MitigationAction::ShrinkCache,
        MitigationAction::ReduceConcurrency,
        MitigationAction::MemoryTrim,
    ];

    /// Short lowercase name for logging.
    pub fn as_str(self) -> &'static str {
        match self {
            MitigationAction::ShrinkCache => "shrink_cache",
            MitigationAction::ReduceConcurrency => "reduce_concurrency",
            MitigationAction::MemoryTrim => "memory_trim",
            MitigationAction::EmergencyFlush => "emergency_flush",
        }
    }
}

/// One enforcement pass that performed at least one action.
#[derive(Debug, Clone, Serialize)]
pub struct EnforcementRecord {
    /// Wall-clock time of the pass.
    pub timestamp: SystemTime,
    /// Human-readable descriptions of the actions taken, in order.
    pub actions: Vec<String>,
    /// What initiated the pass.
    pub trigger: EnforcementTrigger,
    /// Effective pressure level at the time of the pass.
    pub level: PressureLevel,
    /// Status observed when the pass ran.
    pub status: GovernorStatus,
}

/// Append-only bounded log of enforcement records.
pub(crate) struct EnforcementLog {
    records: VecDeque<EnforcementRecord>,
    capacity: usize,
}

impl EnforcementLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity.min(256)),
            capacity: capacity.max(1),
        }
    }

    /// Appends a record, trimming the oldest when full.
    pub fn push(&mut self, record: EnforcementRecord) {
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    /// A copy of the log, oldest first.
    pub fn snapshot(&self) -> Vec<EnforcementRecord> {
        self.records.iter().cloned().collect()
    }
}

/// Asks the allocator to return free heap pages to the OS.
///
/// Supported on glibc Linux via `malloc_trim`; elsewhere this reports
/// `false` and the mitigation is skipped.
#[cfg(all(target_os = "linux", target_env = "gnu"))]
pub(crate) fn memory_trim() -> bool {
    // SAFETY: malloc_trim only releases free heap pages and touches no
    // live allocations.
    unsafe { libc::malloc_trim(0) == 1 }
}

#[cfg(not(all(target_os = "linux", target_env = "gnu")))]
pub(crate) fn memory_trim() -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(level: PressureLevel, action: &str) -> EnforcementRecord {
        EnforcementRecord {
            timestamp: SystemTime::now(),
            actions: vec![action.to_string()],
            trigger: EnforcementTrigger::Automatic,
            level,
            status: GovernorStatus::empty(),
        }
    }

    #[test]
    fn test_log_is_bounded() {
        let mut log = EnforcementLog::new(2);
        log.push(record(PressureLevel::Warning, "first"));
        log.push(record(PressureLevel::Warning, "second"));
        log.push(record(PressureLevel::Critical, "third"));

        let snapshot = log.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].actions, vec!["second"]);
        assert_eq!(snapshot[1].actions, vec!["third"]);
    }

    #[test]
    fn test_standard_mitigation_order() {
        assert_eq!(
            MitigationAction::STANDARD,
            [
                MitigationAction::ShrinkCache,
                MitigationAction::ReduceConcurrency,
                MitigationAction::MemoryTrim,
            ]
        );
    }

    #[test]
    fn test_memory_trim_does_not_panic() {
        // Result depends on platform; calling it must always be safe
        let _ = memory_trim();
    }
}
