//! Host resource sampling.
//!
//! The rest of the system depends only on the [`ResourceSampler`] trait;
//! [`SystemSampler`] is the concrete OS-backed implementation. A sampler
//! never fails its caller: on an OS-introspection error it re-issues the
//! previous snapshot marked stale and logs the problem.

mod mock;
mod system;

pub use mock::MockSampler;
pub use system::SystemSampler;

use std::time::{Instant, SystemTime};
use thiserror::Error;

/// One immutable measurement of host resource usage.
#[derive(Debug, Clone)]
pub struct ResourceSnapshot {
    /// Monotonic capture time, used for history ordering and prediction.
    pub timestamp: Instant,
    /// Wall-clock capture time, used for reporting.
    pub taken_at: SystemTime,
    /// Host-wide CPU usage, 0-100.
    pub cpu_percent: f64,
    /// Host-wide memory usage, 0-100.
    pub memory_percent: f64,
    /// Used memory in bytes.
    pub memory_bytes: u64,
    /// One-minute load average, where the platform reports one.
    pub load_avg: Option<f64>,
    /// True when OS introspection failed and this is a re-issued snapshot.
    pub stale: bool,
}

impl ResourceSnapshot {
    /// A zeroed snapshot, used before the first successful sample.
    pub fn empty() -> Self {
        Self {
            timestamp: Instant::now(),
            taken_at: SystemTime::now(),
            cpu_percent: 0.0,
            memory_percent: 0.0,
            memory_bytes: 0,
            load_avg: None,
            stale: false,
        }
    }

    /// A copy of this snapshot re-issued after a sampling failure.
    pub fn reissued_stale(&self) -> Self {
        let mut copy = self.clone();
        copy.stale = true;
        copy
    }

    /// Measured value for one resource, in percent.
    pub fn value_for(&self, resource: crate::pressure::Resource) -> f64 {
        match resource {
            crate::pressure::Resource::Cpu => self.cpu_percent,
            crate::pressure::Resource::Memory => self.memory_percent,
        }
    }

    /// Snapshot with fixed CPU/memory percentages (tests and examples).
    pub fn for_test(cpu_percent: f64, memory_percent: f64) -> Self {
        Self {
            cpu_percent,
            memory_percent,
            memory_bytes: (memory_percent * 100_000_000.0) as u64,
            ..Self::empty()
        }
    }
}

/// Errors raised by OS introspection.
///
/// These never reach sampler callers; they are logged and the previous
/// snapshot is re-issued stale.
#[derive(Debug, Error)]
pub enum SamplerError {
    #[error("host reported zero total memory")]
    NoMemoryInfo,

    #[error("host CPU counters unavailable: {0}")]
    NoCpuInfo(String),
}

/// Reads OS-level CPU/memory counters into snapshots.
///
/// `sample()` is called on a fixed interval by the governor's monitoring
/// loop and must never panic or block its caller on failure.
pub trait ResourceSampler: Send {
    /// Produces the next snapshot.
    fn sample(&mut self) -> ResourceSnapshot;
}
