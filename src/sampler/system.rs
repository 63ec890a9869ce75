//! OS-backed sampler built on `sysinfo`.

use std::time::{Instant, SystemTime};

use sysinfo::System;
use tracing::warn;

use super::{ResourceSampler, ResourceSnapshot, SamplerError};

/// Samples host CPU and memory usage via the `sysinfo` crate.
///
/// CPU usage is computed from the delta between two refreshes, so the very
/// first sample after construction reports 0% CPU; at the governor's
/// monitoring interval every later sample has a full measurement window.
pub struct SystemSampler {
    system: System,
    last: ResourceSnapshot,
}

impl Default for SystemSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemSampler {
    /// Creates a sampler and primes the CPU counters.
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu_usage();
        system.refresh_memory();

        Self {
            system,
            last: ResourceSnapshot::empty(),
        }
    }

    fn read(&mut self) -> Result<ResourceSnapshot, SamplerError> {
        self.system.refresh_cpu_usage();
        self.system.refresh_memory();

        let total = self.system.total_memory();
        if total == 0 {
            return Err(SamplerError::NoMemoryInfo);
        }
        let used = self.system.used_memory();

        let cpu_percent = f64::from(self.system.global_cpu_info().cpu_usage());
        if !cpu_percent.is_finite() {
            return Err(SamplerError::NoCpuInfo(format!(
                "non-finite usage {cpu_percent}"
            )));
        }

        let load = System::load_average();
        let load_avg = if load.one >= 0.0 { Some(load.one) } else { None };

        Ok(ResourceSnapshot {
            timestamp: Instant::now(),
            taken_at: SystemTime::now(),
            cpu_percent: cpu_percent.clamp(0.0, 100.0),
            memory_percent: (used as f64 / total as f64 * 100.0).clamp(0.0, 100.0),
            memory_bytes: used,
            load_avg,
            stale: false,
        })
    }
}

impl ResourceSampler for SystemSampler {
    fn sample(&mut self) -> ResourceSnapshot {
        match self.read() {
            Ok(snapshot) => {
                self.last = snapshot.clone();
                snapshot
            }
            Err(err) => {
                warn!(error = %err, "Resource sampling failed, re-issuing previous snapshot");
                self.last.reissued_stale()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_never_panics() {
        let mut sampler = SystemSampler::new();
        let snap = sampler.sample();

        assert!(snap.cpu_percent >= 0.0 && snap.cpu_percent <= 100.0);
        assert!(snap.memory_percent >= 0.0 && snap.memory_percent <= 100.0);
    }

    #[test]
    fn test_consecutive_samples_advance_time() {
        let mut sampler = SystemSampler::new();
        let first = sampler.sample();
        let second = sampler.sample();

        assert!(second.timestamp >= first.timestamp);
    }
}
