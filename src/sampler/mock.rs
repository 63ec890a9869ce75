//! Scripted sampler for tests.

use std::collections::VecDeque;

use tracing::warn;

use super::{ResourceSampler, ResourceSnapshot};

/// Replays a scripted sequence of CPU/memory percentages.
///
/// Once the script is exhausted the behavior depends on how the sampler
/// was built: [`MockSampler::new`] re-issues the last snapshot stale (the
/// same degradation path the OS-backed sampler takes on failure), while
/// [`MockSampler::constant`] keeps producing fresh identical snapshots.
pub struct MockSampler {
    script: VecDeque<(f64, f64)>,
    repeat_last: bool,
    last: ResourceSnapshot,
}

impl MockSampler {
    /// Creates a sampler replaying `(cpu_percent, memory_percent)` pairs.
    pub fn new(script: impl IntoIterator<Item = (f64, f64)>) -> Self {
        Self {
            script: script.into_iter().collect(),
            repeat_last: false,
            last: ResourceSnapshot::empty(),
        }
    }

    /// Creates a sampler that always reports the same values.
    pub fn constant(cpu_percent: f64, memory_percent: f64) -> Self {
        Self {
            script: VecDeque::new(),
            repeat_last: true,
            last: ResourceSnapshot::for_test(cpu_percent, memory_percent),
        }
    }

    /// Remaining scripted samples.
    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl ResourceSampler for MockSampler {
    fn sample(&mut self) -> ResourceSnapshot {
        match self.script.pop_front() {
            Some((cpu, memory)) => {
                let snapshot = ResourceSnapshot::for_test(cpu, memory);
                self.last = snapshot.clone();
                snapshot
            }
            None if self.repeat_last => {
                let snapshot =
                    ResourceSnapshot::for_test(self.last.cpu_percent, self.last.memory_percent);
                self.last = snapshot.clone();
                snapshot
            }
            None => {
                warn!("Mock sampler script exhausted, re-issuing previous snapshot");
                self.last.reissued_stale()
            }
        }
    }
}
