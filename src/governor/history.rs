//! Bounded ring buffer of resource snapshots.

use std::collections::VecDeque;

use crate::pressure::Resource;
use crate::sampler::ResourceSnapshot;

/// Rolling snapshot history used for status and trend prediction.
///
/// Oldest snapshots are trimmed once the capacity is reached; a restart
/// starts from an empty history (no durability requirement).
pub(crate) struct SnapshotHistory {
    snapshots: VecDeque<ResourceSnapshot>,
    capacity: usize,
}

impl SnapshotHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            snapshots: VecDeque::with_capacity(capacity.min(1024)),
            capacity: capacity.max(1),
        }
    }

    /// Appends a snapshot, trimming the oldest when full.
    pub fn push(&mut self, snapshot: ResourceSnapshot) {
        if self.snapshots.len() == self.capacity {
            self.snapshots.pop_front();
        }
        self.snapshots.push_back(snapshot);
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// The history of one resource as `(seconds_since_first, value)`
    /// points, oldest first.
    pub fn series(&self, resource: Resource) -> Vec<(f64, f64)> {
        let Some(first) = self.snapshots.front() else {
            return Vec::new();
        };
        let origin = first.timestamp;

        self.snapshots
            .iter()
            .map(|snapshot| {
                let t = snapshot
                    .timestamp
                    .saturating_duration_since(origin)
                    .as_secs_f64();
                (t, snapshot.value_for(resource))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_push_extends_series() {
        let mut history = SnapshotHistory::new(10);
        history.push(ResourceSnapshot::for_test(10.0, 20.0));
        history.push(ResourceSnapshot::for_test(30.0, 40.0));

        assert_eq!(history.len(), 2);
        let series = history.series(Resource::Cpu);
        assert_eq!(series.last().unwrap().1, 30.0);
    }

    #[test]
    fn test_capacity_trims_oldest() {
        let mut history = SnapshotHistory::new(3);
        for i in 0..5 {
            history.push(ResourceSnapshot::for_test(i as f64, 0.0));
        }

        assert_eq!(history.len(), 3);
        let series = history.series(Resource::Cpu);
        let values: Vec<f64> = series.iter().map(|(_, v)| *v).collect();
        assert_eq!(values, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_series_time_axis_starts_at_zero() {
        let mut history = SnapshotHistory::new(10);
        let mut snapshot = ResourceSnapshot::for_test(1.0, 0.0);
        history.push(snapshot.clone());

        snapshot.timestamp += Duration::from_secs(5);
        snapshot.cpu_percent = 2.0;
        history.push(snapshot);

        let series = history.series(Resource::Cpu);
        assert_eq!(series[0].0, 0.0);
        assert!((series[1].0 - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_empty_series() {
        let history = SnapshotHistory::new(10);
        assert!(history.series(Resource::Memory).is_empty());
    }
}
