//! Strict-priority FIFO queues.

use std::collections::VecDeque;

use super::task::{TaskFuture, TaskId, TaskPriority};

/// A queued task body awaiting dispatch.
pub(crate) struct QueuedTask {
    pub id: TaskId,
    pub priority: TaskPriority,
    pub future: TaskFuture,
}

/// Four FIFO bands, drained strictly best-priority-first.
#[derive(Default)]
pub(crate) struct PriorityQueue {
    bands: [VecDeque<QueuedTask>; 4],
}

impl PriorityQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a task to its priority band.
    pub fn push(&mut self, task: QueuedTask) {
        self.bands[task.priority.band()].push_back(task);
    }

    /// Returns a task to the head of its band (after an aborted dispatch).
    pub fn push_front(&mut self, task: QueuedTask) {
        self.bands[task.priority.band()].push_front(task);
    }

    /// Pops the head of the highest-priority non-empty band.
    pub fn pop(&mut self) -> Option<QueuedTask> {
        self.bands.iter_mut().find_map(|band| band.pop_front())
    }

    /// Total queued tasks across all bands.
    pub fn len(&self) -> usize {
        self.bands.iter().map(VecDeque::len).sum()
    }

    /// Queued tasks in one band.
    pub fn len_for(&self, priority: TaskPriority) -> usize {
        self.bands[priority.band()].len()
    }

    /// Removes and returns every queued task (used by `cancel_all`).
    pub fn drain_all(&mut self) -> Vec<QueuedTask> {
        let mut drained = Vec::with_capacity(self.len());
        for band in &mut self.bands {
            drained.extend(band.drain(..));
        }
        drained
    }
}
