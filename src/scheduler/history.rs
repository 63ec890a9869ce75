//! Bounded completed-task history.

use std::collections::VecDeque;

use super::task::{TaskId, TaskRecord};

/// Ring of terminal task records, oldest trimmed first.
///
/// Ownership of a task passes here once it reaches a terminal state; the
/// history is read-only from the outside.
pub(crate) struct CompletedHistory {
    records: VecDeque<TaskRecord>,
    capacity: usize,
}

impl CompletedHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity.min(1024)),
            capacity: capacity.max(1),
        }
    }

    /// Appends a terminal record, trimming the oldest when full.
    pub fn push(&mut self, record: TaskRecord) {
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    /// Looks up one record by ID.
    pub fn get(&self, id: TaskId) -> Option<&TaskRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// A copy of the history, oldest first.
    pub fn snapshot(&self) -> Vec<TaskRecord> {
        self.records.iter().cloned().collect()
    }
}
