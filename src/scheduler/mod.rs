//! Priority task scheduling with pressure-driven admission control.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TaskScheduler                          │
//! │  schedule() / cancel_all() / stats() / task()               │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐  ┌──────────────┐  ┌────────────────────┐  │
//! │  │ Priority    │  │ Throttle     │  │ Completed-task     │  │
//! │  │ bands (4)   │  │ controller   │  │ history (bounded)  │  │
//! │  └─────────────┘  └──────────────┘  └────────────────────┘  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Dispatch loop: cap from pressure level, strict priority,   │
//! │  FIFO within a band, per-task timeout, panic capture        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The governor owns the scheduler and feeds it the effective pressure
//! level; external collaborators only call [`TaskScheduler::schedule`]
//! and the read-only accessors.

mod core;
mod history;
mod queue;
mod task;
mod throttle;
mod watchdog;

pub use self::core::{SchedulerConfig, SchedulerStats, TaskScheduler};
pub use task::{
    TaskError, TaskFuture, TaskId, TaskPriority, TaskRecord, TaskResult, TaskSpec, TaskState,
};
pub use throttle::{ThrottleConfig, ThrottleController};
pub use watchdog::{StallWatchdog, STALL_DETECTION_THRESHOLD_MS, STALL_WATCHDOG_INTERVAL_SECS};
