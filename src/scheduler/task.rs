//! Task identity, specification, and lifecycle records.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use thiserror::Error;

/// Global counter for generating unique task IDs.
static TASK_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Unique identifier for a scheduled task.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct TaskId(u64);

impl TaskId {
    /// Creates the next unique task ID.
    ///
    /// IDs are monotonically increasing within one process.
    pub fn next() -> Self {
        Self(TASK_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// The numeric value of this ID.
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// Scheduling priority, best-first.
///
/// The dispatcher always drains higher bands before lower ones; within a
/// band, tasks run in arrival order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskPriority {
    Critical,
    High,
    Normal,
    Low,
}

impl TaskPriority {
    /// All priorities, best to worst.
    pub const ALL: [TaskPriority; 4] = [
        TaskPriority::Critical,
        TaskPriority::High,
        TaskPriority::Normal,
        TaskPriority::Low,
    ];

    /// Queue band index, 0 = most urgent.
    pub(crate) fn band(self) -> usize {
        match self {
            TaskPriority::Critical => 0,
            TaskPriority::High => 1,
            TaskPriority::Normal => 2,
            TaskPriority::Low => 3,
        }
    }

    /// Short lowercase name for logging.
    pub fn as_str(self) -> &'static str {
        match self {
            TaskPriority::Critical => "critical",
            TaskPriority::High => "high",
            TaskPriority::Normal => "normal",
            TaskPriority::Low => "low",
        }
    }
}

/// Lifecycle state of a task.
///
/// Transitions are monotonic: `Queued -> Running -> {Completed, Failed}`.
/// A task never re-enters `Queued`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Queued,
    Running,
    Completed,
    Failed,
}

impl TaskState {
    /// Whether this is a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed)
    }
}

/// Caller-provided description of a unit of work.
#[derive(Debug, Clone)]
pub struct TaskSpec {
    /// Human-readable name for logging/display.
    pub name: String,
    /// Hint that the body is CPU-bound.
    pub cpu_intensive: bool,
    /// Caller's runtime estimate, recorded for later comparison.
    pub estimated_duration: Option<Duration>,
    /// Wall-clock limit; exceeding it fails the task.
    pub timeout: Option<Duration>,
}

impl TaskSpec {
    /// Creates a spec with the given name and no hints.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cpu_intensive: false,
            estimated_duration: None,
            timeout: None,
        }
    }

    /// Marks the task CPU-intensive.
    pub fn cpu_intensive(mut self) -> Self {
        self.cpu_intensive = true;
        self
    }

    /// Records the caller's runtime estimate.
    pub fn with_estimated_duration(mut self, estimate: Duration) -> Self {
        self.estimated_duration = Some(estimate);
        self
    }

    /// Sets the wall-clock timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Errors recorded on a failed task.
///
/// These never propagate out of the dispatch loop; they are stored on the
/// task record and surfaced through the completed-task history.
#[derive(Debug, Clone, Error)]
pub enum TaskError {
    /// The task body returned an error.
    #[error("task failed: {0}")]
    Failed(String),

    /// The task exceeded its wall-clock timeout.
    #[error("task timed out after {after:?}")]
    TimedOut { after: Duration },

    /// The task body panicked.
    #[error("task panicked: {0}")]
    Panicked(String),
}

/// Outcome of a task body.
pub type TaskResult = Result<(), TaskError>;

/// A boxed task body, owned by the scheduler from enqueue to completion.
pub type TaskFuture = Pin<Box<dyn Future<Output = TaskResult> + Send>>;

/// The scheduler's record of one task, from enqueue to terminal state.
#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub id: TaskId,
    pub name: String,
    pub priority: TaskPriority,
    pub cpu_intensive: bool,
    pub estimated_duration: Option<Duration>,
    pub timeout: Option<Duration>,
    pub state: TaskState,
    pub created_at: Instant,
    pub started_at: Option<Instant>,
    pub completed_at: Option<Instant>,
    pub actual_duration: Option<Duration>,
    /// Host CPU usage observed when the task completed.
    pub observed_cpu: Option<f64>,
    pub error: Option<String>,
}

impl TaskRecord {
    /// Creates a queued record from a spec.
    pub fn new(id: TaskId, spec: &TaskSpec, priority: TaskPriority) -> Self {
        Self {
            id,
            name: spec.name.clone(),
            priority,
            cpu_intensive: spec.cpu_intensive,
            estimated_duration: spec.estimated_duration,
            timeout: spec.timeout,
            state: TaskState::Queued,
            created_at: Instant::now(),
            started_at: None,
            completed_at: None,
            actual_duration: None,
            observed_cpu: None,
            error: None,
        }
    }
}
