//! The task scheduler and its cooperative dispatch loop.
//!
//! # Architecture
//!
//! Callers enqueue work with [`TaskScheduler::schedule`]; the dispatch
//! loop pops the highest-priority band, applies the throttle delay, and
//! spawns the body into a `JoinSet` the loop owns. Every unit of work is
//! therefore a tracked handle inside the scheduler's lifecycle, with no
//! detached background work.
//!
//! The concurrency cap is re-read from the pressure subscription on every
//! dispatch attempt, so admission tightens within one iteration of the
//! governor publishing a worse level.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::Notify;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::pressure::{ConcurrencyTable, PressureLevel, PressureSubscription};

use super::history::CompletedHistory;
use super::queue::{PriorityQueue, QueuedTask};
use super::task::{TaskError, TaskId, TaskPriority, TaskRecord, TaskResult, TaskSpec, TaskState};
use super::throttle::{ThrottleConfig, ThrottleController};
use super::watchdog::{now_epoch_ms, StallWatchdog};

/// How often the dispatch loop re-checks pressure with no other wakeup.
const DISPATCH_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Sentinel meaning "no enforcement override".
const NO_CAP_OVERRIDE: usize = usize::MAX;

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Concurrency cap per pressure level.
    pub concurrency: ConcurrencyTable,
    /// Throttling behavior under pressure.
    pub throttle: ThrottleConfig,
    /// Completed-task history length (default: 100).
    pub history_capacity: usize,
    /// How long shutdown waits for in-flight tasks before aborting them
    /// (default: 10s).
    pub drain_grace: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            concurrency: ConcurrencyTable::default(),
            throttle: ThrottleConfig::default(),
            history_capacity: 100,
            drain_grace: Duration::from_secs(10),
        }
    }
}

/// Point-in-time scheduler counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Tasks accepted by `schedule()`.
    pub scheduled: u64,
    /// Tasks currently waiting in a band.
    pub queued: usize,
    /// Tasks currently running.
    pub active: usize,
    /// Tasks that reached `Completed`.
    pub completed: u64,
    /// Tasks that reached `Failed` (including timeouts).
    pub failed: u64,
    /// Failed tasks whose failure was a timeout.
    pub timed_out: u64,
}

struct SchedulerInner {
    config: SchedulerConfig,
    pressure: PressureSubscription,
    queue: Mutex<PriorityQueue>,
    records: Mutex<HashMap<TaskId, TaskRecord>>,
    history: Mutex<CompletedHistory>,
    throttle: ThrottleController,
    accepting: AtomicBool,
    active: AtomicUsize,
    cap_override: AtomicUsize,
    scheduled: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    timed_out: AtomicU64,
    queued_gauge: Arc<AtomicU64>,
    last_dispatch_ms: Arc<AtomicU64>,
    work_notify: Notify,
}

/// Priority scheduler with pressure-driven admission control.
///
/// Cloning is cheap; all clones share one queue and dispatch loop. The
/// scheduler is owned by the governor; external callers interact only
/// through [`schedule`](Self::schedule), [`cancel_all`](Self::cancel_all),
/// and the read-only accessors.
#[derive(Clone)]
pub struct TaskScheduler {
    inner: Arc<SchedulerInner>,
}

impl TaskScheduler {
    /// Creates a scheduler reading its concurrency cap from `pressure`.
    pub fn new(config: SchedulerConfig, pressure: PressureSubscription) -> Self {
        let throttle = ThrottleController::new(config.throttle.clone());
        let history = CompletedHistory::new(config.history_capacity);
        Self {
            inner: Arc::new(SchedulerInner {
                throttle,
                history: Mutex::new(history),
                config,
                pressure,
                queue: Mutex::new(PriorityQueue::new()),
                records: Mutex::new(HashMap::new()),
                accepting: AtomicBool::new(true),
                active: AtomicUsize::new(0),
                cap_override: AtomicUsize::new(NO_CAP_OVERRIDE),
                scheduled: AtomicU64::new(0),
                completed: AtomicU64::new(0),
                failed: AtomicU64::new(0),
                timed_out: AtomicU64::new(0),
                queued_gauge: Arc::new(AtomicU64::new(0)),
                last_dispatch_ms: Arc::new(AtomicU64::new(now_epoch_ms())),
                work_notify: Notify::new(),
            }),
        }
    }

    /// Enqueues a unit of work. Never blocks.
    ///
    /// The returned ID can be looked up via [`task`](Self::task) for the
    /// lifetime of the record (active, then bounded history). After
    /// [`cancel_all`](Self::cancel_all) new tasks are recorded as `Failed`
    /// without running.
    pub fn schedule<F>(&self, spec: TaskSpec, priority: TaskPriority, future: F) -> TaskId
    where
        F: Future<Output = TaskResult> + Send + 'static,
    {
        let id = TaskId::next();
        let mut record = TaskRecord::new(id, &spec, priority);

        if !self.inner.accepting.load(Ordering::Acquire) {
            warn!(task_id = %id, name = %record.name, "Rejecting task: scheduler is cancelled");
            record.state = TaskState::Failed;
            record.error = Some("scheduler is not accepting tasks".to_string());
            self.inner.history.lock().unwrap().push(record);
            return id;
        }

        debug!(
            task_id = %id,
            name = %record.name,
            priority = priority.as_str(),
            "Task scheduled"
        );

        self.inner.scheduled.fetch_add(1, Ordering::Relaxed);
        self.inner.records.lock().unwrap().insert(id, record);
        self.inner.queue.lock().unwrap().push(QueuedTask {
            id,
            priority,
            future: Box::pin(future),
        });
        self.inner.queued_gauge.fetch_add(1, Ordering::Relaxed);
        self.inner.work_notify.notify_one();

        id
    }

    /// Stops admitting new tasks and clears the queue.
    ///
    /// Queued-but-undispatched tasks are recorded as `Failed`; in-flight
    /// tasks are left to drain.
    pub fn cancel_all(&self) {
        self.inner.accepting.store(false, Ordering::Release);

        let drained = self.inner.queue.lock().unwrap().drain_all();
        let cancelled = drained.len();

        for queued in drained {
            self.inner.queued_gauge.fetch_sub(1, Ordering::Relaxed);
            let record = self.inner.records.lock().unwrap().remove(&queued.id);
            if let Some(mut record) = record {
                record.state = TaskState::Failed;
                record.error = Some("cancelled before dispatch".to_string());
                record.completed_at = Some(Instant::now());
                self.inner.failed.fetch_add(1, Ordering::Relaxed);
                self.inner.history.lock().unwrap().push(record);
            }
        }

        info!(
            cancelled,
            "Scheduler cancelled: queue cleared, in-flight tasks draining"
        );
    }

    /// Whether `schedule()` currently admits tasks.
    pub fn is_accepting(&self) -> bool {
        self.inner.accepting.load(Ordering::Acquire)
    }

    /// The record for a task, live or from the completed history.
    pub fn task(&self, id: TaskId) -> Option<TaskRecord> {
        if let Some(record) = self.inner.records.lock().unwrap().get(&id) {
            return Some(record.clone());
        }
        self.inner.history.lock().unwrap().get(id).cloned()
    }

    /// Current counters.
    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            scheduled: self.inner.scheduled.load(Ordering::Relaxed),
            queued: self.inner.queue.lock().unwrap().len(),
            active: self.inner.active.load(Ordering::Acquire),
            completed: self.inner.completed.load(Ordering::Relaxed),
            failed: self.inner.failed.load(Ordering::Relaxed),
            timed_out: self.inner.timed_out.load(Ordering::Relaxed),
        }
    }

    /// Copy of the bounded completed-task history, oldest first.
    pub fn completed_history(&self) -> Vec<TaskRecord> {
        self.inner.history.lock().unwrap().snapshot()
    }

    /// Number of queued tasks in one band.
    pub fn queued_for(&self, priority: TaskPriority) -> usize {
        self.inner.queue.lock().unwrap().len_for(priority)
    }

    /// Overrides the concurrency cap (governor mitigation).
    ///
    /// The effective cap becomes the minimum of the pressure-table cap and
    /// this value until [`clear_cap_override`](Self::clear_cap_override).
    pub fn apply_cap_override(&self, cap: usize) {
        self.inner.cap_override.store(cap.max(1), Ordering::Release);
    }

    /// Removes the enforcement override.
    pub fn clear_cap_override(&self) {
        self.inner
            .cap_override
            .store(NO_CAP_OVERRIDE, Ordering::Release);
    }

    /// Whether an enforcement override is active.
    pub fn cap_override_active(&self) -> bool {
        self.inner.cap_override.load(Ordering::Acquire) != NO_CAP_OVERRIDE
    }

    /// The cap in force for a level: table value, tightened by override.
    pub fn effective_cap(&self, level: PressureLevel) -> usize {
        let table_cap = self.inner.config.concurrency.cap_for(level);
        table_cap.min(self.inner.cap_override.load(Ordering::Acquire))
    }

    /// A stall watchdog wired to this scheduler's progress counters.
    pub fn watchdog(&self) -> StallWatchdog {
        StallWatchdog::new(
            Arc::clone(&self.inner.last_dispatch_ms),
            Arc::clone(&self.inner.queued_gauge),
        )
    }

    /// Runs the dispatch loop until `shutdown` is cancelled, then drains
    /// in-flight tasks within the configured grace period.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(
            cap_normal = self.inner.config.concurrency.normal,
            cap_warning = self.inner.config.concurrency.warning,
            cap_critical = self.inner.config.concurrency.critical,
            "Scheduler dispatch loop starting"
        );

        let mut tasks: JoinSet<(TaskId, TaskResult)> = JoinSet::new();
        let mut running: HashMap<tokio::task::Id, (TaskId, Instant)> = HashMap::new();

        loop {
            self.dispatch_ready(&mut tasks, &mut running, &shutdown).await;

            tokio::select! {
                biased;

                _ = shutdown.cancelled() => break,

                Some(joined) = tasks.join_next_with_id(), if !tasks.is_empty() => {
                    self.handle_joined(joined, &mut running);
                }

                _ = self.inner.work_notify.notified() => {}

                _ = tokio::time::sleep(DISPATCH_POLL_INTERVAL) => {}
            }
        }

        self.drain(tasks, running).await;
        info!("Scheduler dispatch loop stopped");
    }

    /// Dispatches queued tasks while capacity allows.
    async fn dispatch_ready(
        &self,
        tasks: &mut JoinSet<(TaskId, TaskResult)>,
        running: &mut HashMap<tokio::task::Id, (TaskId, Instant)>,
        shutdown: &CancellationToken,
    ) {
        loop {
            if shutdown.is_cancelled() {
                return;
            }

            let level = self.inner.pressure.level();
            if tasks.len() >= self.effective_cap(level) {
                return;
            }

            let Some(queued) = self.inner.queue.lock().unwrap().pop() else {
                return;
            };
            self.inner.queued_gauge.fetch_sub(1, Ordering::Relaxed);

            let delay = self.inner.throttle.delay_before_dispatch(level);
            if !delay.is_zero() {
                debug!(task_id = %queued.id, delay_ms = delay.as_millis() as u64, "Throttling dispatch");
                tokio::select! {
                    biased;

                    _ = shutdown.cancelled() => {
                        // Put the task back; cancel_all/drain will handle it
                        self.inner.queued_gauge.fetch_add(1, Ordering::Relaxed);
                        self.inner.queue.lock().unwrap().push_front(queued);
                        return;
                    }

                    _ = tokio::time::sleep(delay) => {}
                }
            }

            self.spawn_task(queued, tasks, running);
        }
    }

    /// Moves a queued task to Running and spawns its body.
    fn spawn_task(
        &self,
        queued: QueuedTask,
        tasks: &mut JoinSet<(TaskId, TaskResult)>,
        running: &mut HashMap<tokio::task::Id, (TaskId, Instant)>,
    ) {
        let id = queued.id;
        let started = Instant::now();

        let timeout = {
            let mut records = self.inner.records.lock().unwrap();
            match records.get_mut(&id) {
                Some(record) => {
                    record.state = TaskState::Running;
                    record.started_at = Some(started);
                    record.timeout
                }
                None => {
                    warn!(task_id = %id, "Queued task has no record, dropping");
                    return;
                }
            }
        };

        self.inner.active.fetch_add(1, Ordering::AcqRel);
        self.inner
            .last_dispatch_ms
            .store(now_epoch_ms(), Ordering::Relaxed);
        debug!(task_id = %id, priority = queued.priority.as_str(), "Task dispatched");

        let future = queued.future;
        let abort_handle = tasks.spawn(async move {
            let result = match timeout {
                Some(limit) => match tokio::time::timeout(limit, future).await {
                    Ok(result) => result,
                    Err(_) => Err(TaskError::TimedOut { after: limit }),
                },
                None => future.await,
            };
            (id, result)
        });
        running.insert(abort_handle.id(), (id, started));
    }

    /// Applies one JoinSet completion to the task's record.
    ///
    /// A panic inside a task body surfaces here as a `JoinError`; it is
    /// recorded on the task and never crashes the loop.
    fn handle_joined(
        &self,
        joined: Result<(tokio::task::Id, (TaskId, TaskResult)), tokio::task::JoinError>,
        running: &mut HashMap<tokio::task::Id, (TaskId, Instant)>,
    ) {
        match joined {
            Ok((join_id, (task_id, result))) => {
                let started = running
                    .remove(&join_id)
                    .map(|(_, started)| started)
                    .unwrap_or_else(Instant::now);
                self.complete(task_id, started, result);
            }
            Err(join_err) => {
                let Some((task_id, started)) = running.remove(&join_err.id()) else {
                    warn!(error = %join_err, "Join error for untracked task");
                    return;
                };
                let error = if join_err.is_panic() {
                    TaskError::Panicked(panic_message(join_err.into_panic()))
                } else {
                    TaskError::Failed("cancelled at shutdown".to_string())
                };
                self.complete(task_id, started, Err(error));
            }
        }
    }

    /// Moves a task to its terminal state and into the history.
    fn complete(&self, id: TaskId, started: Instant, outcome: TaskResult) {
        let finished = Instant::now();
        let observed_cpu = self.inner.pressure.current().snapshot.cpu_percent;

        let record = self.inner.records.lock().unwrap().remove(&id);
        let Some(mut record) = record else {
            warn!(task_id = %id, "Completed task has no record");
            self.inner.active.fetch_sub(1, Ordering::AcqRel);
            return;
        };

        record.completed_at = Some(finished);
        record.actual_duration = Some(finished.saturating_duration_since(started));
        record.observed_cpu = Some(observed_cpu);

        match &outcome {
            Ok(()) => {
                record.state = TaskState::Completed;
                self.inner.completed.fetch_add(1, Ordering::Relaxed);
                debug!(
                    task_id = %id,
                    duration_ms = record.actual_duration.unwrap_or_default().as_millis() as u64,
                    "Task completed"
                );
            }
            Err(err) => {
                record.state = TaskState::Failed;
                record.error = Some(err.to_string());
                self.inner.failed.fetch_add(1, Ordering::Relaxed);
                if matches!(err, TaskError::TimedOut { .. }) {
                    self.inner.timed_out.fetch_add(1, Ordering::Relaxed);
                }
                warn!(task_id = %id, error = %err, "Task failed");
            }
        }

        self.inner.history.lock().unwrap().push(record);
        self.inner.active.fetch_sub(1, Ordering::AcqRel);
    }

    /// Lets in-flight tasks finish, aborting whatever outlives the grace.
    async fn drain(
        &self,
        mut tasks: JoinSet<(TaskId, TaskResult)>,
        mut running: HashMap<tokio::task::Id, (TaskId, Instant)>,
    ) {
        if tasks.is_empty() {
            return;
        }

        info!(in_flight = tasks.len(), "Scheduler draining in-flight tasks");
        let deadline = tokio::time::Instant::now() + self.inner.config.drain_grace;

        while !tasks.is_empty() {
            match tokio::time::timeout_at(deadline, tasks.join_next_with_id()).await {
                Ok(Some(joined)) => self.handle_joined(joined, &mut running),
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        remaining = tasks.len(),
                        "Drain grace expired, aborting remaining tasks"
                    );
                    tasks.abort_all();
                    while let Some(joined) = tasks.join_next_with_id().await {
                        self.handle_joined(joined, &mut running);
                    }
                    break;
                }
            }
        }
    }
}

/// Renders a panic payload into a readable message.
fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pressure::PressureSignal;
    use crate::sampler::ResourceSnapshot;
    use std::sync::atomic::AtomicUsize;

    fn serial_config() -> SchedulerConfig {
        SchedulerConfig {
            concurrency: ConcurrencyTable {
                normal: 1,
                warning: 1,
                critical: 1,
            },
            throttle: ThrottleConfig {
                enabled: false,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn scheduler(config: SchedulerConfig) -> TaskScheduler {
        TaskScheduler::new(config, PressureSubscription::fixed_normal())
    }

    /// Polls until `check` passes or the timeout elapses.
    async fn wait_until(check: impl Fn() -> bool) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while !check() {
            if tokio::time::Instant::now() > deadline {
                panic!("condition not reached within 5s");
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test]
    async fn test_schedule_and_complete() {
        let scheduler = scheduler(SchedulerConfig::default());
        let shutdown = CancellationToken::new();
        let loop_handle = {
            let scheduler = scheduler.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move { scheduler.run(shutdown).await })
        };

        let id = scheduler.schedule(TaskSpec::new("quick"), TaskPriority::Normal, async {
            Ok(())
        });

        wait_until(|| scheduler.stats().completed == 1).await;

        let record = scheduler.task(id).unwrap();
        assert_eq!(record.state, TaskState::Completed);
        assert!(record.actual_duration.is_some());
        assert!(record.observed_cpu.is_some());

        shutdown.cancel();
        loop_handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_priority_order_with_single_slot() {
        let scheduler = scheduler(serial_config());
        let order = Arc::new(Mutex::new(Vec::new()));

        // Queue in arrival order Low, Critical, Normal, High before the
        // loop starts, then watch dispatch order.
        for (name, priority) in [
            ("low", TaskPriority::Low),
            ("critical", TaskPriority::Critical),
            ("normal", TaskPriority::Normal),
            ("high", TaskPriority::High),
        ] {
            let order = Arc::clone(&order);
            scheduler.schedule(TaskSpec::new(name), priority, async move {
                order.lock().unwrap().push(name);
                Ok(())
            });
        }

        let shutdown = CancellationToken::new();
        let loop_handle = {
            let scheduler = scheduler.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move { scheduler.run(shutdown).await })
        };

        wait_until(|| scheduler.stats().completed == 4).await;
        assert_eq!(
            *order.lock().unwrap(),
            vec!["critical", "high", "normal", "low"]
        );

        shutdown.cancel();
        loop_handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_timeout_fails_fast() {
        let scheduler = scheduler(SchedulerConfig::default());
        let shutdown = CancellationToken::new();
        let loop_handle = {
            let scheduler = scheduler.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move { scheduler.run(shutdown).await })
        };

        let started = Instant::now();
        let id = scheduler.schedule(
            TaskSpec::new("sleepy").with_timeout(Duration::from_millis(100)),
            TaskPriority::Normal,
            async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(())
            },
        );

        wait_until(|| scheduler.stats().failed == 1).await;
        // Fails at the timeout, not the body duration
        assert!(started.elapsed() < Duration::from_secs(5));

        let record = scheduler.task(id).unwrap();
        assert_eq!(record.state, TaskState::Failed);
        assert!(record.error.as_deref().unwrap().contains("timed out"));
        assert_eq!(scheduler.stats().timed_out, 1);

        shutdown.cancel();
        loop_handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_panic_is_captured_and_loop_survives() {
        let scheduler = scheduler(SchedulerConfig::default());
        let shutdown = CancellationToken::new();
        let loop_handle = {
            let scheduler = scheduler.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move { scheduler.run(shutdown).await })
        };

        let bad = scheduler.schedule(TaskSpec::new("bad"), TaskPriority::Normal, async {
            panic!("boom");
        });
        wait_until(|| scheduler.stats().failed == 1).await;

        let record = scheduler.task(bad).unwrap();
        assert_eq!(record.state, TaskState::Failed);
        assert!(record.error.as_deref().unwrap().contains("boom"));

        // The loop keeps dispatching after a panic
        scheduler.schedule(TaskSpec::new("good"), TaskPriority::Normal, async { Ok(()) });
        wait_until(|| scheduler.stats().completed == 1).await;

        shutdown.cancel();
        loop_handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrency_cap_bounds_active_tasks() {
        let config = SchedulerConfig {
            concurrency: ConcurrencyTable {
                normal: 2,
                warning: 1,
                critical: 1,
            },
            throttle: ThrottleConfig {
                enabled: false,
                ..Default::default()
            },
            ..Default::default()
        };
        let scheduler = scheduler(config);
        let shutdown = CancellationToken::new();
        let loop_handle = {
            let scheduler = scheduler.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move { scheduler.run(shutdown).await })
        };

        let in_flight = Arc::new(AtomicUsize::new(0));
        let high_water = Arc::new(AtomicUsize::new(0));

        for i in 0..6 {
            let in_flight = Arc::clone(&in_flight);
            let high_water = Arc::clone(&high_water);
            scheduler.schedule(
                TaskSpec::new(format!("work-{i}")),
                TaskPriority::Normal,
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    high_water.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                },
            );
        }

        wait_until(|| scheduler.stats().completed == 6).await;
        assert!(high_water.load(Ordering::SeqCst) <= 2);

        shutdown.cancel();
        loop_handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_pressure_level_tightens_cap() {
        let signal = PressureSignal::new();
        let scheduler = TaskScheduler::new(SchedulerConfig::default(), signal.subscribe());

        assert_eq!(scheduler.effective_cap(PressureLevel::Normal), 4);
        assert_eq!(scheduler.effective_cap(PressureLevel::Warning), 2);
        assert_eq!(scheduler.effective_cap(PressureLevel::Critical), 1);

        // Enforcement override tightens further, but never below 1
        scheduler.apply_cap_override(1);
        assert_eq!(scheduler.effective_cap(PressureLevel::Normal), 1);
        scheduler.clear_cap_override();
        assert_eq!(scheduler.effective_cap(PressureLevel::Normal), 4);

        drop(signal);
    }

    #[tokio::test]
    async fn test_cancel_all_rejects_and_clears() {
        let scheduler = scheduler(serial_config());

        // Queue two tasks without a running loop, then cancel
        let queued_id =
            scheduler.schedule(TaskSpec::new("queued"), TaskPriority::Normal, async { Ok(()) });
        scheduler.schedule(TaskSpec::new("queued-2"), TaskPriority::Low, async { Ok(()) });

        scheduler.cancel_all();
        assert!(!scheduler.is_accepting());
        assert_eq!(scheduler.stats().queued, 0);

        let record = scheduler.task(queued_id).unwrap();
        assert_eq!(record.state, TaskState::Failed);
        assert!(record
            .error
            .as_deref()
            .unwrap()
            .contains("cancelled before dispatch"));

        // New tasks are recorded as failed without running
        let late = scheduler.schedule(TaskSpec::new("late"), TaskPriority::Normal, async {
            Ok(())
        });
        let record = scheduler.task(late).unwrap();
        assert_eq!(record.state, TaskState::Failed);
    }

    #[tokio::test]
    async fn test_task_error_recorded() {
        let scheduler = scheduler(SchedulerConfig::default());
        let shutdown = CancellationToken::new();
        let loop_handle = {
            let scheduler = scheduler.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move { scheduler.run(shutdown).await })
        };

        let id = scheduler.schedule(TaskSpec::new("failing"), TaskPriority::High, async {
            Err(TaskError::Failed("sensor offline".to_string()))
        });

        wait_until(|| scheduler.stats().failed == 1).await;
        let record = scheduler.task(id).unwrap();
        assert!(record.error.as_deref().unwrap().contains("sensor offline"));

        shutdown.cancel();
        loop_handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_drains_in_flight() {
        let scheduler = scheduler(SchedulerConfig {
            drain_grace: Duration::from_secs(5),
            ..serial_config()
        });
        let shutdown = CancellationToken::new();
        let loop_handle = {
            let scheduler = scheduler.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move { scheduler.run(shutdown).await })
        };

        let id = scheduler.schedule(TaskSpec::new("slowish"), TaskPriority::Normal, async {
            tokio::time::sleep(Duration::from_millis(150)).await;
            Ok(())
        });

        wait_until(|| scheduler.stats().active == 1).await;
        shutdown.cancel();
        loop_handle.await.unwrap();

        // The in-flight task ran to completion instead of being killed
        let record = scheduler.task(id).unwrap();
        assert_eq!(record.state, TaskState::Completed);
    }

    #[tokio::test]
    async fn test_observed_cpu_comes_from_pressure_signal() {
        let signal = PressureSignal::new();
        signal.publish(PressureLevel::Normal, ResourceSnapshot::for_test(37.5, 20.0));

        let scheduler = TaskScheduler::new(SchedulerConfig::default(), signal.subscribe());
        let shutdown = CancellationToken::new();
        let loop_handle = {
            let scheduler = scheduler.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move { scheduler.run(shutdown).await })
        };

        let id = scheduler.schedule(TaskSpec::new("observe"), TaskPriority::Normal, async {
            Ok(())
        });
        wait_until(|| scheduler.stats().completed == 1).await;

        assert_eq!(scheduler.task(id).unwrap().observed_cpu, Some(37.5));

        shutdown.cancel();
        loop_handle.await.unwrap();
    }
}
