//! The resource governor.
//!
//! # Architecture
//!
//! The governor owns one sampler, one scheduler, and one cache, and runs
//! two daemons:
//!
//! 1. **Monitoring loop** (every `monitoring_interval`): sample ->
//!    hysteresis-adjusted evaluate -> record history -> publish the
//!    pressure signal -> fire `on_limit` callbacks.
//! 2. **Enforcement loop** (every `monitoring_interval * multiplier`,
//!    when auto-enforcement is on): read the latest published status and
//!    apply mitigations while pressure is Warning or Critical.
//!
//! Both loops stop before their next iteration once `stop()` cancels the
//! shutdown token. The scheduler's dispatch loop and stall watchdog run
//! under the same token.

use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::{AdaptiveCache, CacheConfig};
use crate::pressure::{evaluate, PressureLevel, PressureSignal, Resource, ResourceLimits};
use crate::sampler::{ResourceSampler, SystemSampler};
use crate::scheduler::{SchedulerConfig, TaskScheduler};

use super::enforcement::{
    memory_trim, EnforcementLog, EnforcementRecord, EnforcementTrigger, MitigationAction,
};
use super::history::SnapshotHistory;
use super::hysteresis::HysteresisTracker;
use super::predict::{forecast_percent, PredictError};
use super::status::{build_status, GovernorStatus};

/// Cache shrink target under Warning pressure (ratio of configured limits).
const SHRINK_RATIO_WARNING: f64 = 0.8;

/// Cache shrink target under Critical pressure.
const SHRINK_RATIO_CRITICAL: f64 = 0.5;

/// Governor configuration.
#[derive(Debug, Clone)]
pub struct GovernorConfig {
    /// Per-resource thresholds and the concurrency cap table.
    pub limits: ResourceLimits,
    /// Monitoring loop interval (default: 10s).
    pub monitoring_interval: Duration,
    /// Enforcement runs every `monitoring_interval * multiplier`
    /// (default: 2).
    pub enforcement_interval_multiplier: u32,
    /// Whether the enforcement loop runs at all (default: true).
    pub auto_enforcement: bool,
    /// Whether Critical pressure triggers emergency mitigation
    /// (default: false).
    pub emergency_mode: bool,
    /// Snapshot history length (default: 200).
    pub history_capacity: usize,
    /// Enforcement record history length (default: 50).
    pub enforcement_history_capacity: usize,
    /// Scheduler settings; its concurrency table is taken from `limits`.
    pub scheduler: SchedulerConfig,
    /// Cache settings.
    pub cache: CacheConfig,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            limits: ResourceLimits::default(),
            monitoring_interval: Duration::from_secs(10),
            enforcement_interval_multiplier: 2,
            auto_enforcement: true,
            emergency_mode: false,
            history_capacity: 200,
            enforcement_history_capacity: 50,
            scheduler: SchedulerConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl GovernorConfig {
    /// Sets the resource limits.
    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Sets the monitoring interval.
    pub fn with_monitoring_interval(mut self, interval: Duration) -> Self {
        self.monitoring_interval = interval;
        self
    }

    /// Enables or disables the enforcement loop.
    pub fn with_auto_enforcement(mut self, enabled: bool) -> Self {
        self.auto_enforcement = enabled;
        self
    }

    /// Enables or disables emergency mitigation at Critical.
    pub fn with_emergency_mode(mut self, enabled: bool) -> Self {
        self.emergency_mode = enabled;
        self
    }

    /// Sets the cache configuration.
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// Sets the scheduler configuration.
    pub fn with_scheduler(mut self, scheduler: SchedulerConfig) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// The enforcement loop interval.
    pub fn enforcement_interval(&self) -> Duration {
        self.monitoring_interval * self.enforcement_interval_multiplier.max(1)
    }

    /// Validates thresholds and the concurrency table.
    pub fn validate(&self) -> Result<(), crate::pressure::LimitsError> {
        self.limits.validate()
    }
}

/// Callback fired from the monitoring loop when a resource is under
/// pressure.
pub type LimitCallback = Arc<dyn Fn(&GovernorStatus) + Send + Sync>;

/// Callback fired after an enforcement pass that took actions.
pub type EnforcementCallback = Arc<dyn Fn(&EnforcementRecord) + Send + Sync>;

/// Callback fired on Critical pressure when emergency mode is enabled.
pub type EmergencyCallback = Arc<dyn Fn(&GovernorStatus) + Send + Sync>;

struct PerResourceTrackers {
    cpu: HysteresisTracker,
    memory: HysteresisTracker,
}

struct GovernorInner {
    config: GovernorConfig,
    sampler: Mutex<Box<dyn ResourceSampler>>,
    signal: PressureSignal,
    scheduler: TaskScheduler,
    cache: Arc<AdaptiveCache>,
    history: Mutex<SnapshotHistory>,
    trackers: Mutex<PerResourceTrackers>,
    enforcement_log: Mutex<EnforcementLog>,
    /// Level of the last enforcement pass that took actions; gates
    /// escalation-only mitigations and the cap restore.
    last_enforced_level: Mutex<PressureLevel>,
    on_limit: Mutex<Vec<LimitCallback>>,
    on_enforcement: Mutex<Vec<EnforcementCallback>>,
    on_emergency: Mutex<Vec<EmergencyCallback>>,
}

struct GovernorRuntime {
    shutdown: CancellationToken,
    loops: Vec<JoinHandle<()>>,
}

/// Coordinates sampling, pressure evaluation, admission control, cache
/// sizing, and enforcement.
///
/// Explicitly constructed and owned by the caller; there is no global
/// instance. Collaborators receive the governor (or its scheduler/cache
/// accessors) by reference.
pub struct ResourceGovernor {
    inner: Arc<GovernorInner>,
    runtime: Mutex<Option<GovernorRuntime>>,
}

impl ResourceGovernor {
    /// Creates a governor backed by the OS sampler.
    pub fn new(config: GovernorConfig) -> Self {
        Self::with_sampler(config, Box::new(SystemSampler::new()))
    }

    /// Creates a governor with a caller-provided sampler backend.
    pub fn with_sampler(config: GovernorConfig, sampler: Box<dyn ResourceSampler>) -> Self {
        let config = match config.validate() {
            Ok(()) => config,
            Err(err) => {
                warn!(error = %err, "Invalid governor limits, falling back to defaults");
                GovernorConfig {
                    limits: ResourceLimits::default(),
                    ..config
                }
            }
        };

        let signal = PressureSignal::new();

        // The scheduler's cap table is the one configured on the limits
        let mut scheduler_config = config.scheduler.clone();
        scheduler_config.concurrency = config.limits.max_concurrent_by_level;
        let scheduler = TaskScheduler::new(scheduler_config, signal.subscribe());

        let cache = Arc::new(AdaptiveCache::new(config.cache.clone()));
        let history = SnapshotHistory::new(config.history_capacity);
        let enforcement_log = EnforcementLog::new(config.enforcement_history_capacity);

        Self {
            inner: Arc::new(GovernorInner {
                config,
                sampler: Mutex::new(sampler),
                signal,
                scheduler,
                cache,
                history: Mutex::new(history),
                trackers: Mutex::new(PerResourceTrackers {
                    cpu: HysteresisTracker::new(),
                    memory: HysteresisTracker::new(),
                }),
                enforcement_log: Mutex::new(enforcement_log),
                last_enforced_level: Mutex::new(PressureLevel::Normal),
                on_limit: Mutex::new(Vec::new()),
                on_enforcement: Mutex::new(Vec::new()),
                on_emergency: Mutex::new(Vec::new()),
            }),
            runtime: Mutex::new(None),
        }
    }

    /// The scheduler owned by this governor.
    pub fn scheduler(&self) -> &TaskScheduler {
        &self.inner.scheduler
    }

    /// The cache owned by this governor.
    pub fn cache(&self) -> &AdaptiveCache {
        &self.inner.cache
    }

    /// Whether the loops are running.
    pub fn is_running(&self) -> bool {
        self.runtime.lock().unwrap().is_some()
    }

    /// Registers a callback fired when any resource is under pressure.
    pub fn register_on_limit(&self, callback: impl Fn(&GovernorStatus) + Send + Sync + 'static) {
        self.inner.on_limit.lock().unwrap().push(Arc::new(callback));
    }

    /// Registers a callback fired after enforcement passes that acted.
    pub fn register_on_enforcement(
        &self,
        callback: impl Fn(&EnforcementRecord) + Send + Sync + 'static,
    ) {
        self.inner
            .on_enforcement
            .lock()
            .unwrap()
            .push(Arc::new(callback));
    }

    /// Registers a callback fired on Critical pressure in emergency mode.
    pub fn register_on_emergency(
        &self,
        callback: impl Fn(&GovernorStatus) + Send + Sync + 'static,
    ) {
        self.inner
            .on_emergency
            .lock()
            .unwrap()
            .push(Arc::new(callback));
    }

    /// Starts the monitoring, enforcement, dispatch, and watchdog loops.
    ///
    /// Must be called within a tokio runtime. Calling `start` twice
    /// without an intervening [`stop`](Self::stop) is a no-op.
    pub fn start(&self) {
        let mut runtime = self.runtime.lock().unwrap();
        if runtime.is_some() {
            warn!("Governor already started");
            return;
        }

        let shutdown = CancellationToken::new();
        let mut loops = Vec::new();

        info!(
            monitoring_interval_secs = self.inner.config.monitoring_interval.as_secs_f64(),
            auto_enforcement = self.inner.config.auto_enforcement,
            emergency_mode = self.inner.config.emergency_mode,
            "Resource governor starting"
        );

        // Monitoring loop
        {
            let inner = Arc::clone(&self.inner);
            let token = shutdown.clone();
            loops.push(tokio::spawn(async move {
                let mut interval = tokio::time::interval(inner.config.monitoring_interval);
                loop {
                    tokio::select! {
                        biased;

                        _ = token.cancelled() => {
                            info!("Monitoring loop shutting down");
                            break;
                        }

                        _ = interval.tick() => {
                            Self::monitor_tick(&inner);
                        }
                    }
                }
            }));
        }

        // Enforcement loop
        if self.inner.config.auto_enforcement {
            let inner = Arc::clone(&self.inner);
            let token = shutdown.clone();
            loops.push(tokio::spawn(async move {
                let mut interval = tokio::time::interval(inner.config.enforcement_interval());
                // The first status is published by the monitoring loop;
                // skip the immediate tick so enforcement never runs first.
                interval.tick().await;
                loop {
                    tokio::select! {
                        biased;

                        _ = token.cancelled() => {
                            info!("Enforcement loop shutting down");
                            break;
                        }

                        _ = interval.tick() => {
                            Self::enforce_pass(&inner, EnforcementTrigger::Automatic, false);
                        }
                    }
                }
            }));
        }

        // Scheduler dispatch loop and stall watchdog
        {
            let scheduler = self.inner.scheduler.clone();
            let token = shutdown.clone();
            loops.push(tokio::spawn(async move { scheduler.run(token).await }));

            let watchdog = self.inner.scheduler.watchdog();
            let token = shutdown.clone();
            loops.push(tokio::spawn(async move { watchdog.run(token).await }));
        }

        *runtime = Some(GovernorRuntime { shutdown, loops });
    }

    /// Stops all loops and waits for them to finish.
    ///
    /// Loops observe the cancellation before their next iteration; the
    /// scheduler drains in-flight tasks within its grace period.
    pub async fn stop(&self) {
        let runtime = self.runtime.lock().unwrap().take();
        let Some(runtime) = runtime else {
            return;
        };

        info!("Resource governor stopping");
        runtime.shutdown.cancel();
        for handle in runtime.loops {
            if let Err(err) = handle.await {
                warn!(error = %err, "Governor loop ended abnormally");
            }
        }
        info!("Resource governor stopped");
    }

    /// The current status: effective levels, exceeded limits, and
    /// recommendations.
    pub fn get_status(&self) -> GovernorStatus {
        Self::current_status(&self.inner)
    }

    /// Runs one enforcement pass now and returns descriptions of the
    /// actions taken.
    ///
    /// With `force`, mitigations run even at Normal pressure and
    /// need-based gates are bypassed.
    pub fn enforce(&self, force: bool) -> Vec<String> {
        Self::enforce_pass(&self.inner, EnforcementTrigger::Manual, force)
    }

    /// Forecasts a resource's usage `hours_ahead` from now via linear
    /// regression over the snapshot history.
    pub fn predict(&self, resource: Resource, hours_ahead: f64) -> Result<f64, PredictError> {
        let points = self.inner.history.lock().unwrap().series(resource);
        let last_t = points.last().map(|(t, _)| *t).unwrap_or(0.0);
        forecast_percent(&points, last_t + hours_ahead * 3600.0)
    }

    /// A copy of the bounded enforcement history, oldest first.
    pub fn enforcement_history(&self) -> Vec<EnforcementRecord> {
        self.inner.enforcement_log.lock().unwrap().snapshot()
    }

    /// Number of snapshots currently held.
    pub fn history_len(&self) -> usize {
        self.inner.history.lock().unwrap().len()
    }

    /// One monitoring iteration: sample, evaluate, record, publish,
    /// notify.
    fn monitor_tick(inner: &GovernorInner) -> GovernorStatus {
        let snapshot = inner.sampler.lock().unwrap().sample();
        let reading = evaluate(&snapshot, &inner.config.limits);

        // Hysteresis sits on top of the raw reading: upgrades pass
        // through, downgrades wait for the band.
        let (cpu_level, memory_level) = {
            let mut trackers = inner.trackers.lock().unwrap();
            (
                trackers.cpu.observe(snapshot.cpu_percent, inner.config.limits.cpu),
                trackers
                    .memory
                    .observe(snapshot.memory_percent, inner.config.limits.memory),
            )
        };
        let level = cpu_level.max(memory_level);

        inner.history.lock().unwrap().push(snapshot.clone());
        inner.signal.publish(level, snapshot.clone());

        let status = build_status(
            &snapshot,
            [
                (Resource::Cpu, cpu_level),
                (Resource::Memory, memory_level),
            ],
            &inner.config.limits,
        );

        debug!(
            raw = reading.level.as_str(),
            effective = level.as_str(),
            cpu = snapshot.cpu_percent,
            memory = snapshot.memory_percent,
            stale = snapshot.stale,
            "Monitoring tick"
        );

        if reading.any_under_pressure() {
            let callbacks = inner.on_limit.lock().unwrap().clone();
            for callback in callbacks {
                callback(&status);
            }
        }

        status
    }

    /// Builds the status from the latest published state.
    fn current_status(inner: &GovernorInner) -> GovernorStatus {
        let state = inner.signal.current();
        let (cpu_level, memory_level) = {
            let trackers = inner.trackers.lock().unwrap();
            (trackers.cpu.current(), trackers.memory.current())
        };

        build_status(
            &state.snapshot,
            [
                (Resource::Cpu, cpu_level),
                (Resource::Memory, memory_level),
            ],
            &inner.config.limits,
        )
    }

    /// One enforcement pass over the latest status.
    ///
    /// Mitigation is best-effort: each action is gated on need so a pass
    /// under unchanged pressure is idempotent, and a failing step never
    /// prevents the following ones.
    fn enforce_pass(
        inner: &GovernorInner,
        trigger: EnforcementTrigger,
        force: bool,
    ) -> Vec<String> {
        let status = Self::current_status(inner);
        let level = status.level;
        let mut actions = Vec::new();

        if level == PressureLevel::Normal && !force {
            // Pressure resolved (through the hysteresis band): relax the
            // enforcement cap and reset the escalation gate.
            if inner.scheduler.cap_override_active() {
                inner.scheduler.clear_cap_override();
                info!("Pressure resolved, scheduler concurrency cap restored");
            }
            *inner.last_enforced_level.lock().unwrap() = PressureLevel::Normal;
            return actions;
        }

        let escalated = {
            let last = inner.last_enforced_level.lock().unwrap();
            level > *last
        };

        for action in MitigationAction::STANDARD {
            match Self::apply_mitigation(inner, action, level, escalated, force) {
                Some(description) => {
                    info!(
                        action = action.as_str(),
                        level = level.as_str(),
                        "{description}"
                    );
                    actions.push(description);
                }
                None => {
                    debug!(action = action.as_str(), "Mitigation not needed");
                }
            }
        }

        if level == PressureLevel::Critical && inner.config.emergency_mode {
            if let Some(description) = Self::apply_emergency(inner, &status) {
                actions.push(description);
            }
        }

        if !actions.is_empty() {
            let record = EnforcementRecord {
                timestamp: SystemTime::now(),
                actions: actions.clone(),
                trigger,
                level,
                status,
            };
            inner.enforcement_log.lock().unwrap().push(record.clone());
            *inner.last_enforced_level.lock().unwrap() = level;

            let callbacks = inner.on_enforcement.lock().unwrap().clone();
            for callback in callbacks {
                callback(&record);
            }
        }

        actions
    }

    /// Applies one mitigation, returning a description when it acted.
    fn apply_mitigation(
        inner: &GovernorInner,
        action: MitigationAction,
        level: PressureLevel,
        escalated: bool,
        force: bool,
    ) -> Option<String> {
        match action {
            MitigationAction::ShrinkCache => {
                let ratio = match level {
                    PressureLevel::Critical => SHRINK_RATIO_CRITICAL,
                    PressureLevel::Warning => SHRINK_RATIO_WARNING,
                    PressureLevel::Normal => 1.0,
                };
                let evicted = inner.cache.shrink_to(ratio);
                (evicted > 0).then(|| {
                    format!(
                        "cache: evicted {evicted} entries down to {:.0}% of budget",
                        ratio * 100.0
                    )
                })
            }
            MitigationAction::ReduceConcurrency => {
                if inner.scheduler.cap_override_active() && !force {
                    return None;
                }
                let table_cap = inner.config.limits.max_concurrent_by_level.cap_for(level);
                let cap = (table_cap / 2).max(1);
                inner.scheduler.apply_cap_override(cap);
                Some(format!("scheduler: concurrency capped at {cap}"))
            }
            MitigationAction::MemoryTrim => {
                if !(escalated || force) {
                    return None;
                }
                memory_trim().then(|| "allocator: returned free heap pages to the OS".to_string())
            }
            // Dispatched by the emergency path, never the standard pass
            MitigationAction::EmergencyFlush => None,
        }
    }

    /// Most aggressive mitigation plus emergency callbacks; never panics
    /// out of the enforcement loop.
    fn apply_emergency(inner: &GovernorInner, status: &GovernorStatus) -> Option<String> {
        warn!("Critical pressure with emergency mode enabled");

        let callbacks = inner.on_emergency.lock().unwrap().clone();
        for callback in callbacks {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                callback(status);
            }));
            if result.is_err() {
                warn!("Emergency callback panicked, continuing");
            }
        }

        inner.scheduler.apply_cap_override(1);

        let entries = inner.cache.entry_count();
        if entries == 0 {
            return None;
        }
        inner.cache.clear();
        Some(format!("cache: emergency flush of {entries} entries"))
    }
}
