//! Stall detection watchdog.
//!
//! Monitors scheduler health by tracking dispatch timestamps and warning
//! when the scheduler appears stalled (queued work but no dispatches).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Default stall detection threshold (30 seconds).
pub const STALL_DETECTION_THRESHOLD_MS: u64 = 30_000;

/// Default watchdog check interval (10 seconds).
pub const STALL_WATCHDOG_INTERVAL_SECS: u64 = 10;

/// Stall detection watchdog for the scheduler.
///
/// Periodically checks whether the dispatch loop is making progress. Warns
/// when tasks are queued but nothing has been dispatched for longer than
/// the threshold. Under a Critical concurrency cap of 1 a long-running
/// task can legitimately hold the lane, so this logs rather than acts.
pub struct StallWatchdog {
    /// Shared timestamp of the last dispatch.
    last_dispatch_ms: Arc<AtomicU64>,

    /// Shared count of queued tasks.
    queued_count: Arc<AtomicU64>,

    /// Stall threshold in milliseconds.
    threshold_ms: u64,

    /// Check interval.
    interval: Duration,
}

impl StallWatchdog {
    /// Creates a new stall watchdog with default settings.
    pub fn new(last_dispatch_ms: Arc<AtomicU64>, queued_count: Arc<AtomicU64>) -> Self {
        Self {
            last_dispatch_ms,
            queued_count,
            threshold_ms: STALL_DETECTION_THRESHOLD_MS,
            interval: Duration::from_secs(STALL_WATCHDOG_INTERVAL_SECS),
        }
    }

    /// Sets a custom stall threshold.
    pub fn with_threshold(mut self, threshold: Duration) -> Self {
        self.threshold_ms = threshold.as_millis() as u64;
        self
    }

    /// Sets a custom check interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Runs the watchdog until cancelled.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => break,

                _ = interval.tick() => {
                    self.check_health();
                }
            }
        }
    }

    /// Checks dispatch progress and logs the appropriate message.
    fn check_health(&self) {
        let elapsed_ms = self.elapsed_since_last_dispatch();
        let queued = self.queued_count.load(Ordering::Relaxed);

        match (elapsed_ms > self.threshold_ms, queued > 0) {
            (true, true) => {
                warn!(
                    elapsed_ms,
                    queued,
                    threshold_ms = self.threshold_ms,
                    "STALL DETECTED: {} tasks queued but no dispatch for {}s",
                    queued,
                    elapsed_ms / 1000
                );
            }
            (true, false) => {
                debug!(elapsed_ms, "Stall watchdog: scheduler idle (no queued tasks)");
            }
            (false, _) => {
                debug!(elapsed_ms, queued, "Stall watchdog: dispatch loop healthy");
            }
        }
    }

    /// Returns milliseconds since the last dispatch.
    fn elapsed_since_last_dispatch(&self) -> u64 {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        let last_ms = self.last_dispatch_ms.load(Ordering::Relaxed);
        now_ms.saturating_sub(last_ms)
    }
}

/// Current wall-clock milliseconds since the Unix epoch.
pub(crate) fn now_epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
