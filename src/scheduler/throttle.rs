//! Dispatch throttling under sustained pressure.
//!
//! When the effective pressure level is above Normal, a delay is inserted
//! before each dispatch. The delay doubles with every throttled dispatch
//! up to a ceiling, and resets as soon as the level is Normal again. The
//! level fed in here is already hysteresis-adjusted by the governor, so
//! the reset inherits the anti-flapping band.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use crate::pressure::PressureLevel;

/// Throttle configuration.
#[derive(Debug, Clone)]
pub struct ThrottleConfig {
    /// Whether throttling is applied at all (default: true)
    pub enabled: bool,
    /// Delay before the first throttled dispatch (default: 100ms)
    pub base_delay: Duration,
    /// Ceiling for the grown delay (default: 5s)
    pub max_delay: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
        }
    }
}

/// Computes per-dispatch delays from the pressure level.
pub struct ThrottleController {
    config: ThrottleConfig,
    /// Dispatches throttled since pressure last returned to Normal.
    throttled_dispatches: AtomicU32,
}

impl ThrottleController {
    pub fn new(config: ThrottleConfig) -> Self {
        Self {
            config,
            throttled_dispatches: AtomicU32::new(0),
        }
    }

    /// The delay to apply before the next dispatch at `level`.
    ///
    /// Returns `Duration::ZERO` (and resets the growth counter) when the
    /// level is Normal or throttling is disabled.
    pub fn delay_before_dispatch(&self, level: PressureLevel) -> Duration {
        if !self.config.enabled || level == PressureLevel::Normal {
            self.throttled_dispatches.store(0, Ordering::Relaxed);
            return Duration::ZERO;
        }

        let count = self.throttled_dispatches.fetch_add(1, Ordering::Relaxed);
        // Cap the exponent so the shift cannot overflow
        let exponent = count.min(16);
        let delay = self
            .config
            .base_delay
            .saturating_mul(1u32 << exponent);
        delay.min(self.config.max_delay)
    }

    /// Dispatches throttled since the last reset.
    pub fn throttled_count(&self) -> u32 {
        self.throttled_dispatches.load(Ordering::Relaxed)
    }
}
