//! Broadcast of the effective pressure state.
//!
//! The governor's monitoring loop is the single writer; the scheduler's
//! dispatch loop (and tests) subscribe. The state is replaced wholesale on
//! every publish, so readers never observe a partial update.

use super::PressureLevel;
use crate::sampler::ResourceSnapshot;
use tokio::sync::watch;

/// The latest effective pressure state.
#[derive(Debug, Clone)]
pub struct PressureState {
    /// Effective (hysteresis-adjusted) overall level.
    pub level: PressureLevel,
    /// Snapshot the level was derived from.
    pub snapshot: ResourceSnapshot,
}

impl Default for PressureState {
    fn default() -> Self {
        Self {
            level: PressureLevel::Normal,
            snapshot: ResourceSnapshot::empty(),
        }
    }
}

/// Writer half of the pressure broadcast.
pub struct PressureSignal {
    tx: watch::Sender<PressureState>,
}

impl Default for PressureSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl PressureSignal {
    /// Creates a signal starting at `Normal` with an empty snapshot.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(PressureState::default());
        Self { tx }
    }

    /// Publishes a new state, replacing the previous one.
    pub fn publish(&self, level: PressureLevel, snapshot: ResourceSnapshot) {
        self.tx.send_replace(PressureState { level, snapshot });
    }

    /// Creates a new subscription observing the latest state.
    pub fn subscribe(&self) -> PressureSubscription {
        PressureSubscription {
            rx: self.tx.subscribe(),
        }
    }

    /// The currently published state.
    pub fn current(&self) -> PressureState {
        self.tx.borrow().clone()
    }
}

/// Reader half of the pressure broadcast.
#[derive(Clone)]
pub struct PressureSubscription {
    rx: watch::Receiver<PressureState>,
}

impl PressureSubscription {
    /// The latest published state.
    pub fn current(&self) -> PressureState {
        self.rx.borrow().clone()
    }

    /// The latest published level.
    pub fn level(&self) -> PressureLevel {
        self.rx.borrow().level
    }

    /// A subscription pinned to `Normal`, for schedulers running without a
    /// governor (tests, standalone use).
    pub fn fixed_normal() -> Self {
        PressureSignal::new().subscribe()
    }
}
