//! The resource governor: monitoring, enforcement, and prediction.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      ResourceGovernor                        │
//! │  start()/stop() · get_status() · enforce() · predict()      │
//! ├──────────────────────────────────────────────────────────────┤
//! │  Monitoring loop (T):    sample → evaluate → record → notify │
//! │  Enforcement loop (2T):  status → mitigate → record actions  │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌──────────────┐  ┌───────────────────────┐  │
//! │  │ Sampler   │  │ TaskScheduler│  │ AdaptiveCache         │  │
//! │  └───────────┘  └──────────────┘  └───────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! One governor instance is constructed and owned by the caller; the
//! scheduler and cache it owns are reached through accessors and never
//! mutated directly.

mod core;
mod enforcement;
mod history;
mod hysteresis;
mod predict;
mod status;

pub use self::core::{
    EmergencyCallback, EnforcementCallback, GovernorConfig, LimitCallback, ResourceGovernor,
};
pub use enforcement::{EnforcementRecord, EnforcementTrigger, MitigationAction};
pub use hysteresis::HYSTERESIS_BAND;
pub use predict::{PredictError, MIN_PREDICTION_POINTS};
pub use status::{GovernorStatus, ResourceStatus};
