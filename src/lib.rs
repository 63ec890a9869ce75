//! LoadGuard - adaptive resource governor for embedded use
//!
//! This library monitors host CPU and memory usage, derives a coarse
//! pressure level, and uses that level to admit or throttle background
//! work through a priority scheduler and to size a request-response cache.
//!
//! # High-Level API
//!
//! Most callers construct one [`governor::ResourceGovernor`] and hand out
//! references to its scheduler and cache:
//!
//! ```ignore
//! use loadguard::governor::{GovernorConfig, ResourceGovernor};
//! use loadguard::scheduler::{TaskPriority, TaskSpec};
//!
//! let governor = ResourceGovernor::new(GovernorConfig::default());
//! governor.start();
//!
//! let id = governor.scheduler().schedule(
//!     TaskSpec::new("refresh-zones"),
//!     TaskPriority::Normal,
//!     async { Ok(()) },
//! );
//!
//! let status = governor.get_status();
//! println!("pressure: {:?}", status.level);
//! ```

pub mod cache;
pub mod config;
pub mod governor;
pub mod logging;
pub mod pressure;
pub mod sampler;
pub mod scheduler;

/// Version of the LoadGuard library.
///
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
