//! Configuration loading.
//!
//! Runtime configuration is assembled from an INI file with four
//! sections (`[limits]`, `[governor]`, `[scheduler]`, `[cache]`); any
//! key not present falls back to its default. [`ConfigFile`] is the
//! parsed form; [`ConfigFile::to_governor_config`] produces the runtime
//! [`crate::governor::GovernorConfig`].
//!
//! ```ini
//! [limits]
//! cpu_warning = 70
//! cpu_critical = 90
//! max_concurrent_normal = 4
//!
//! [cache]
//! max_memory = 64MB
//! strategy = adaptive
//! ```

mod defaults;
mod file;
mod parser;
mod settings;
mod size;

pub use defaults::*;
pub use file::ConfigFileError;
pub use settings::{
    CacheSettings, ConfigFile, GovernorSettings, LimitsSettings, SchedulerSettings,
};
pub use size::{format_size, parse_size, SizeParseError};
