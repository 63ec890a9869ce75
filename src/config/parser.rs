//! INI parsing logic for converting `Ini` -> `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct
//! fields. Parsing starts from `ConfigFile::default()` and overlays any
//! values found in the INI.

use ini::{Ini, Properties};

use super::file::ConfigFileError;
use super::settings::ConfigFile;
use super::size::parse_size;

/// Parse an `Ini` object into a `ConfigFile`.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    if let Some(section) = ini.section(Some("limits")) {
        if section.get("cpu_warning").is_some() {
            config.limits.cpu_warning = parse_percent(section, "limits", "cpu_warning")?;
        }
        if section.get("cpu_critical").is_some() {
            config.limits.cpu_critical = parse_percent(section, "limits", "cpu_critical")?;
        }
        if section.get("memory_warning").is_some() {
            config.limits.memory_warning = parse_percent(section, "limits", "memory_warning")?;
        }
        if section.get("memory_critical").is_some() {
            config.limits.memory_critical = parse_percent(section, "limits", "memory_critical")?;
        }
        if section.get("max_concurrent_normal").is_some() {
            config.limits.max_concurrent_normal =
                parse_usize(section, "limits", "max_concurrent_normal")?;
        }
        if section.get("max_concurrent_warning").is_some() {
            config.limits.max_concurrent_warning =
                parse_usize(section, "limits", "max_concurrent_warning")?;
        }
        if section.get("max_concurrent_critical").is_some() {
            config.limits.max_concurrent_critical =
                parse_usize(section, "limits", "max_concurrent_critical")?;
        }
    }

    if let Some(section) = ini.section(Some("governor")) {
        if section.get("monitoring_interval").is_some() {
            config.governor.monitoring_interval_secs =
                parse_u64(section, "governor", "monitoring_interval")?;
        }
        if section.get("enforcement_interval_multiplier").is_some() {
            config.governor.enforcement_interval_multiplier =
                parse_u64(section, "governor", "enforcement_interval_multiplier")? as u32;
        }
        if section.get("auto_enforcement").is_some() {
            config.governor.auto_enforcement = parse_bool(section, "governor", "auto_enforcement")?;
        }
        if section.get("emergency_mode").is_some() {
            config.governor.emergency_mode = parse_bool(section, "governor", "emergency_mode")?;
        }
        if section.get("history_capacity").is_some() {
            config.governor.history_capacity = parse_usize(section, "governor", "history_capacity")?;
        }
    }

    if let Some(section) = ini.section(Some("scheduler")) {
        if section.get("throttle_enabled").is_some() {
            config.scheduler.throttle_enabled =
                parse_bool(section, "scheduler", "throttle_enabled")?;
        }
        if section.get("throttle_base_delay_ms").is_some() {
            config.scheduler.throttle_base_delay_ms =
                parse_u64(section, "scheduler", "throttle_base_delay_ms")?;
        }
        if section.get("throttle_max_delay_ms").is_some() {
            config.scheduler.throttle_max_delay_ms =
                parse_u64(section, "scheduler", "throttle_max_delay_ms")?;
        }
        if section.get("task_history_capacity").is_some() {
            config.scheduler.task_history_capacity =
                parse_usize(section, "scheduler", "task_history_capacity")?;
        }
        if section.get("drain_grace_secs").is_some() {
            config.scheduler.drain_grace_secs =
                parse_u64(section, "scheduler", "drain_grace_secs")?;
        }
    }

    if let Some(section) = ini.section(Some("cache")) {
        if section.get("max_entries").is_some() {
            config.cache.max_entries = parse_usize(section, "cache", "max_entries")?;
        }
        if let Some(v) = section.get("max_memory") {
            config.cache.max_memory_bytes =
                parse_size(v).map_err(|_| ConfigFileError::InvalidValue {
                    section: "cache".to_string(),
                    key: "max_memory".to_string(),
                    value: v.to_string(),
                    reason: "expected format like '64MB', '2GB', or '1024KB'".to_string(),
                })?;
        }
        if section.get("default_ttl").is_some() {
            config.cache.default_ttl_secs = parse_u64(section, "cache", "default_ttl")?;
        }
        if let Some(v) = section.get("strategy") {
            config.cache.strategy = v.parse().map_err(|reason: String| {
                ConfigFileError::InvalidValue {
                    section: "cache".to_string(),
                    key: "strategy".to_string(),
                    value: v.to_string(),
                    reason,
                }
            })?;
        }
    }

    Ok(config)
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_percent(props: &Properties, section: &str, key: &str) -> Result<f64, ConfigFileError> {
    let raw = props.get(key).unwrap_or_default();
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, raw, "expected a number"))?;
    if !(0.0..=100.0).contains(&value) {
        return Err(invalid(section, key, raw, "must be between 0 and 100"));
    }
    Ok(value)
}

fn parse_u64(props: &Properties, section: &str, key: &str) -> Result<u64, ConfigFileError> {
    let raw = props.get(key).unwrap_or_default();
    raw.trim()
        .parse()
        .map_err(|_| invalid(section, key, raw, "expected a non-negative integer"))
}

fn parse_usize(props: &Properties, section: &str, key: &str) -> Result<usize, ConfigFileError> {
    let raw = props.get(key).unwrap_or_default();
    raw.trim()
        .parse()
        .map_err(|_| invalid(section, key, raw, "expected a non-negative integer"))
}

fn parse_bool(props: &Properties, section: &str, key: &str) -> Result<bool, ConfigFileError> {
    let raw = props.get(key).unwrap_or_default();
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(invalid(section, key, raw, "expected true or false")),
    }
}
