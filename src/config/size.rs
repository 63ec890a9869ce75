//! Human-readable size parsing and formatting.

use thiserror::Error;

/// Error parsing a human-readable size string.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid size '{0}', expected a number with an optional KB/MB/GB suffix")]
pub struct SizeParseError(pub String);

/// Parses sizes like `"2GB"`, `"500MB"`, `"1024KB"`, or plain bytes
/// (`"4096"`). Suffixes are case-insensitive and binary (1 KB = 1024).
pub fn parse_size(input: &str) -> Result<u64, SizeParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(SizeParseError(input.to_string()));
    }

    let upper = trimmed.to_ascii_uppercase();
    let (number, multiplier) = if let Some(stripped) = upper.strip_suffix("GB") {
        (stripped, 1024u64 * 1024 * 1024)
    } else if let Some(stripped) = upper.strip_suffix("MB") {
        (stripped, 1024u64 * 1024)
    } else if let Some(stripped) = upper.strip_suffix("KB") {
        (stripped, 1024u64)
    } else if let Some(stripped) = upper.strip_suffix('B') {
        (stripped, 1u64)
    } else {
        (upper.as_str(), 1u64)
    };

    let number = number.trim();
    let value: f64 = number
        .parse()
        .map_err(|_| SizeParseError(input.to_string()))?;
    if value < 0.0 || !value.is_finite() {
        return Err(SizeParseError(input.to_string()));
    }

    Ok((value * multiplier as f64) as u64)
}

/// Formats a byte count with the largest whole binary unit.
pub fn format_size(bytes: u64) -> String {
    const GB: u64 = 1024 * 1024 * 1024;
    const MB: u64 = 1024 * 1024;
    const KB: u64 = 1024;

    if bytes >= GB && bytes % GB == 0 {
        format!("{}GB", bytes / GB)
    } else if bytes >= MB && bytes % MB == 0 {
        format!("{}MB", bytes / MB)
    } else if bytes >= KB && bytes % KB == 0 {
        format!("{}KB", bytes / KB)
    } else {
        format!("{bytes}B")
    }
}
