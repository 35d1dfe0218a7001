//! Human-readable sizes such as `2GB` or `500MB`.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid size '{input}' - expected format like '2GB', '500MB', or '1024KB'")]
pub struct SizeParseError {
    input: String,
}

const UNITS: &[(&str, u64)] = &[
    ("GB", 1024 * 1024 * 1024),
    ("G", 1024 * 1024 * 1024),
    ("MB", 1024 * 1024),
    ("M", 1024 * 1024),
    ("KB", 1024),
    ("K", 1024),
    ("B", 1),
];

/// Parses a size in bytes. Suffixes are binary and case-insensitive; a bare
/// number is bytes.
pub fn parse_size(s: &str) -> Result<u64, SizeParseError> {
    let error = || SizeParseError {
        input: s.to_string(),
    };
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(error());
    }

    let upper = trimmed.to_ascii_uppercase();
    let (number, multiplier) = UNITS
        .iter()
        .find_map(|(suffix, multiplier)| {
            upper
                .strip_suffix(suffix)
                .map(|n| (n.trim().to_string(), *multiplier))
        })
        .unwrap_or((upper.clone(), 1));

    let value: u64 = number.parse().map_err(|_| error())?;
    value.checked_mul(multiplier).ok_or_else(error)
}

/// Formats a byte count with the largest whole unit.
pub fn format_size(bytes: u64) -> String {
    for (suffix, multiplier) in UNITS.iter().filter(|(s, _)| s.len() == 2) {
        if bytes >= *multiplier && bytes % multiplier == 0 {
            return format!("{}{}", bytes / multiplier, suffix);
        }
    }
    bytes.to_string()
}
