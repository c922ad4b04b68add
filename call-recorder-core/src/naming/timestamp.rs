//! Timestamp embedded at the start of every recording filename.

use std::fmt::Write;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, TimeZone};

/// Default filename timestamp: `20240131_235959.123+0100`.
pub const DEFAULT_PATTERN: &str = "%Y%m%d_%H%M%S%.3f%z";

/// Accepts any fraction length, or none.
const DEFAULT_PARSE_PATTERN: &str = "%Y%m%d_%H%M%S%.f%z";
const DEFAULT_LOCAL_PARSE_PATTERN: &str = "%Y%m%d_%H%M%S%.f";

/// Whether `pattern` is a well-formed strftime-style pattern.
pub fn is_valid_pattern(pattern: &str) -> bool {
    !pattern.is_empty() && !StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error))
}

/// Formats call timestamps into filenames and parses them back out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimestampCodec {
    pattern: Option<String>,
}

impl TimestampCodec {
    /// Codec using a custom pattern. Returns `None` if the pattern is invalid.
    pub fn with_pattern(pattern: &str) -> Option<Self> {
        is_valid_pattern(pattern).then(|| Self {
            pattern: Some(pattern.to_string()),
        })
    }

    pub fn custom_pattern(&self) -> Option<&str> {
        self.pattern.as_deref()
    }

    pub fn format(&self, timestamp: &DateTime<FixedOffset>) -> String {
        if let Some(pattern) = &self.pattern {
            if let Some(formatted) = try_format(timestamp, pattern) {
                return formatted;
            }
            log::warn!("Failed to format timestamp with custom pattern; using default");
        }
        timestamp.format(DEFAULT_PATTERN).to_string()
    }

    /// Parse a timestamp at the start of `text`, ignoring trailing characters.
    ///
    /// Timestamps without a UTC offset are interpreted in the local time zone.
    pub fn parse(&self, text: &str) -> Option<DateTime<FixedOffset>> {
        if let Some(pattern) = &self.pattern {
            if let Some(ts) = parse_with(text, pattern, pattern) {
                return Some(ts);
            }
        }
        parse_with(text, DEFAULT_PARSE_PATTERN, DEFAULT_LOCAL_PARSE_PATTERN)
    }
}

fn try_format(timestamp: &DateTime<FixedOffset>, pattern: &str) -> Option<String> {
    let mut out = String::new();
    write!(out, "{}", timestamp.format(pattern)).ok()?;
    Some(out)
}

fn parse_with(text: &str, zoned: &str, local: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok((ts, _)) = DateTime::parse_and_remainder(text, zoned) {
        return Some(ts);
    }
    let (naive, _) = NaiveDateTime::parse_and_remainder(text, local).ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|ts| ts.fixed_offset())
}
