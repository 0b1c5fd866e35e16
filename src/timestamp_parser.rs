use anyhow::Result;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Parses session start times as emitted by the log scanner.
pub struct TimestampParser;

impl TimestampParser {
    /// Parse a timestamp string into a DateTime<Utc>.
    /// Accepts RFC3339 (Z suffix or offset), naive ISO-8601 (assumed UTC,
    /// `T` or space separated) and bare dates (midnight UTC).
    pub fn parse(timestamp_str: &str) -> Result<DateTime<Utc>> {
        let trimmed = timestamp_str.trim();
        if trimmed.is_empty() {
            anyhow::bail!("Empty timestamp");
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(dt.with_timezone(&Utc));
        }

        for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
                return Ok(DateTime::from_naive_utc_and_offset(naive, Utc));
            }
        }

        if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            if let Some(naive) = date.and_hms_opt(0, 0, 0) {
                return Ok(naive.and_utc());
            }
        }

        anyhow::bail!("Failed to parse timestamp: {}", timestamp_str)
    }

    /// Like [`TimestampParser::parse`] but for callers that drop bad records.
    pub fn parse_lenient(timestamp_str: &str) -> Option<DateTime<Utc>> {
        Self::parse(timestamp_str).ok()
    }
}
