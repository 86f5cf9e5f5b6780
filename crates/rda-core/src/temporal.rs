//! # Temporal Types — UTC-Only Timestamps
//!
//! Defines `Timestamp`, a UTC-only timestamp truncated to seconds. Claim
//! issuance and expiry instants and rule-module volume windows all use this
//! type, so every timestamp that reaches a canonical byte sequence has one
//! deterministic encoding: `YYYY-MM-DDTHH:MM:SSZ`.
//!
//! Non-UTC offsets are rejected at parse time rather than converted, so an
//! ambiguous input can never reach a signing path.

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A UTC timestamp, truncated to seconds precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// The current UTC time, truncated to seconds.
    pub fn now() -> Self {
        Self(truncate_to_seconds(Utc::now()))
    }

    /// From a `chrono::DateTime<Utc>`, truncating sub-seconds.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(truncate_to_seconds(dt))
    }

    /// Parse from an RFC 3339 string, accepting only the `Z` suffix.
    ///
    /// Explicit offsets are rejected even when semantically UTC (`+00:00`),
    /// because distinct spellings of the same instant would produce distinct
    /// canonical bytes.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        if !s.ends_with('Z') {
            return Err(ValidationError::InvalidTimestamp(format!(
                "timestamp must use Z suffix (UTC only), got: {s:?}"
            )));
        }
        let dt = DateTime::parse_from_rfc3339(s).map_err(|e| {
            ValidationError::InvalidTimestamp(format!("invalid RFC 3339 timestamp {s:?}: {e}"))
        })?;
        Ok(Self(truncate_to_seconds(dt.with_timezone(&Utc))))
    }

    /// From a Unix epoch timestamp in seconds.
    pub fn from_epoch_secs(secs: i64) -> Result<Self, ValidationError> {
        let dt = DateTime::from_timestamp(secs, 0).ok_or_else(|| {
            ValidationError::InvalidTimestamp(format!("invalid Unix timestamp: {secs}"))
        })?;
        Ok(Self(dt))
    }

    /// The Unix epoch timestamp in seconds.
    pub fn epoch_secs(&self) -> i64 {
        self.0.timestamp()
    }

    /// The UTC day number (days since the Unix epoch).
    ///
    /// Volume-limiting compliance rules bucket transfers by this value.
    pub fn utc_day(&self) -> i64 {
        self.epoch_secs().div_euclid(86_400)
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// ISO 8601 string with Z suffix and seconds precision.
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_z_suffix() {
        let ts = Timestamp::parse("2026-08-05T12:30:45Z").unwrap();
        assert_eq!(ts.to_iso8601(), "2026-08-05T12:30:45Z");
    }

    #[test]
    fn parse_rejects_offsets() {
        assert!(Timestamp::parse("2026-08-05T12:30:45+00:00").is_err());
        assert!(Timestamp::parse("2026-08-05T12:30:45+05:30").is_err());
        assert!(Timestamp::parse("not a timestamp").is_err());
    }

    #[test]
    fn sub_seconds_truncated() {
        let ts = Timestamp::parse("2026-08-05T12:30:45.999Z").unwrap();
        assert_eq!(ts.to_iso8601(), "2026-08-05T12:30:45Z");
    }

    #[test]
    fn epoch_roundtrip() {
        let ts = Timestamp::from_epoch_secs(1_754_000_000).unwrap();
        assert_eq!(ts.epoch_secs(), 1_754_000_000);
    }

    #[test]
    fn utc_day_buckets() {
        let midnight = Timestamp::parse("2026-08-05T00:00:00Z").unwrap();
        let evening = Timestamp::parse("2026-08-05T23:59:59Z").unwrap();
        let next = Timestamp::parse("2026-08-06T00:00:00Z").unwrap();
        assert_eq!(midnight.utc_day(), evening.utc_day());
        assert_eq!(midnight.utc_day() + 1, next.utc_day());
    }

    #[test]
    fn ordering_follows_time() {
        let earlier = Timestamp::parse("2026-01-01T00:00:00Z").unwrap();
        let later = Timestamp::parse("2026-06-01T00:00:00Z").unwrap();
        assert!(earlier < later);
    }

    #[test]
    fn now_has_no_subseconds() {
        let ts = Timestamp::now();
        assert_eq!(ts.as_datetime().nanosecond(), 0);
    }
}
