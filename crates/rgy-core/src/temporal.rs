//! # Temporal Types: UTC-Only Timestamps
//!
//! Defines `Timestamp`, a UTC-only timestamp truncated to seconds precision,
//! together with the two sentinels every time-versioned value in the registry
//! is anchored to:
//!
//! - [`Timestamp::start_of_time()`]: the minimal instant (Unix epoch). Every
//!   `TimedTransitionMap` starts here, so a floor lookup never misses.
//! - [`Timestamp::end_of_time()`]: "never". Used for `deletion_time` of live
//!   resources and for open-ended recurrences.
//!
//! ## Arithmetic
//!
//! All arithmetic saturates at the sentinels: adding anything to
//! `end_of_time()` stays at `end_of_time()`, and subtracting past the epoch
//! clamps to `start_of_time()`. Year arithmetic is leap-safe: adding one year
//! to February 29th lands on February 28th.
//!
//! Non-UTC inputs are **rejected** by [`Timestamp::parse()`]; there is no
//! silent offset conversion on the strict path.

use chrono::{DateTime, Duration, Months, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Epoch seconds of `9999-12-31T23:59:59Z`.
const END_OF_TIME_SECS: i64 = 253_402_300_799;

/// A UTC-only timestamp, truncated to seconds precision.
///
/// # Construction
///
/// - [`Timestamp::now()`]: current UTC time, truncated.
/// - [`Timestamp::from_utc()`]: from a `DateTime<Utc>`, truncating sub-seconds.
/// - [`Timestamp::parse()`]: from an ISO8601 string, rejecting non-UTC offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a timestamp from the current UTC time, truncated to seconds.
    pub fn now() -> Self {
        Self(truncate_to_seconds(Utc::now()))
    }

    /// Create a timestamp from a `chrono::DateTime<Utc>`, truncating sub-seconds.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(truncate_to_seconds(dt))
    }

    /// The minimal instant. Every time-versioned map begins here.
    pub fn start_of_time() -> Self {
        Self(DateTime::<Utc>::UNIX_EPOCH)
    }

    /// The "never" sentinel.
    pub fn end_of_time() -> Self {
        Self(DateTime::from_timestamp(END_OF_TIME_SECS, 0).unwrap_or(DateTime::<Utc>::MAX_UTC))
    }

    /// Whether this is the "never" sentinel (or beyond it).
    pub fn is_end_of_time(&self) -> bool {
        self.0.timestamp() >= END_OF_TIME_SECS
    }

    /// Parse a timestamp from an RFC 3339 / ISO8601 string.
    ///
    /// Only timestamps with the `Z` suffix are accepted. Explicit offsets,
    /// even `+00:00`, are rejected.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidTimestamp`] if the string is not valid
    /// RFC 3339 or uses a non-Z offset.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        if !s.ends_with('Z') {
            return Err(CoreError::InvalidTimestamp(format!(
                "timestamp must use Z suffix (UTC only), got: {s:?}"
            )));
        }
        Self::parse_lenient(s)
    }

    /// Parse a timestamp from an RFC 3339 string, accepting any offset and
    /// converting to UTC.
    pub fn parse_lenient(s: &str) -> Result<Self, CoreError> {
        let dt = DateTime::parse_from_rfc3339(s).map_err(|e| {
            CoreError::InvalidTimestamp(format!("invalid RFC 3339 timestamp {s:?}: {e}"))
        })?;
        Ok(Self(truncate_to_seconds(dt.with_timezone(&Utc))))
    }

    /// Create a timestamp from a Unix epoch timestamp (seconds).
    pub fn from_epoch_secs(secs: i64) -> Result<Self, CoreError> {
        let dt = DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| CoreError::InvalidTimestamp(format!("invalid Unix timestamp: {secs}")))?;
        Ok(Self(dt))
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Returns the Unix epoch timestamp in seconds.
    pub fn epoch_secs(&self) -> i64 {
        self.0.timestamp()
    }

    /// The calendar date (UTC) of this instant.
    pub fn date(&self) -> NaiveDate {
        self.0.date_naive()
    }

    /// Render as ISO8601 with Z suffix (e.g., `2026-01-15T12:00:00Z`).
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }

    /// Add a duration, saturating at the sentinels.
    pub fn plus(self, duration: Duration) -> Self {
        if self.is_end_of_time() {
            return self;
        }
        match self.0.checked_add_signed(duration) {
            Some(dt) => Self(dt).clamped(),
            None if duration > Duration::zero() => Self::end_of_time(),
            None => Self::start_of_time(),
        }
    }

    /// Subtract a duration, saturating at the sentinels.
    pub fn minus(self, duration: Duration) -> Self {
        self.plus(-duration)
    }

    /// Add whole years. February 29th maps to February 28th in non-leap years.
    pub fn plus_years(self, years: u32) -> Self {
        if self.is_end_of_time() {
            return self;
        }
        self.0
            .checked_add_months(Months::new(years.saturating_mul(12)))
            .map(|dt| Self(dt).clamped())
            .unwrap_or_else(Self::end_of_time)
    }

    /// Subtract whole years, leap-safe like [`Timestamp::plus_years`].
    pub fn minus_years(self, years: u32) -> Self {
        if self.is_end_of_time() {
            return self;
        }
        self.0
            .checked_sub_months(Months::new(years.saturating_mul(12)))
            .map(|dt| Self(dt).clamped())
            .unwrap_or_else(Self::start_of_time)
    }

    fn clamped(self) -> Self {
        if self.is_end_of_time() {
            Self::end_of_time()
        } else if self < Self::start_of_time() {
            Self::start_of_time()
        } else {
            self
        }
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::start_of_time()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

/// Truncate a `DateTime<Utc>` to seconds precision (discard nanoseconds).
fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse(s).unwrap()
    }

    #[test]
    fn test_now_has_no_subseconds() {
        let ts = Timestamp::now();
        assert_eq!(ts.as_datetime().nanosecond(), 0);
    }

    #[test]
    fn test_from_utc_truncates() {
        let dt = Utc.with_ymd_and_hms(2026, 1, 15, 12, 30, 45).unwrap();
        let ts = Timestamp::from_utc(dt.with_nanosecond(123_456_789).unwrap());
        assert_eq!(ts.to_iso8601(), "2026-01-15T12:30:45Z");
    }

    #[test]
    fn test_sentinels() {
        assert_eq!(Timestamp::start_of_time().to_iso8601(), "1970-01-01T00:00:00Z");
        assert_eq!(Timestamp::end_of_time().to_iso8601(), "9999-12-31T23:59:59Z");
        assert!(Timestamp::end_of_time().is_end_of_time());
        assert!(!Timestamp::now().is_end_of_time());
        assert!(Timestamp::start_of_time() < Timestamp::end_of_time());
    }

    #[test]
    fn test_parse_rejects_offsets() {
        assert!(Timestamp::parse("2026-01-15T12:00:00+00:00").is_err());
        assert!(Timestamp::parse("2026-01-15T08:00:00-04:00").is_err());
        assert!(Timestamp::parse("not-a-date").is_err());
    }

    #[test]
    fn test_parse_lenient_converts_offset() {
        let ts = Timestamp::parse_lenient("2026-01-15T17:00:00+05:00").unwrap();
        assert_eq!(ts.to_iso8601(), "2026-01-15T12:00:00Z");
    }

    #[test]
    fn test_plus_days() {
        let t = ts("2000-06-01T00:00:00Z");
        assert_eq!(t.plus(Duration::days(5)), ts("2000-06-06T00:00:00Z"));
        assert_eq!(t.minus(Duration::seconds(1)), ts("2000-05-31T23:59:59Z"));
    }

    #[test]
    fn test_arithmetic_saturates_at_end_of_time() {
        let end = Timestamp::end_of_time();
        assert_eq!(end.plus(Duration::days(30)), end);
        assert_eq!(end.plus_years(10), end);
        assert_eq!(end.minus_years(1), end);
        let near_end = ts("9999-12-01T00:00:00Z");
        assert_eq!(near_end.plus(Duration::days(60)), end);
    }

    #[test]
    fn test_minus_clamps_at_start_of_time() {
        let t = ts("1970-01-02T00:00:00Z");
        assert_eq!(t.minus(Duration::days(10)), Timestamp::start_of_time());
        assert_eq!(t.minus_years(1), Timestamp::start_of_time());
    }

    #[test]
    fn test_plus_years_is_leap_safe() {
        let leap = ts("2004-02-29T10:00:00Z");
        assert_eq!(leap.plus_years(1), ts("2005-02-28T10:00:00Z"));
        assert_eq!(leap.plus_years(4), ts("2008-02-29T10:00:00Z"));
        assert_eq!(leap.minus_years(1), ts("2003-02-28T10:00:00Z"));
    }

    #[test]
    fn test_date() {
        let t = ts("2026-06-30T23:59:59Z");
        assert_eq!(t.date(), NaiveDate::from_ymd_opt(2026, 6, 30).unwrap());
    }

    proptest::proptest! {
        #[test]
        fn test_plus_years_never_moves_backwards(
            secs in 0i64..4_000_000_000,
            years in 0u32..20,
        ) {
            let t = Timestamp::from_epoch_secs(secs).unwrap();
            let later = t.plus_years(years);
            proptest::prop_assert!(later >= t);
            proptest::prop_assert_eq!(later.as_datetime().time(), t.as_datetime().time());
        }
    }

    #[test]
    fn test_serde_roundtrip() {
        let t = ts("2026-01-15T12:00:00Z");
        let json = serde_json::to_string(&t).unwrap();
        let parsed: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(t, parsed);
    }
}
