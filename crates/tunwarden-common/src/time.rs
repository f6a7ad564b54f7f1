// ============================================
// File: crates/tunwarden-common/src/time.rs
// ============================================
//! # Wall-Clock Times
//!
//! Statistics start times and config file mtimes travel to the host as
//! unix seconds; packet metadata uses unix milliseconds. Uptime is always
//! measured with `Instant` and never derived from these values.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Unix time in whole seconds. Serializes as a bare integer.
///
/// ```
/// use std::time::{Duration, UNIX_EPOCH};
/// use tunwarden_common::time::Timestamp;
///
/// let ts = Timestamp::from_system_time(UNIX_EPOCH + Duration::from_millis(90_500));
/// assert_eq!(ts.as_secs(), 90);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Wraps a count of unix seconds.
    #[must_use]
    pub const fn from_secs(secs: i64) -> Self {
        Self(secs)
    }

    /// The current time.
    #[must_use]
    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now())
    }

    /// Truncates a `SystemTime`; times before the epoch become 0.
    #[must_use]
    pub fn from_system_time(time: SystemTime) -> Self {
        let secs = time.duration_since(UNIX_EPOCH).map_or(0, |d| d.as_secs());
        Self(i64::try_from(secs).unwrap_or(i64::MAX))
    }

    /// Unix seconds.
    #[must_use]
    pub const fn as_secs(self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Current unix time in milliseconds, 0 if the clock is before the epoch.
#[must_use]
pub fn unix_timestamp_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_now_is_recent() {
        // 2020-01-01
        assert!(Timestamp::now().as_secs() > 1_577_836_800);
    }

    #[test]
    fn test_before_epoch_clamps_to_zero() {
        let ts = Timestamp::from_system_time(UNIX_EPOCH - Duration::from_secs(5));
        assert_eq!(ts, Timestamp::from_secs(0));
    }

    #[test]
    fn test_serializes_as_integer() {
        let json = serde_json::to_string(&Timestamp::from_secs(1_700_000_000)).unwrap();
        assert_eq!(json, "1700000000");
        assert_eq!(Timestamp::from_secs(42).to_string(), "42");
    }

    #[test]
    fn test_millis_agree_with_seconds() {
        let secs = Timestamp::now().as_secs();
        assert!((unix_timestamp_millis() / 1000 - secs).abs() <= 1);
    }
}
