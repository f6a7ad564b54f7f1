// ============================================
// File: crates/tunwarden-engine/src/settings.rs
// ============================================
//! # Engine Settings
//!
//! ## Creation Reason
//! Timing knobs of the data-plane loop, read from the `[engine]` section
//! of the configuration document.
//!
//! ## ⚠️ Important Note for Next Developer
//! - Values are checked here; the loop assumes they are non-zero
//!
//! ## Last Modified
//! v0.1.0 - Initial settings

use std::time::Duration;

use tunwarden_config::profile::EngineSection;

use crate::error::{EngineError, Result};

/// Default data-plane tick.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Shortest tick the data plane accepts; `tokio::time::interval` panics on zero.
pub const MIN_TICK_INTERVAL: Duration = Duration::from_millis(1);

/// Default packets drained per tick.
pub const DEFAULT_BURST: usize = 64;

/// Default wait for the loop to exit on stop.
pub const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Consecutive read failures between `warn` reminders.
pub const DEFAULT_FAILURE_REMINDER: u64 = 60;

/// Data-plane loop tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// Time between drain passes.
    pub tick_interval: Duration,
    /// Maximum packets drained per pass.
    pub burst: usize,
    /// How long stop waits for the loop before aborting it.
    pub join_timeout: Duration,
    /// Consecutive read failures between `warn` reminders.
    pub failure_reminder: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            burst: DEFAULT_BURST,
            join_timeout: DEFAULT_JOIN_TIMEOUT,
            failure_reminder: DEFAULT_FAILURE_REMINDER,
        }
    }
}

impl EngineSettings {
    /// Sets the tick interval, raised to `MIN_TICK_INTERVAL` if shorter.
    #[must_use]
    pub const fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = if interval.as_nanos() < MIN_TICK_INTERVAL.as_nanos() {
            MIN_TICK_INTERVAL
        } else {
            interval
        };
        self
    }

    /// The tick the loop actually runs at.
    #[must_use]
    pub fn effective_tick(&self) -> Duration {
        self.tick_interval.max(MIN_TICK_INTERVAL)
    }

    /// Sets the burst size.
    #[must_use]
    pub const fn with_burst(mut self, burst: usize) -> Self {
        self.burst = burst;
        self
    }

    /// Sets the join timeout.
    #[must_use]
    pub const fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }

    /// Builds settings from the `[engine]` section.
    ///
    /// # Errors
    /// Returns `ValidationError` naming the key if a value is not positive.
    pub fn from_section(section: &EngineSection) -> Result<Self> {
        Ok(Self {
            tick_interval: Duration::from_millis(positive(
                "engine.tick-interval-ms",
                section.tick_interval_ms,
            )?),
            burst: usize::try_from(positive("engine.burst", section.burst)?)
                .map_err(|_| EngineError::validation("engine.burst", "value too large"))?,
            join_timeout: Duration::from_millis(positive(
                "engine.join-timeout-ms",
                section.join_timeout_ms,
            )?),
            failure_reminder: DEFAULT_FAILURE_REMINDER,
        })
    }
}

fn positive(field: &str, value: i64) -> Result<u64> {
    match u64::try_from(value) {
        Ok(v) if v > 0 => Ok(v),
        _ => Err(EngineError::validation(
            field,
            format!("must be a positive integer, got {value}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tunwarden_common::error::ErrorCode;

    #[test]
    fn test_defaults_match_section_defaults() {
        let settings = EngineSettings::from_section(&EngineSection::default()).unwrap();
        assert_eq!(settings, EngineSettings::default());
    }

    #[test]
    fn test_rejects_non_positive() {
        let section = EngineSection {
            burst: 0,
            ..EngineSection::default()
        };
        let err = EngineSettings::from_section(&section).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
        assert!(err.to_string().contains("engine.burst"));

        let section = EngineSection {
            tick_interval_ms: -5,
            ..EngineSection::default()
        };
        assert!(EngineSettings::from_section(&section).is_err());
    }

    #[test]
    fn test_builders() {
        let settings = EngineSettings::default()
            .with_tick_interval(Duration::from_millis(10))
            .with_burst(8)
            .with_join_timeout(Duration::from_millis(100));
        assert_eq!(settings.tick_interval, Duration::from_millis(10));
        assert_eq!(settings.burst, 8);
        assert_eq!(settings.join_timeout, Duration::from_millis(100));
    }

    #[test]
    fn test_zero_tick_is_clamped() {
        let settings = EngineSettings::default().with_tick_interval(Duration::ZERO);
        assert_eq!(settings.tick_interval, MIN_TICK_INTERVAL);

        let settings = EngineSettings::default().with_tick_interval(Duration::from_micros(10));
        assert_eq!(settings.tick_interval, MIN_TICK_INTERVAL);

        // Field set directly still runs at the floor
        let settings = EngineSettings {
            tick_interval: Duration::ZERO,
            ..EngineSettings::default()
        };
        assert_eq!(settings.effective_tick(), MIN_TICK_INTERVAL);
    }
}
