// ============================================
// File: crates/tunwarden-engine/src/stats.rs
// ============================================
//! # Traffic Accounting
//!
//! ## Creation Reason
//! Counts packets and bytes crossing the interface in each direction so
//! the host can show throughput and uptime.
//!
//! ## Main Functionality
//! - `TrafficStats`: Mutable counters, owned by the interface state
//! - `StatsSnapshot`: Copy of the counters handed to callers
//!
//! ## ⚠️ Important Note for Next Developer
//! - `TrafficStats` has no lock of its own. It lives inside the interface
//!   state and is mutated under that state's write lock, so a snapshot
//!   never observes half of a record.
//! - Counters saturate instead of wrapping.
//!
//! ## Last Modified
//! v0.1.0 - Initial accounting

use std::time::{Duration, Instant};

use serde::Serialize;

use tunwarden_common::time::Timestamp;
use tunwarden_common::types::Direction;

// ============================================
// TrafficStats
// ============================================

/// Packet and byte counters for one interface.
#[derive(Debug, Clone)]
pub struct TrafficStats {
    packets_in: u64,
    packets_out: u64,
    bytes_in: u64,
    bytes_out: u64,
    dropped: u64,
    started_at: Instant,
    start_time: Timestamp,
}

impl TrafficStats {
    /// Creates zeroed counters with the clock starting now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            packets_in: 0,
            packets_out: 0,
            bytes_in: 0,
            bytes_out: 0,
            dropped: 0,
            started_at: Instant::now(),
            start_time: Timestamp::now(),
        }
    }

    /// Counts one packet of `len` bytes.
    pub fn record(&mut self, direction: Direction, len: usize) {
        let bytes = u64::try_from(len).unwrap_or(u64::MAX);
        match direction {
            Direction::In => {
                self.packets_in = self.packets_in.saturating_add(1);
                self.bytes_in = self.bytes_in.saturating_add(bytes);
            }
            Direction::Out => {
                self.packets_out = self.packets_out.saturating_add(1);
                self.bytes_out = self.bytes_out.saturating_add(bytes);
            }
        }
    }

    /// Counts one packet the processor dropped or failed on.
    pub fn record_drop(&mut self) {
        self.dropped = self.dropped.saturating_add(1);
    }

    /// Zeroes the counters and restarts the clock.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Time since creation or the last reset.
    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Copies the counters out.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            packets_in: self.packets_in,
            packets_out: self.packets_out,
            bytes_in: self.bytes_in,
            bytes_out: self.bytes_out,
            packets_dropped: self.dropped,
            uptime_seconds: self.uptime().as_secs(),
            start_time: self.start_time,
        }
    }
}

impl Default for TrafficStats {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================
// StatsSnapshot
// ============================================

/// Point-in-time copy of [`TrafficStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    /// Packets read from the interface.
    pub packets_in: u64,
    /// Packets written to the interface.
    pub packets_out: u64,
    /// Bytes read from the interface.
    pub bytes_in: u64,
    /// Bytes written to the interface.
    pub bytes_out: u64,
    /// Packets the processor dropped or failed on.
    pub packets_dropped: u64,
    /// Whole seconds since creation or reset.
    pub uptime_seconds: u64,
    /// Wall-clock time of creation or reset.
    pub start_time: Timestamp,
}

impl StatsSnapshot {
    /// Total packets in both directions.
    #[must_use]
    pub const fn total_packets(&self) -> u64 {
        self.packets_in.saturating_add(self.packets_out)
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_directions() {
        let mut stats = TrafficStats::new();
        stats.record(Direction::In, 100);
        stats.record(Direction::In, 40);
        stats.record(Direction::Out, 60);

        let snap = stats.snapshot();
        assert_eq!(snap.packets_in, 2);
        assert_eq!(snap.bytes_in, 140);
        assert_eq!(snap.packets_out, 1);
        assert_eq!(snap.bytes_out, 60);
        assert_eq!(snap.total_packets(), 3);
    }

    #[test]
    fn test_counters_never_decrease() {
        let mut stats = TrafficStats::new();
        let mut previous = stats.snapshot();
        for len in [0, 1, 1500, 9000, 0] {
            stats.record(Direction::Out, len);
            stats.record(Direction::In, len);
            let current = stats.snapshot();
            assert!(current.packets_out > previous.packets_out);
            assert!(current.bytes_out >= previous.bytes_out);
            assert!(current.bytes_in >= previous.bytes_in);
            previous = current;
        }
    }

    #[test]
    fn test_saturation() {
        let mut stats = TrafficStats::new();
        stats.bytes_in = u64::MAX - 1;
        stats.record(Direction::In, 10);
        assert_eq!(stats.snapshot().bytes_in, u64::MAX);
    }

    #[test]
    fn test_reset() {
        let mut stats = TrafficStats::new();
        stats.record(Direction::In, 10);
        stats.record_drop();
        stats.reset();

        let snap = stats.snapshot();
        assert_eq!(snap.packets_in, 0);
        assert_eq!(snap.packets_dropped, 0);
        assert_eq!(snap.uptime_seconds, 0);
    }

    #[test]
    fn test_snapshot_wire_names() {
        let json = serde_json::to_value(TrafficStats::new().snapshot()).unwrap();
        for key in [
            "packetsIn",
            "packetsOut",
            "bytesIn",
            "bytesOut",
            "packetsDropped",
            "uptimeSeconds",
            "startTime",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }
}
