// ============================================
// File: crates/tunwarden-engine/src/interface.rs
// ============================================
//! # Interception Interface
//!
//! ## Creation Reason
//! Owns the identity and lifecycle of the virtual interface, its traffic
//! counters and the background data-plane task of the current active
//! period.
//!
//! ## Main Functionality
//! - `Interceptor::create` / `start` / `stop`: Lifecycle
//! - `Interceptor::set_interface`: Change name, MTU, address in place
//! - `Interceptor::status` / `stats` / `reset_stats`: Accounting access
//! - `Interceptor::read_packet` / `write_packet`: Host packet I/O
//!
//! ## State Machine
//! ```text
//!  Uninitialized ──create──► Idle ──start──► Running
//!                             ▲                 │
//!                             └──────stop───────┘  (name cleared)
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Interface state and counters share ONE `parking_lot::RwLock`. Never
//!   hold it across an `.await`.
//! - Lifecycle calls are serialized by the async `control` mutex, so a
//!   stop that is still joining the old loop cannot interleave with the
//!   next create/start.
//! - `epoch` identifies an active period. The loop passes it with every
//!   record; records for any other epoch are discarded.
//!
//! ## Last Modified
//! v0.1.0 - Initial interface lifecycle

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use tunwarden_common::types::{validate_name, Direction, InterfaceAddress, InterfaceParams};
use tunwarden_transport::Packet;

use crate::dataplane::{self, DataPlane};
use crate::error::{EngineError, Result};
use crate::settings::EngineSettings;
use crate::stats::{StatsSnapshot, TrafficStats};

// ============================================
// Shared State
// ============================================

/// Background task of one active period.
struct Worker {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Worker {
    /// Cancels the task and waits for it, aborting after `timeout`.
    async fn shutdown(mut self, epoch: u64, timeout: Duration) {
        self.cancel.cancel();

        let joined = tokio::time::timeout(timeout, &mut self.handle).await;
        match joined {
            Ok(Ok(())) => debug!(epoch, "Data plane joined"),
            Ok(Err(e)) => warn!(epoch, error = %e, "Data plane task ended abnormally"),
            Err(_) => {
                warn!(epoch, ?timeout, "Data plane did not exit in time, aborting");
                self.handle.abort();
                let _ = self.handle.await;
            }
        }
    }
}

struct InterfaceState {
    params: InterfaceParams,
    active: bool,
    epoch: u64,
    stats: TrafficStats,
    running_since: Option<Instant>,
    worker: Option<Worker>,
}

impl InterfaceState {
    fn new() -> Self {
        Self {
            params: InterfaceParams::default(),
            active: false,
            epoch: 0,
            stats: TrafficStats::new(),
            running_since: None,
            worker: None,
        }
    }

    const fn is_current(&self, epoch: u64) -> bool {
        self.active && self.epoch == epoch
    }
}

/// State shared between the interceptor and its data-plane task.
pub(crate) struct InterfaceShared {
    state: RwLock<InterfaceState>,
}

impl InterfaceShared {
    fn new() -> Self {
        Self {
            state: RwLock::new(InterfaceState::new()),
        }
    }

    /// Returns `true` while `epoch` is the running period.
    pub(crate) fn is_current(&self, epoch: u64) -> bool {
        self.state.read().is_current(epoch)
    }

    /// Counts a packet for `epoch`; returns `false` if that period is over.
    pub(crate) fn record(&self, epoch: u64, direction: Direction, len: usize) -> bool {
        let mut state = self.state.write();
        if !state.is_current(epoch) {
            return false;
        }
        state.stats.record(direction, len);
        true
    }

    /// Counts a dropped packet for `epoch`.
    pub(crate) fn record_drop(&self, epoch: u64) {
        let mut state = self.state.write();
        if state.is_current(epoch) {
            state.stats.record_drop();
        }
    }

    fn active_epoch(&self) -> Result<u64> {
        let state = self.state.read();
        if state.active {
            Ok(state.epoch)
        } else {
            Err(EngineError::NotActive)
        }
    }
}

// ============================================
// Reports
// ============================================

/// Read-only view of the interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceStatus {
    /// `true` while running.
    pub active: bool,
    /// Interface name, empty when not created.
    pub name: String,
    /// Link MTU.
    pub mtu: u16,
    /// Assigned address.
    pub address: Option<InterfaceAddress>,
    /// Current active period, 0 before the first start.
    pub epoch: u64,
    /// Counters.
    pub stats: StatsSnapshot,
}

/// Final accounting returned by [`Interceptor::stop`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopReport {
    /// Name the interface had while running.
    pub interface: String,
    /// Counters at the moment the interface went inactive.
    pub stats: StatsSnapshot,
    /// Length of the active period.
    pub elapsed: Duration,
}

// ============================================
// Interceptor
// ============================================

/// The virtual interface with its lifecycle and data-plane task.
///
/// # Example
/// ```ignore
/// let interceptor = Interceptor::new(plane, EngineSettings::default());
/// interceptor.create("utun0").await?;
/// interceptor.start().await?;
///
/// interceptor.write_packet(&packet).await?;
/// assert_eq!(interceptor.stats().packets_out, 1);
///
/// let report = interceptor.stop().await?;
/// println!("{} bytes out", report.stats.bytes_out);
/// ```
pub struct Interceptor {
    shared: Arc<InterfaceShared>,
    plane: DataPlane,
    settings: EngineSettings,
    control: Mutex<()>,
}

impl Interceptor {
    /// Creates an uninitialized interceptor.
    #[must_use]
    pub fn new(plane: DataPlane, settings: EngineSettings) -> Self {
        Self {
            shared: Arc::new(InterfaceShared::new()),
            plane,
            settings,
            control: Mutex::new(()),
        }
    }

    /// Returns the loop settings.
    #[must_use]
    pub const fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    // ========================================
    // Lifecycle
    // ========================================

    /// Establishes the interface identity and resets accounting.
    ///
    /// MTU and address set earlier through [`set_interface`](Self::set_interface)
    /// are kept.
    ///
    /// # Errors
    /// - `AlreadyActive` if running
    /// - `ValidationError` for an empty or malformed name
    pub async fn create(&self, name: &str) -> Result<()> {
        let _control = self.control.lock().await;
        let name = name.trim();

        {
            let mut state = self.shared.state.write();
            if state.active {
                return Err(EngineError::already_active(state.params.name.clone()));
            }
            validate_name(name)?;
            if name.is_empty() {
                return Err(EngineError::validation("name", "interface name is required"));
            }
            state.params.name = name.to_string();
            state.stats.reset();
        }

        info!(interface = %name, "Interface created");
        Ok(())
    }

    /// Starts the data-plane loop for a new active period.
    ///
    /// # Returns
    /// The epoch of the new period.
    ///
    /// # Errors
    /// - `AlreadyActive` if running
    /// - `NotCreated` if no name is set
    pub async fn start(&self) -> Result<u64> {
        let _control = self.control.lock().await;

        let (interface, epoch) = {
            let mut state = self.shared.state.write();
            if state.active {
                return Err(EngineError::already_active(state.params.name.clone()));
            }
            if !state.params.is_named() {
                return Err(EngineError::NotCreated);
            }

            state.epoch += 1;
            state.active = true;
            state.running_since = Some(Instant::now());

            let epoch = state.epoch;
            let cancel = CancellationToken::new();
            let handle = tokio::spawn(dataplane::run(
                Arc::clone(&self.shared),
                self.plane.clone(),
                self.settings.clone(),
                epoch,
                cancel.clone(),
            ));
            state.worker = Some(Worker { cancel, handle });

            (state.params.name.clone(), epoch)
        };

        info!(interface = %interface, epoch, "Interface started");
        Ok(epoch)
    }

    /// Stops the data-plane loop and clears the interface name.
    ///
    /// Returns after the loop exited, or was aborted once the join timeout
    /// passed. Counters stay readable until the next create or reset.
    ///
    /// # Errors
    /// Returns `NotActive` if not running.
    pub async fn stop(&self) -> Result<StopReport> {
        let _control = self.control.lock().await;

        let (worker, epoch, report) = {
            let mut state = self.shared.state.write();
            if !state.active {
                return Err(EngineError::NotActive);
            }

            state.active = false;
            let interface = std::mem::take(&mut state.params.name);
            let elapsed = state
                .running_since
                .take()
                .map(|since| since.elapsed())
                .unwrap_or_default();
            let report = StopReport {
                interface,
                stats: state.stats.snapshot(),
                elapsed,
            };
            (state.worker.take(), state.epoch, report)
        };

        if let Some(worker) = worker {
            worker.shutdown(epoch, self.settings.join_timeout).await;
        }

        info!(
            interface = %report.interface,
            epoch,
            packets_in = report.stats.packets_in,
            packets_out = report.stats.packets_out,
            elapsed = ?report.elapsed,
            "Interface stopped"
        );
        Ok(report)
    }

    /// Replaces name, MTU and address without touching the lifecycle.
    ///
    /// An empty `mtu` selects the default; an empty `address` clears it.
    /// Counters are not reset.
    ///
    /// # Errors
    /// Returns `ValidationError` naming the bad parameter, or if the name
    /// would be cleared while running.
    pub fn set_interface(&self, name: &str, mtu: &str, address: &str) -> Result<()> {
        let params = InterfaceParams::parse(name, mtu, address)?;

        let mut state = self.shared.state.write();
        if state.active && !params.is_named() {
            return Err(EngineError::validation(
                "name",
                "cannot clear the name of an active interface",
            ));
        }

        debug!(
            interface = %params.name,
            mtu = params.mtu,
            address = ?params.address,
            active = state.active,
            "Interface parameters updated"
        );
        state.params = params;
        Ok(())
    }

    // ========================================
    // Status & Accounting
    // ========================================

    /// Returns `true` while running.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.shared.state.read().active
    }

    /// Returns the current interface parameters.
    #[must_use]
    pub fn params(&self) -> InterfaceParams {
        self.shared.state.read().params.clone()
    }

    /// Returns a consistent view of state and counters.
    #[must_use]
    pub fn status(&self) -> InterfaceStatus {
        let state = self.shared.state.read();
        InterfaceStatus {
            active: state.active,
            name: state.params.name.clone(),
            mtu: state.params.mtu,
            address: state.params.address,
            epoch: state.epoch,
            stats: state.stats.snapshot(),
        }
    }

    /// Returns the counters.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.shared.state.read().stats.snapshot()
    }

    /// Zeroes the counters. Legal in any state.
    pub fn reset_stats(&self) {
        self.shared.state.write().stats.reset();
        debug!("Traffic statistics reset");
    }

    // ========================================
    // Host Packet I/O
    // ========================================

    /// Polls the device once for a packet.
    ///
    /// # Returns
    /// `None` if nothing was queued.
    ///
    /// # Errors
    /// - `NotActive` if not running
    /// - `DeviceError` if the read fails
    pub async fn read_packet(&self) -> Result<Option<Packet>> {
        let epoch = self.shared.active_epoch()?;
        let packet = self.plane.source().recv().await?;

        if let Some(packet) = &packet {
            self.shared.record(epoch, Direction::In, packet.len());
        }
        Ok(packet)
    }

    /// Writes one packet to the device.
    ///
    /// The packet is counted once the write succeeds.
    ///
    /// # Errors
    /// - `NotActive` if not running
    /// - `DeviceError` if the write fails
    pub async fn write_packet(&self, payload: &[u8]) -> Result<usize> {
        let epoch = self.shared.active_epoch()?;
        let written = self.plane.sink().send(payload).await?;

        self.shared.record(epoch, Direction::Out, payload.len());
        Ok(written)
    }
}

impl Drop for Interceptor {
    fn drop(&mut self) {
        if let Some(worker) = self.shared.state.write().worker.take() {
            worker.cancel.cancel();
        }
    }
}

impl std::fmt::Debug for Interceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = self.status();
        f.debug_struct("Interceptor")
            .field("name", &status.name)
            .field("active", &status.active)
            .field("epoch", &status.epoch)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use tunwarden_common::error::ErrorCode;
    use tunwarden_transport::{MockTun, TunConfig};

    use crate::processor::PassthroughProcessor;

    fn interceptor() -> (Interceptor, Arc<MockTun>) {
        let tun = Arc::new(MockTun::new(TunConfig::new("mock0")));
        let plane = DataPlane::from_device(Arc::clone(&tun), Arc::new(PassthroughProcessor));
        let settings = EngineSettings::default().with_tick_interval(Duration::from_millis(10));
        (Interceptor::new(plane, settings), tun)
    }

    #[tokio::test]
    async fn test_start_requires_create() {
        let (interceptor, _tun) = interceptor();
        let err = interceptor.start().await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotCreated);
        assert!(!interceptor.is_active());
    }

    #[tokio::test]
    async fn test_stop_requires_active() {
        let (interceptor, _tun) = interceptor();
        assert_eq!(interceptor.stop().await.unwrap_err().code(), ErrorCode::NotActive);

        interceptor.create("utun0").await.unwrap();
        assert_eq!(interceptor.stop().await.unwrap_err().code(), ErrorCode::NotActive);
    }

    #[tokio::test]
    async fn test_create_rejects_bad_names() {
        let (interceptor, _tun) = interceptor();
        assert_eq!(
            interceptor.create("").await.unwrap_err().code(),
            ErrorCode::ValidationError
        );
        assert!(interceptor.create("much-too-long-name").await.is_err());
        assert!(interceptor.status().name.is_empty());
    }

    #[tokio::test]
    async fn test_full_lifecycle() {
        let (interceptor, _tun) = interceptor();
        interceptor.create("utun0").await.unwrap();
        let epoch = interceptor.start().await.unwrap();
        assert_eq!(epoch, 1);
        assert!(interceptor.is_active());

        assert_eq!(
            interceptor.create("utun1").await.unwrap_err().code(),
            ErrorCode::AlreadyActive
        );
        assert_eq!(interceptor.start().await.unwrap_err().code(), ErrorCode::AlreadyActive);

        let report = interceptor.stop().await.unwrap();
        assert_eq!(report.interface, "utun0");

        let status = interceptor.status();
        assert!(!status.active);
        assert!(status.name.is_empty());

        // Name was cleared, so a restart needs a new create.
        assert_eq!(interceptor.start().await.unwrap_err().code(), ErrorCode::NotCreated);
        interceptor.create("utun0").await.unwrap();
        assert_eq!(interceptor.start().await.unwrap(), 2);
        interceptor.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_write_counts_after_success() {
        let (interceptor, tun) = interceptor();
        assert_eq!(
            interceptor.write_packet(b"early").await.unwrap_err().code(),
            ErrorCode::NotActive
        );

        interceptor.create("utun0").await.unwrap();
        interceptor.start().await.unwrap();

        tun.fail_next_writes(1);
        let err = interceptor.write_packet(&[0u8; 20]).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::DeviceError);
        assert_eq!(interceptor.stats().packets_out, 0);

        assert_eq!(interceptor.write_packet(&[0u8; 20]).await.unwrap(), 20);
        let stats = interceptor.stats();
        assert_eq!(stats.packets_out, 1);
        assert_eq!(stats.bytes_out, 20);

        interceptor.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_set_interface_keeps_counters() {
        let (interceptor, _tun) = interceptor();
        interceptor.create("utun0").await.unwrap();
        interceptor.start().await.unwrap();
        interceptor.write_packet(&[0u8; 10]).await.unwrap();

        interceptor.set_interface("utun0", "1400", "10.0.0.2/24").unwrap();
        let status = interceptor.status();
        assert!(status.active);
        assert_eq!(status.mtu, 1400);
        assert_eq!(status.address.unwrap().prefix(), 24);
        assert_eq!(status.stats.packets_out, 1);

        let err = interceptor.set_interface("", "1400", "").unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
        assert!(interceptor.set_interface("utun0", "70000", "").is_err());
        assert_eq!(interceptor.status().name, "utun0");

        interceptor.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_create_resets_and_keeps_link_params() {
        let (interceptor, _tun) = interceptor();
        interceptor.set_interface("", "1280", "").unwrap();
        interceptor.create("utun0").await.unwrap();
        interceptor.start().await.unwrap();
        interceptor.write_packet(&[0u8; 10]).await.unwrap();
        interceptor.stop().await.unwrap();
        assert_eq!(interceptor.stats().packets_out, 1);

        interceptor.create("utun0").await.unwrap();
        let status = interceptor.status();
        assert_eq!(status.stats.packets_out, 0);
        assert_eq!(status.mtu, 1280);
    }

    #[tokio::test]
    async fn test_stale_epoch_is_discarded() {
        let (interceptor, _tun) = interceptor();
        interceptor.create("utun0").await.unwrap();
        let epoch = interceptor.start().await.unwrap();

        assert!(interceptor.shared.record(epoch, Direction::In, 10));
        assert!(!interceptor.shared.record(epoch + 1, Direction::In, 10));

        interceptor.stop().await.unwrap();
        assert!(!interceptor.shared.record(epoch, Direction::In, 10));
        assert_eq!(interceptor.stats().packets_in, 1);
    }
}
