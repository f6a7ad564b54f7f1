// ============================================
// File: crates/tunwarden-engine/src/dataplane.rs
// ============================================
//! # Data-Plane Loop
//!
//! ## Creation Reason
//! While the interface is active, a single background task moves packets
//! from the device to the processor and accounts for them.
//!
//! ## Main Functionality
//! - `DataPlane`: The injected source, sink and processor
//! - `run()`: Tick loop spawned by `Interceptor::start`
//!
//! ## Loop Shape
//! ```text
//! every tick:
//!   ├── cancelled?            → exit
//!   ├── epoch still current?  → else exit
//!   └── drain up to `burst` packets
//!         ├── record In
//!         └── processor verdict
//!               ├── Drop / error → record drop
//!               └── Direct / Proxy → trace
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - The drain pass races the cancellation token, so a stalled read or a
//!   slow processor never delays Stop by more than the join timeout
//! - Read errors are absorbed here; they must never end the task
//! - Every record carries the loop's epoch. A record from a loop whose
//!   active period has ended is discarded by the interface state.
//!
//! ## Last Modified
//! v0.1.0 - Initial data-plane loop

use std::sync::Arc;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use tunwarden_common::types::Direction;
use tunwarden_transport::{
    Packet, PacketProcessor, PacketSink, PacketSource, TransportError, TunDevice, Verdict,
};

use crate::interface::InterfaceShared;
use crate::settings::EngineSettings;

// ============================================
// DataPlane
// ============================================

/// Capabilities the loop and the host packet calls work against.
#[derive(Clone)]
pub struct DataPlane {
    source: Arc<dyn PacketSource>,
    sink: Arc<dyn PacketSink>,
    processor: Arc<dyn PacketProcessor>,
}

impl DataPlane {
    /// Creates a data plane from separate capabilities.
    pub fn new(
        source: Arc<dyn PacketSource>,
        sink: Arc<dyn PacketSink>,
        processor: Arc<dyn PacketProcessor>,
    ) -> Self {
        Self {
            source,
            sink,
            processor,
        }
    }

    /// Creates a data plane that reads from and writes to one device.
    pub fn from_device<D>(device: Arc<D>, processor: Arc<dyn PacketProcessor>) -> Self
    where
        D: TunDevice + 'static,
    {
        let source: Arc<dyn PacketSource> = device.clone();
        let sink: Arc<dyn PacketSink> = device;
        Self::new(source, sink, processor)
    }

    /// Returns the read side.
    #[must_use]
    pub fn source(&self) -> &Arc<dyn PacketSource> {
        &self.source
    }

    /// Returns the write side.
    #[must_use]
    pub fn sink(&self) -> &Arc<dyn PacketSink> {
        &self.sink
    }
}

impl std::fmt::Debug for DataPlane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataPlane").finish_non_exhaustive()
    }
}

// ============================================
// Loop
// ============================================

/// Result of one drain pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    /// Pass finished; this many packets were read.
    Drained(usize),
    /// The active period ended under us.
    Stale,
}

/// Runs the loop for one active period until cancelled or superseded.
pub(crate) async fn run(
    shared: Arc<InterfaceShared>,
    plane: DataPlane,
    settings: EngineSettings,
    epoch: u64,
    cancel: CancellationToken,
) {
    info!(epoch, tick = ?settings.tick_interval, burst = settings.burst, "Data plane started");

    let mut ticker = tokio::time::interval(settings.effective_tick());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut failures = ReadFailures::new(settings.failure_reminder);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        if !shared.is_current(epoch) {
            debug!(epoch, "Active period ended, data plane exiting");
            break;
        }

        let pass = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            pass = drain(&shared, &plane, settings.burst, epoch, &mut failures) => pass,
        };

        match pass {
            Pass::Drained(0) => {}
            Pass::Drained(count) => trace!(epoch, count, "Drain pass finished"),
            Pass::Stale => {
                debug!(epoch, "Record refused, data plane exiting");
                break;
            }
        }
    }

    info!(epoch, "Data plane stopped");
}

/// Reads up to `burst` packets and hands each to the processor.
async fn drain(
    shared: &InterfaceShared,
    plane: &DataPlane,
    burst: usize,
    epoch: u64,
    failures: &mut ReadFailures,
) -> Pass {
    let mut drained = 0;

    while drained < burst {
        match plane.source.recv().await {
            Ok(Some(packet)) => {
                failures.recovered();
                if !shared.record(epoch, Direction::In, packet.len()) {
                    return Pass::Stale;
                }
                drained += 1;
                dispatch(shared, plane.processor.as_ref(), epoch, &packet).await;
            }
            Ok(None) => {
                failures.recovered();
                break;
            }
            Err(e) => {
                failures.failed(&e);
                break;
            }
        }
    }

    Pass::Drained(drained)
}

async fn dispatch(
    shared: &InterfaceShared,
    processor: &dyn PacketProcessor,
    epoch: u64,
    packet: &Packet,
) {
    let meta = packet.meta();
    match processor.process(packet).await {
        Ok(Verdict::Drop) => {
            shared.record_drop(epoch);
            trace!(epoch, bytes = packet.len(), protocol = %meta.protocol, "Packet dropped by processor");
        }
        Ok(verdict) => {
            trace!(epoch, bytes = packet.len(), protocol = %meta.protocol, %verdict, "Packet dispatched");
        }
        Err(e) => {
            shared.record_drop(epoch);
            debug!(epoch, bytes = packet.len(), error = %e, "Processor failed, packet dropped");
        }
    }
}

// ============================================
// ReadFailures
// ============================================

/// Rate-limits logging of consecutive device read failures.
#[derive(Debug)]
struct ReadFailures {
    consecutive: u64,
    reminder: u64,
}

impl ReadFailures {
    const fn new(reminder: u64) -> Self {
        Self {
            consecutive: 0,
            reminder,
        }
    }

    fn failed(&mut self, err: &TransportError) {
        self.consecutive = self.consecutive.saturating_add(1);

        if self.consecutive == 1 {
            warn!(error = %err, transient = err.is_transient(), "Device read failed, retrying next tick");
        } else if self.reminder > 0 && self.consecutive % self.reminder == 0 {
            warn!(failures = self.consecutive, error = %err, "Device reads still failing");
        } else {
            debug!(failures = self.consecutive, error = %err, "Device read failed");
        }
    }

    fn recovered(&mut self) {
        if self.consecutive > 0 {
            info!(failures = self.consecutive, "Device reads recovered");
            self.consecutive = 0;
        }
    }
}

// ============================================
// Tests
// ============================================
