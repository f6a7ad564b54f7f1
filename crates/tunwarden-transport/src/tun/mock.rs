// ============================================
// File: crates/tunwarden-transport/src/tun/mock.rs
// ============================================
//! # Scripted TUN Device
//!
//! ## Creation Reason
//! Lets tests drive the interceptor and data plane without a kernel
//! interface or elevated privileges.
//!
//! ## Main Functionality
//! - Inbound packets are scripted with `inject_packet(s)`
//! - Outbound packets are captured for inspection
//! - Faults: failing reads/writes, a per-read delay to simulate a stalled
//!   device
//!
//! ## ⚠️ Important Note for Next Developer
//! - Only compiled under `cfg(test)` or the `mock` feature
//! - Both queues hold at most `QUEUE_LIMIT` packets
//!
//! ## Last Modified
//! v0.1.0 - Initial mock implementation

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use tunwarden_common::types::InterfaceAddress;

use crate::error::{Result, TransportError};
use crate::packet::Packet;
use crate::traits::{PacketSink, PacketSource, TunConfig, TunDevice};

const QUEUE_LIMIT: usize = 1000;

#[derive(Debug, Default)]
struct Script {
    inbound: VecDeque<Vec<u8>>,
    outbound: Vec<Vec<u8>>,
    read_faults: usize,
    write_faults: usize,
    read_delay: Option<Duration>,
    recv_calls: u64,
}

/// In-memory TUN device.
///
/// ```
/// # use tunwarden_transport::{MockTun, PacketSink, PacketSource, TunConfig};
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> tunwarden_transport::Result<()> {
/// let tun = MockTun::new(TunConfig::new("mock0"));
/// tun.inject_packet(vec![0x45; 20]);
///
/// assert_eq!(tun.recv().await?.map(|p| p.len()), Some(20));
/// assert!(tun.recv().await?.is_none());
///
/// tun.send(b"reply").await?;
/// assert_eq!(tun.written_count(), 1);
/// # Ok(())
/// # }
/// ```
pub struct MockTun {
    config: TunConfig,
    script: Mutex<Script>,
    up: AtomicBool,
}

impl MockTun {
    /// Creates an idle device with empty queues.
    #[must_use]
    pub fn new(config: TunConfig) -> Self {
        Self {
            config,
            script: Mutex::new(Script::default()),
            up: AtomicBool::new(false),
        }
    }

    /// Scripts one inbound packet. Returns `false` once the queue is full.
    pub fn inject_packet(&self, packet: Vec<u8>) -> bool {
        let mut script = self.script.lock();
        if script.inbound.len() >= QUEUE_LIMIT {
            return false;
        }
        script.inbound.push_back(packet);
        true
    }

    /// Scripts several inbound packets; returns how many fit.
    pub fn inject_packets(&self, packets: impl IntoIterator<Item = Vec<u8>>) -> usize {
        packets
            .into_iter()
            .take_while(|packet| self.inject_packet(packet.clone()))
            .count()
    }

    /// Inbound packets not yet read.
    #[must_use]
    pub fn pending_read_count(&self) -> usize {
        self.script.lock().inbound.len()
    }

    /// Outbound packets captured so far.
    #[must_use]
    pub fn written_count(&self) -> usize {
        self.script.lock().outbound.len()
    }

    /// Drains the captured outbound packets.
    #[must_use]
    pub fn take_written_packets(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.script.lock().outbound)
    }

    /// The next `n` reads fail with a read error.
    pub fn fail_next_reads(&self, n: usize) {
        self.script.lock().read_faults = n;
    }

    /// The next `n` writes fail with a write error.
    pub fn fail_next_writes(&self, n: usize) {
        self.script.lock().write_faults = n;
    }

    /// Sleeps this long inside every `recv`.
    pub fn set_read_delay(&self, delay: Option<Duration>) {
        self.script.lock().read_delay = delay;
    }

    /// Number of `recv` calls, including failed and empty ones.
    #[must_use]
    pub fn recv_calls(&self) -> u64 {
        self.script.lock().recv_calls
    }
}

#[async_trait]
impl PacketSource for MockTun {
    async fn recv(&self) -> Result<Option<Packet>> {
        let delay = {
            let mut script = self.script.lock();
            script.recv_calls += 1;
            script.read_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut script = self.script.lock();
        if script.read_faults > 0 {
            script.read_faults -= 1;
            return Err(TransportError::read_failed("scripted read fault"));
        }
        Ok(script.inbound.pop_front().map(Packet::new))
    }
}

#[async_trait]
impl PacketSink for MockTun {
    async fn send(&self, packet: &[u8]) -> Result<usize> {
        let mut script = self.script.lock();
        if script.write_faults > 0 {
            script.write_faults -= 1;
            return Err(TransportError::write_failed("scripted write fault"));
        }
        if script.outbound.len() >= QUEUE_LIMIT {
            return Err(TransportError::write_failed("capture queue full"));
        }
        script.outbound.push(packet.to_vec());
        Ok(packet.len())
    }
}

#[async_trait]
impl TunDevice for MockTun {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn mtu(&self) -> u16 {
        self.config.mtu
    }

    fn address(&self) -> Option<InterfaceAddress> {
        self.config.address
    }

    async fn up(&self) -> Result<()> {
        self.up.store(true, Ordering::Release);
        Ok(())
    }

    async fn down(&self) -> Result<()> {
        self.up.store(false, Ordering::Release);
        Ok(())
    }

    fn is_up(&self) -> bool {
        self.up.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for MockTun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let script = self.script.lock();
        f.debug_struct("MockTun")
            .field("name", &self.config.name)
            .field("up", &self.is_up())
            .field("inbound", &script.inbound.len())
            .field("outbound", &script.outbound.len())
            .finish_non_exhaustive()
    }
}

impl Default for MockTun {
    fn default() -> Self {
        Self::new(TunConfig::default())
    }
}
