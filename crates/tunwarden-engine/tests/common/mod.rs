//! Shared fixtures for engine integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use tunwarden_engine::{DataPlane, EngineSettings, Interceptor, StatsSnapshot};
use tunwarden_transport::{MockTun, Packet, PacketProcessor, TransportError, TunConfig, Verdict};

/// Processor that counts calls, optionally sleeping first.
#[derive(Default)]
pub struct CountingProcessor {
    pub calls: AtomicU64,
    pub delay: Option<Duration>,
    pub verdict: Option<Verdict>,
    pub fail: bool,
}

impl CountingProcessor {
    pub fn direct() -> Self {
        Self::default()
    }

    pub fn dropping() -> Self {
        Self {
            verdict: Some(Verdict::Drop),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Acquire)
    }
}

#[async_trait]
impl PacketProcessor for CountingProcessor {
    async fn process(&self, _packet: &Packet) -> tunwarden_transport::Result<Verdict> {
        self.calls.fetch_add(1, Ordering::AcqRel);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(TransportError::processing("instrumented failure"));
        }
        Ok(self.verdict.clone().unwrap_or(Verdict::Direct))
    }
}

/// Settings with a short tick so tests observe the loop quickly.
pub fn fast_settings() -> EngineSettings {
    EngineSettings::default()
        .with_tick_interval(Duration::from_millis(10))
        .with_join_timeout(Duration::from_secs(2))
}

/// Settings whose loop drains once, right after start, and then idles.
pub fn single_pass_settings() -> EngineSettings {
    EngineSettings::default().with_tick_interval(Duration::from_secs(3600))
}

/// Builds an interceptor over a mock device.
pub fn mock_interceptor(
    processor: Arc<CountingProcessor>,
    settings: EngineSettings,
) -> (Interceptor, Arc<MockTun>) {
    let tun = Arc::new(MockTun::new(TunConfig::new("utun0")));
    let plane = DataPlane::from_device(Arc::clone(&tun), processor);
    (Interceptor::new(plane, settings), tun)
}

/// Polls `interceptor.stats()` until `done` holds or two seconds pass.
pub async fn wait_for_stats<F>(interceptor: &Interceptor, done: F) -> StatsSnapshot
where
    F: Fn(&StatsSnapshot) -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let stats = interceptor.stats();
        if done(&stats) || tokio::time::Instant::now() >= deadline {
            return stats;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// A minimal IPv4/UDP packet of `len` bytes (at least 28).
pub fn udp_packet(len: usize) -> Vec<u8> {
    let len = len.max(28);
    let mut data = vec![0u8; len];
    data[0] = 0x45;
    data[2..4].copy_from_slice(&u16::try_from(len).unwrap_or(u16::MAX).to_be_bytes());
    data[9] = 17;
    data[12..16].copy_from_slice(&[10, 0, 0, 2]);
    data[16..20].copy_from_slice(&[1, 1, 1, 1]);
    data[20..22].copy_from_slice(&40000u16.to_be_bytes());
    data[22..24].copy_from_slice(&53u16.to_be_bytes());
    data
}
