// ============================================
// File: crates/tunwarden-engine/src/processor.rs
// ============================================
//! # Built-in Processors
//!
//! ## Last Modified
//! v0.1.0 - Passthrough processor

use async_trait::async_trait;
use tracing::trace;

use tunwarden_transport::{Packet, PacketProcessor, Result, Verdict};

/// Accepts every packet as `Direct`.
///
/// Used by the CLI when no userspace stack is attached, so the interface
/// can be brought up and observed on its own.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughProcessor;

#[async_trait]
impl PacketProcessor for PassthroughProcessor {
    async fn process(&self, packet: &Packet) -> Result<Verdict> {
        let meta = packet.meta();
        trace!(
            protocol = %meta.protocol,
            source = ?meta.source.map(|e| e.to_string()),
            destination = ?meta.destination.map(|e| e.to_string()),
            bytes = meta.size,
            "Passthrough"
        );
        Ok(Verdict::Direct)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_passthrough_is_direct() {
        let packet = Packet::new(vec![0x45, 0, 0, 20]);
        assert_eq!(PassthroughProcessor.process(&packet).await.unwrap(), Verdict::Direct);
    }
}
