// ============================================
// File: crates/tunwarden-transport/src/lib.rs
// ============================================
//! # Tunwarden Transport - Packet I/O Layer
//!
//! ## Creation Reason
//! The interception engine never talks to a device directly. It reads
//! packets from a `PacketSource`, writes them to a `PacketSink` and asks a
//! `PacketProcessor` what to do with each one. This crate defines those
//! seams, the packet type flowing through them, and the TUN devices that
//! implement them.
//!
//! ## Main Functionality
//!
//! ### Modules
//! - [`packet`]: `Packet` with parsed IP header metadata
//! - [`traits`]: Source, sink, processor and device traits, `TunConfig`
//! - [`tun`]: TUN device implementations (Linux, mock)
//! - [`error`]: Transport-specific error types
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              tunwarden-engine                       │
//! │                    │                                │
//! │         ┌──────────┴──────────┐                    │
//! │         ▼                     ▼                    │
//! │  tunwarden-config     tunwarden-transport          │
//! │                       You are here ◄──             │
//! │         │                     │                    │
//! │         └──────────┬──────────┘                    │
//! │                    ▼                               │
//! │            tunwarden-common                         │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Data Flow
//! ```text
//!   applications
//!        │ IP packets
//!        ▼
//!  ┌─────────────┐  recv()   ┌──────────────┐ process() ┌───────────────┐
//!  │ TUN device  │──────────►│  data plane  │──────────►│   processor   │
//!  │ (utun0)     │◄──────────│  (engine)    │◄──────────│ (net stack)   │
//!  └─────────────┘  send()   └──────────────┘  Verdict  └───────────────┘
//! ```
//!
//! ## Platform Support
//! | Platform | TUN |
//! |----------|-----|
//! | Linux | ✅ |
//! | Other | mock only |
//!
//! ## ⚠️ Important Note for Next Developer
//! - TUN operations require elevated privileges
//! - `PacketSource::recv` must not wait for traffic
//! - Mock implementations available with `mock` feature
//!
//! ## Last Modified
//! v0.1.0 - Initial transport layer

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod packet;
pub mod traits;
pub mod tun;

// Re-export primary types
pub use error::{Result, TransportError};
pub use packet::{Endpoint, Packet, PacketMeta, Protocol};
pub use traits::{PacketProcessor, PacketSink, PacketSource, TunConfig, TunDevice, Verdict};

#[cfg(target_os = "linux")]
pub use tun::linux::LinuxTun;

#[cfg(any(test, feature = "mock"))]
pub use tun::mock::MockTun;
