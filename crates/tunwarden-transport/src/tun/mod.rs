// ============================================
// File: crates/tunwarden-transport/src/tun/mod.rs
// ============================================
//! # TUN Device Module
//!
//! ## Creation Reason
//! Provides the virtual interface whose traffic the engine intercepts.
//!
//! ## Platform Implementations
//! - `linux`: Uses `/dev/net/tun` with `IFF_TUN | IFF_NO_PI`
//! - `mock`: In-memory queues with fault injection for tests
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                     User Space                            │
//! │  ┌────────────────┐          ┌────────────────────────┐  │
//! │  │  Application   │          │   tunwarden engine     │  │
//! │  └───────┬────────┘          └───────────┬────────────┘  │
//! │          │ IP packets                    │ recv/send     │
//! │          ▼                               ▼               │
//! ├──────────────────────────────────────────────────────────┤
//! │                     Kernel Space                          │
//! │  ┌────────────────────────────────────────────────────┐  │
//! │  │                TUN Device (utun0)                   │  │
//! │  └────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - TUN operations require root or `CAP_NET_ADMIN`
//! - Device names are limited to 15 characters on Linux
//!
//! ## Last Modified
//! v0.1.0 - Initial TUN module structure

// Platform-specific implementations
#[cfg(target_os = "linux")]
pub mod linux;

// Mock implementation for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock;

#[cfg(target_os = "linux")]
pub use linux::LinuxTun;

#[cfg(any(test, feature = "mock"))]
pub use mock::MockTun;
