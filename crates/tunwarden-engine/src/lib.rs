// ============================================
// File: crates/tunwarden-engine/src/lib.rs
// ============================================
//! # Tunwarden Engine - Traffic Interception Core
//!
//! ## Creation Reason
//! Ties the virtual interface, its packet accounting and the background
//! data-plane task together behind a small lifecycle API, and exposes that
//! API plus the configuration store to a host application.
//!
//! ## Main Functionality
//!
//! ### Modules
//! - [`interface`]: `Interceptor`, interface state and lifecycle
//! - [`stats`]: Packet and byte counters
//! - [`dataplane`]: Injected capabilities and the tick loop
//! - [`settings`]: Loop timing knobs from `[engine]`
//! - [`processor`]: Built-in packet processors
//! - [`bridge`]: Host-facing record API
//! - [`error`]: Engine-specific error types
//!
//! ## Architecture Overview
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                         Host                                  │
//! └──────────────────────────────┬────────────────────────────────┘
//!                                ▼
//! ┌───────────────────────────────────────────────────────────────┐
//! │                        Bridge                                 │
//! ├───────────────────────────────┬───────────────────────────────┤
//! │  Interceptor                  │  ConfigStore                  │
//! │  ┌─────────────────────────┐  │  ┌─────────────────────────┐ │
//! │  │ RwLock<InterfaceState>  │  │  │ RwLock<StoreState>      │ │
//! │  │  params · active · epoch│  │  │  document · path · mtime│ │
//! │  │  stats  · worker        │  │  └─────────────────────────┘ │
//! │  └───────────▲─────────────┘  │                               │
//! │              │ record(epoch)  │                               │
//! │  ┌───────────┴─────────────┐  │                               │
//! │  │   data-plane task       │  │                               │
//! │  │  source → processor     │  │                               │
//! │  └─────────────────────────┘  │                               │
//! └───────────────────────────────┴───────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - The two lock units are never held together
//! - Only `Interceptor::stop` cancels the data-plane task
//! - TUN creation requires root or `CAP_NET_ADMIN`
//!
//! ## Last Modified
//! v0.1.0 - Initial engine library

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod bridge;
pub mod dataplane;
pub mod error;
pub mod interface;
pub mod processor;
pub mod settings;
pub mod stats;

// Re-export primary types
pub use bridge::{encode, Bridge, Outcome};
pub use dataplane::DataPlane;
pub use error::{EngineError, Result};
pub use interface::{Interceptor, InterfaceStatus, StopReport};
pub use processor::PassthroughProcessor;
pub use settings::EngineSettings;
pub use stats::{StatsSnapshot, TrafficStats};
