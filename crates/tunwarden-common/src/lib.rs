// ============================================
// File: crates/tunwarden-common/src/lib.rs
// ============================================
//! # Tunwarden Common - Shared Types Library
//!
//! ## Creation Reason
//! Provides the vocabulary shared by every tunwarden crate: the error code
//! taxonomy reported at the host boundary, interface identity types and
//! wall-clock timestamps.
//!
//! ## Main Functionality
//! - [`error`]: `CommonError`, `ErrorCode` and the result alias
//! - [`types`]: `Direction`, `InterfaceParams`, `InterfaceAddress`
//! - [`time`]: `Timestamp` (unix seconds)
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              tunwarden-engine                       │
//! │                    │                                │
//! │         ┌──────────┴──────────┐                    │
//! │         ▼                     ▼                    │
//! │  tunwarden-config     tunwarden-transport          │
//! │         │                     │                    │
//! │         └──────────┬──────────┘                    │
//! │                    ▼                               │
//! │            tunwarden-common  ◄── You are here      │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - This crate is the foundation - changes affect everything
//! - Keep dependencies minimal (serde + thiserror only)
//! - `ErrorCode` is part of the host-facing contract; do not rename variants
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod time;
pub mod types;

// Re-export commonly used items at crate root
pub use error::{CommonError, ErrorCode, Result};
pub use time::Timestamp;
pub use types::{Direction, InterfaceAddress, InterfaceParams};
