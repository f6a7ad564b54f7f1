// ============================================
// File: crates/tunwarden-config/src/lib.rs
// ============================================
//! # Tunwarden Config - Hierarchical Configuration Store
//!
//! ## Creation Reason
//! The interception engine is parameterized by an on-disk document (interface
//! name, MTU, nameservers, proxy rules). This crate owns that document: it
//! loads, provisions, saves, hot-reloads and edits it by dotted key, and
//! offers an optional strict validation layer for proxy profiles.
//!
//! ## Main Functionality
//!
//! ### Modules
//! - [`value`]: `Value`/`Document` tagged tree and dotted-key navigation
//! - [`codec`]: TOML and JSON encoding, picked by file extension
//! - [`defaults`]: Default document written on first load
//! - [`profile`]: Typed proxy profile view and validation
//! - [`store`]: `ConfigStore`, the lock-guarded document owner
//! - [`error`]: Config-specific error types
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              tunwarden-engine                       │
//! │                    │                                │
//! │         ┌──────────┴──────────┐                    │
//! │         ▼                     ▼                    │
//! │  tunwarden-config     tunwarden-transport          │
//! │  You are here ◄──                                  │
//! │         │                     │                    │
//! │         └──────────┬──────────┘                    │
//! │                    ▼                               │
//! │            tunwarden-common                         │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - The store is schema-agnostic; only `profile` knows key names
//! - All mutations go through the store's exclusive lock
//! - Never hold the store lock while touching engine state
//!
//! ## Last Modified
//! v0.1.0 - Initial configuration store

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod codec;
pub mod defaults;
pub mod error;
pub mod profile;
pub mod store;
pub mod value;

// Re-export primary types
pub use codec::Format;
pub use error::{ConfigError, Result};
pub use profile::{ProxyMode, ProxyProfile};
pub use store::{ConfigStore, CurrentConfig, FileReport, HotReload, LoadReport, ProfileEntry, StoreOptions};
pub use value::{Document, Scalar, Value};
