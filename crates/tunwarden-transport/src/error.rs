// ============================================
// File: crates/tunwarden-transport/src/error.rs
// ============================================
//! # Transport Error Types
//!
//! ## Creation Reason
//! Errors raised while opening the virtual interface, moving packets
//! through it, or asking the packet processor for a verdict.
//!
//! ## Main Functionality
//! - `TransportError`: one enum for device, I/O and processor failures
//! - `code()` mapping onto the shared `ErrorCode` taxonomy
//!
//! ## ⚠️ Important Note for Next Developer
//! - Read errors inside the data plane are absorbed, not propagated
//! - Everything device-related maps to `DeviceError` at the boundary
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use std::io;

use thiserror::Error;

use tunwarden_common::error::{CommonError, ErrorCode};

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Transport layer error types.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The clone device could not be opened or attached to an interface.
    #[error("Cannot open interface '{name}': {reason}")]
    Open {
        /// Requested interface name
        name: String,
        /// Why it failed
        reason: String,
    },

    /// Address, MTU or link state could not be applied.
    #[error("Cannot set up interface '{name}' ({step}): {reason}")]
    Setup {
        /// Interface name
        name: String,
        /// Which setup step failed, e.g. "mtu"
        step: &'static str,
        /// Tool or kernel message
        reason: String,
    },

    /// Reading a packet failed.
    #[error("Packet read failed: {0}")]
    Read(String),

    /// Writing a packet failed.
    #[error("Packet write failed: {0}")]
    Write(String),

    /// Device parameters rejected before touching the kernel.
    #[error("Invalid device config '{field}': {reason}")]
    InvalidConfig {
        /// Offending field
        field: String,
        /// Why it is rejected
        reason: String,
    },

    /// The packet processor returned an error.
    #[error("Packet processor failed: {0}")]
    Processing(String),

    /// Missing `CAP_NET_ADMIN` or file permissions.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Raw I/O failure.
    #[error("I/O error during {context}")]
    Io {
        /// Operation in progress
        context: String,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// Error from common crate.
    #[error(transparent)]
    Common(#[from] CommonError),
}

impl TransportError {
    /// Creates an `Open` error.
    pub fn open_failed(name: impl Into<String>, reason: impl ToString) -> Self {
        Self::Open {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates a `Setup` error.
    pub fn setup_failed(name: impl Into<String>, step: &'static str, reason: impl ToString) -> Self {
        Self::Setup {
            name: name.into(),
            step,
            reason: reason.to_string(),
        }
    }

    /// Creates a `Read` error.
    pub fn read_failed(reason: impl ToString) -> Self {
        Self::Read(reason.to_string())
    }

    /// Creates a `Write` error.
    pub fn write_failed(reason: impl ToString) -> Self {
        Self::Write(reason.to_string())
    }

    /// Creates a `Processing` error.
    pub fn processing(reason: impl ToString) -> Self {
        Self::Processing(reason.to_string())
    }

    /// Creates a `PermissionDenied` error.
    pub fn permission_denied(operation: impl Into<String>) -> Self {
        Self::PermissionDenied(operation.into())
    }

    /// Creates an `Io` error with context.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Creates an `InvalidConfig` error.
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Packet I/O failures that may clear up on their own.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Read(_) | Self::Write(_) => true,
            Self::Io { source, .. } => matches!(
                source.kind(),
                io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted | io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }

    /// Returns the boundary code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidConfig { .. } => ErrorCode::ValidationError,
            Self::Processing(_) => ErrorCode::Internal,
            Self::Common(e) => e.code(),
            _ => ErrorCode::DeviceError,
        }
    }
}

impl From<io::Error> for TransportError {
    fn from(err: io::Error) -> Self {
        Self::io("device I/O", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TransportError::setup_failed("utun0", "mtu", "RTNETLINK answers: Invalid argument");
        let text = err.to_string();
        assert!(text.contains("utun0"));
        assert!(text.contains("(mtu)"));
    }

    #[test]
    fn test_error_codes() {
        let read = TransportError::read_failed("link down");
        assert!(read.is_transient());
        assert_eq!(read.code(), ErrorCode::DeviceError);

        let denied = TransportError::permission_denied("open /dev/net/tun");
        assert!(!denied.is_transient());
        assert_eq!(denied.code(), ErrorCode::DeviceError);

        assert_eq!(
            TransportError::invalid_config("mtu", "too small").code(),
            ErrorCode::ValidationError
        );
        assert_eq!(TransportError::processing("stack gone").code(), ErrorCode::Internal);
    }

    #[test]
    fn test_would_block_is_transient() {
        let err: TransportError = io::Error::new(io::ErrorKind::WouldBlock, "would block").into();
        assert!(err.is_transient());
    }
}
