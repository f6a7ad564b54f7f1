// ============================================
// File: crates/tunwarden-engine/src/error.rs
// ============================================
//! # Engine Error Types
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use thiserror::Error;

use tunwarden_common::error::{CommonError, ErrorCode};
use tunwarden_config::ConfigError;
use tunwarden_transport::TransportError;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Engine error types.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Start requested before an interface identity was set.
    #[error("Interface has not been created")]
    NotCreated,

    /// Create or Start while the interface is running.
    #[error("Interface '{interface}' is already active")]
    AlreadyActive {
        /// Name of the running interface
        interface: String,
    },

    /// Stop or packet I/O while the interface is not running.
    #[error("Interface is not active")]
    NotActive,

    /// Bad host-supplied parameter.
    #[error(transparent)]
    Common(#[from] CommonError),

    /// Packet device failure.
    #[error(transparent)]
    Device(#[from] TransportError),

    /// Configuration store failure.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Unexpected internal condition.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of what went wrong
        message: String,
    },
}

impl EngineError {
    /// Creates an `AlreadyActive` error.
    pub fn already_active(interface: impl Into<String>) -> Self {
        Self::AlreadyActive {
            interface: interface.into(),
        }
    }

    /// Creates a validation error for a host parameter.
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Common(CommonError::invalid_input(field, reason))
    }

    /// Creates an `Internal` error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns the boundary code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotCreated => ErrorCode::NotCreated,
            Self::AlreadyActive { .. } => ErrorCode::AlreadyActive,
            Self::NotActive => ErrorCode::NotActive,
            Self::Common(e) => e.code(),
            Self::Device(e) => e.code(),
            Self::Config(e) => e.code(),
            Self::Internal { .. } => ErrorCode::Internal,
        }
    }

    /// Returns `true` for lifecycle misuse (wrong state for the call).
    #[must_use]
    pub const fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            Self::NotCreated | Self::AlreadyActive { .. } | Self::NotActive
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::already_active("utun0");
        assert!(err.to_string().contains("utun0"));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(EngineError::NotCreated.code(), ErrorCode::NotCreated);
        assert_eq!(EngineError::NotActive.code(), ErrorCode::NotActive);
        assert_eq!(
            EngineError::validation("name", "empty").code(),
            ErrorCode::ValidationError
        );
        assert_eq!(
            EngineError::from(TransportError::read_failed("eio")).code(),
            ErrorCode::DeviceError
        );
        assert_eq!(
            EngineError::from(ConfigError::invalid_path("a.b", "not a document")).code(),
            ErrorCode::InvalidPath
        );
    }

    #[test]
    fn test_lifecycle_classification() {
        assert!(EngineError::NotActive.is_lifecycle());
        assert!(EngineError::already_active("utun0").is_lifecycle());
        assert!(!EngineError::internal("bug").is_lifecycle());
    }
}
