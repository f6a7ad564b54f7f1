// ============================================
// File: crates/tunwarden-common/src/error.rs
// ============================================
//! # Common Error Types
//!
//! ## Creation Reason
//! Every boundary call reports failures with a human readable message and a
//! machine readable code. The code set is closed and shared by all crates,
//! so it lives here next to the base error type.
//!
//! ## Main Functionality
//! - `ErrorCode`: Closed taxonomy reported to the host
//! - `CommonError`: Rejected interface parameters
//! - `Result<T>`: Type alias using `CommonError`
//!
//! ## ⚠️ Important Note for Next Developer
//! - Each crate error exposes `code()`; keep the mapping exhaustive
//! - `ErrorCode` serializes with the names the host already matches on
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================
// Result Type Alias
// ============================================

/// Common result type for operations that may fail.
pub type Result<T> = std::result::Result<T, CommonError>;

// ============================================
// ErrorCode
// ============================================

/// Machine readable failure category reported at the host boundary.
///
/// # Categories
/// - **Lifecycle**: `NotCreated`, `AlreadyActive`, `NotActive`
/// - **Codec**: `ParseError`, `SerializeError`
/// - **Storage**: `IoError`
/// - **Semantic**: `ValidationError`, `InvalidPath`
/// - **Device**: `DeviceError`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    /// No interface identity has been established.
    NotCreated,
    /// The interface is already running.
    AlreadyActive,
    /// The interface is not running.
    NotActive,
    /// A document or value could not be decoded.
    ParseError,
    /// A document could not be encoded.
    SerializeError,
    /// File system failure.
    #[serde(rename = "IOError")]
    IoError,
    /// Semantic configuration or parameter violation.
    ValidationError,
    /// Dotted key descends into a non-document value.
    InvalidPath,
    /// Packet I/O failure from the underlying interface.
    DeviceError,
    /// Unexpected internal condition.
    Internal,
}

impl ErrorCode {
    /// Returns the wire name of this code.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotCreated => "NotCreated",
            Self::AlreadyActive => "AlreadyActive",
            Self::NotActive => "NotActive",
            Self::ParseError => "ParseError",
            Self::SerializeError => "SerializeError",
            Self::IoError => "IOError",
            Self::ValidationError => "ValidationError",
            Self::InvalidPath => "InvalidPath",
            Self::DeviceError => "DeviceError",
            Self::Internal => "Internal",
        }
    }

    /// Returns `true` for lifecycle misuse codes.
    #[must_use]
    pub const fn is_lifecycle(&self) -> bool {
        matches!(self, Self::NotCreated | Self::AlreadyActive | Self::NotActive)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================
// CommonError
// ============================================

/// Common error types shared across tunwarden crates.
///
/// # Example
/// ```
/// use tunwarden_common::error::{CommonError, ErrorCode, Result};
///
/// fn parse_mtu(raw: &str) -> Result<u16> {
///     raw.parse().map_err(|_| CommonError::invalid_input("mtu", "not a number"))
/// }
///
/// let err = parse_mtu("jumbo").unwrap_err();
/// assert_eq!(err.code(), ErrorCode::ValidationError);
/// ```
#[derive(Error, Debug)]
pub enum CommonError {
    /// Invalid input data provided.
    #[error("Invalid input for '{field}': {reason}")]
    InvalidInput {
        /// Name of the field or parameter
        field: String,
        /// Description of what's wrong
        reason: String,
    },

    /// Value is out of acceptable range.
    #[error("Value out of range for '{field}': {value} not in [{min}, {max}]")]
    OutOfRange {
        /// Name of the field or parameter
        field: String,
        /// The value that was out of range
        value: String,
        /// Minimum acceptable value
        min: String,
        /// Maximum acceptable value
        max: String,
    },
}

impl CommonError {
    // ========================================
    // Convenience Constructors
    // ========================================

    /// Creates an `InvalidInput` error.
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates an `OutOfRange` error.
    pub fn out_of_range(
        field: impl Into<String>,
        value: impl fmt::Display,
        min: impl fmt::Display,
        max: impl fmt::Display,
    ) -> Self {
        Self::OutOfRange {
            field: field.into(),
            value: value.to_string(),
            min: min.to_string(),
            max: max.to_string(),
        }
    }

    // ========================================
    // Error Classification
    // ========================================

    /// Returns the boundary code for this error.
    ///
    /// Both variants describe a rejected parameter.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidInput { .. } | Self::OutOfRange { .. } => ErrorCode::ValidationError,
        }
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CommonError::invalid_input("mtu", "must be numeric");
        assert!(err.to_string().contains("mtu"));
        assert!(err.to_string().contains("numeric"));

        let err = CommonError::out_of_range("mtu", 100, 576, 9000);
        assert!(err.to_string().contains("100 not in [576, 9000]"));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            CommonError::invalid_input("name", "empty").code(),
            ErrorCode::ValidationError
        );
        assert_eq!(
            CommonError::out_of_range("mtu", 70_000, 576, 9000).code(),
            ErrorCode::ValidationError
        );
    }

    #[test]
    fn test_error_code_wire_names() {
        assert_eq!(ErrorCode::IoError.to_string(), "IOError");
        assert_eq!(
            serde_json::to_string(&ErrorCode::IoError).unwrap(),
            "\"IOError\""
        );
        assert_eq!(
            serde_json::to_string(&ErrorCode::AlreadyActive).unwrap(),
            "\"AlreadyActive\""
        );
        assert!(ErrorCode::NotActive.is_lifecycle());
        assert!(!ErrorCode::DeviceError.is_lifecycle());
    }
}
