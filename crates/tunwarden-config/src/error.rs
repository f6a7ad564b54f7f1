// ============================================
// File: crates/tunwarden-config/src/error.rs
// ============================================
//! # Config Error Types
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use std::path::Path;

use thiserror::Error;

use tunwarden_common::error::{CommonError, ErrorCode};

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Configuration error types.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File system failure, including parent directory creation.
    #[error("I/O error on '{path}': {source}")]
    Io {
        /// File or directory involved
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Hot reload or save requested before anything was loaded.
    #[error("No configuration file has been loaded")]
    NotLoaded,

    /// Document or value could not be decoded.
    #[error("Failed to parse {context}: {reason}")]
    Parse {
        /// What was being decoded
        context: String,
        /// Decoder message
        reason: String,
    },

    /// Document could not be encoded.
    #[error("Failed to serialize {context}: {reason}")]
    Serialize {
        /// What was being encoded
        context: String,
        /// Encoder message
        reason: String,
    },

    /// Semantic violation in a proxy profile.
    #[error("Validation failed at '{field}': {reason}")]
    Validation {
        /// Offending entry, e.g. `proxy.servers[2].port`
        field: String,
        /// What is wrong with it
        reason: String,
    },

    /// Dotted key cannot be resolved for writing.
    #[error("Invalid path '{key}': {reason}")]
    InvalidPath {
        /// The dotted key (or the prefix that failed)
        key: String,
        /// Why it cannot be used
        reason: String,
    },

    /// Error from common crate.
    #[error(transparent)]
    Common(#[from] CommonError),
}

impl ConfigError {
    /// Creates an `Io` error for a path.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    /// Creates a `Parse` error.
    pub fn parse(context: impl Into<String>, reason: impl ToString) -> Self {
        Self::Parse {
            context: context.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates a `Serialize` error.
    pub fn serialize(context: impl Into<String>, reason: impl ToString) -> Self {
        Self::Serialize {
            context: context.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates a `Validation` error.
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates an `InvalidPath` error.
    pub fn invalid_path(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Returns the boundary code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Io { .. } | Self::NotLoaded => ErrorCode::IoError,
            Self::Parse { .. } => ErrorCode::ParseError,
            Self::Serialize { .. } => ErrorCode::SerializeError,
            Self::Validation { .. } => ErrorCode::ValidationError,
            Self::InvalidPath { .. } => ErrorCode::InvalidPath,
            Self::Common(e) => e.code(),
        }
    }

    /// Returns `true` if the error came from a missing file.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ConfigError::validation("proxy.servers[0].port", "must be in [1, 65535]");
        assert!(err.to_string().contains("proxy.servers[0].port"));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(ConfigError::NotLoaded.code(), ErrorCode::IoError);
        assert_eq!(ConfigError::parse("json", "eof").code(), ErrorCode::ParseError);
        assert_eq!(
            ConfigError::invalid_path("a.b", "not a document").code(),
            ErrorCode::InvalidPath
        );

        let missing = ConfigError::io(
            "/nope",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(missing.is_not_found());
    }
}
