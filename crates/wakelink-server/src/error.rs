// ============================================
// File: crates/wakelink-server/src/error.rs
// ============================================
//! # Server Error Types
//!
//! ## Last Modified
//! v0.1.0 - Initial server error types

use thiserror::Error;

use wakelink_common::error::CommonError;
use wakelink_core::error::CoreError;
use wakelink_transport::error::TransportError;

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Server error types.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to load configuration from '{path}': {reason}")]
    ConfigLoad {
        path: String,
        reason: String,
    },

    #[error("Invalid configuration: {field} - {reason}")]
    ConfigInvalid {
        field: String,
        reason: String,
    },

    #[error("Token file '{path}': {reason}")]
    TokenFile {
        path: String,
        reason: String,
    },

    #[error("Storage image '{path}': {reason}")]
    StorageImage {
        path: String,
        reason: String,
    },

    #[error("Device replied with error: {error}")]
    DeviceError {
        error: String,
    },

    #[error("Server failed to start: {reason}")]
    StartupFailed {
        reason: String,
    },

    #[error(transparent)]
    Common(#[from] CommonError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    pub fn config_load(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn config_invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn token_file(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::TokenFile {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn storage_image(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::StorageImage {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn startup_failed(reason: impl Into<String>) -> Self {
        Self::StartupFailed {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(self, Self::ConfigLoad { .. } | Self::ConfigInvalid { .. })
    }

    /// Errors that must stop the daemon rather than a single request.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConfigLoad { .. }
                | Self::TokenFile { .. }
                | Self::StorageImage { .. }
                | Self::StartupFailed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ServerError::config_load("/etc/wakelink/device.toml", "file not found");
        assert!(err.to_string().contains("/etc/wakelink/device.toml"));
    }

    #[test]
    fn test_error_classification() {
        let config_err = ServerError::config_invalid("network.listen_addr", "port cannot be 0");
        assert!(config_err.is_config_error());
        assert!(!config_err.is_fatal());

        let token_err = ServerError::token_file("/etc/wakelink/token", "permission denied");
        assert!(token_err.is_fatal());
    }

    #[test]
    fn test_wrapped_core_error() {
        let err: ServerError = CoreError::InvalidSignature.into();
        assert!(matches!(err, ServerError::Core(CoreError::InvalidSignature)));
        assert!(!err.is_fatal());
    }
}
