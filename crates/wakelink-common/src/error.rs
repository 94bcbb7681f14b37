// ============================================
// File: crates/wakelink-common/src/error.rs
// ============================================
//! # Common Error Types
//!
//! ## Creation Reason
//! Base error enum shared by the WakeLink crates. Higher crates wrap it
//! with `#[from]` so identifier parsing failures propagate with `?`.
//!
//! ## Main Functionality
//! - `CommonError`: Validation and encoding failures
//! - `Result<T>`: Type alias using `CommonError`
//!
//! ## ⚠️ Important Note for Next Developer
//! - Never include tokens or key material in error messages
//! - MAC addresses are fine to print, tokens are not
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use thiserror::Error;

// ============================================
// Result Type Alias
// ============================================

/// Common result type for operations that may fail.
pub type Result<T> = std::result::Result<T, CommonError>;

// ============================================
// CommonError
// ============================================

/// Common error types shared across WakeLink crates.
///
/// # Example
/// ```
/// use wakelink_common::error::{CommonError, Result};
///
/// fn require_device_id(id: &str) -> Result<()> {
///     if id.is_empty() {
///         return Err(CommonError::invalid_input("device_id", "cannot be empty"));
///     }
///     Ok(())
/// }
///
/// assert!(require_device_id("").is_err());
/// ```
#[derive(Error, Debug)]
pub enum CommonError {
    // ========================================
    // Validation Errors
    // ========================================

    /// Invalid input data provided.
    #[error("Invalid input for '{field}': {reason}")]
    InvalidInput {
        /// Name of the field or parameter
        field: String,
        /// Description of what's wrong
        reason: String,
    },

    /// Data length doesn't match expected size.
    #[error("Invalid length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Expected length
        expected: usize,
        /// Actual length received
        actual: usize,
    },

    // ========================================
    // Encoding Errors
    // ========================================

    /// Failed to decode data.
    #[error("Decoding error: {context}")]
    Decoding {
        /// What was being decoded
        context: String,
        /// Error details
        details: String,
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

    /// Creates an `InvalidLength` error.
    #[must_use]
    pub const fn invalid_length(expected: usize, actual: usize) -> Self {
        Self::InvalidLength { expected, actual }
    }
}

// ============================================
// Error Conversions
// ============================================

impl From<hex::FromHexError> for CommonError {
    fn from(err: hex::FromHexError) -> Self {
        Self::Decoding {
            context: "hex decode".into(),
            details: err.to_string(),
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
        let err = CommonError::invalid_input("mac", "must be 12 hex digits");
        assert!(err.to_string().contains("mac"));
        assert!(err.to_string().contains("12 hex digits"));
    }

    #[test]
    fn test_invalid_length_display() {
        let err = CommonError::invalid_length(8, 5);
        assert_eq!(err.to_string(), "Invalid length: expected 8, got 5");
    }

    #[test]
    fn test_non_hex_mac_is_decoding_error() {
        let err = "GG:BB:CC:DD:EE:FF".parse::<crate::MacAddress>().unwrap_err();
        assert!(matches!(err, CommonError::Decoding { .. }));
    }

    #[test]
    fn test_hex_error_conversion() {
        let hex_err = hex::decode("zz").unwrap_err();
        let common: CommonError = hex_err.into();
        assert!(matches!(common, CommonError::Decoding { .. }));
    }
}
