// ============================================
// File: crates/wakelink-core/src/error.rs
// ============================================
//! # Core Error Types
//!
//! ## Creation Reason
//! Every rejection the secure channel can produce must be distinguishable
//! on the wire. `CoreError` carries the detail for logs and maps each
//! variant to the stable token peers match on.
//!
//! ## Main Functionality
//! - `CoreError`: Primary error enum for core operations
//! - `CoreError::token`: Stable wire token (`HEX_LEN`, `INVALID_SIGNATURE`, ...)
//! - `CoreError::reply_error`: Value placed in the `error` field of a reply
//!
//! ## Error Categories
//! 1. **Configuration**: secret too short, channel not initialized
//! 2. **Framing**: hex, size and declared-length violations
//! 3. **Envelope**: JSON, version, signature and command violations
//! 4. **Replay**: request window exhausted
//! 5. **Storage**: non-volatile read/write/commit failures
//!
//! ## Wire Rendering
//! ```text
//! decrypt path   -> "ERROR:<TOKEN>"   (CRYPTO_DISABLED, LIMIT_EXCEEDED,
//!                                      HEX_LEN, INVALID_HEX,
//!                                      INVALID_PACKET_SIZE, INVALID_DATA_LENGTH)
//! envelope path  -> "<TOKEN>"         (JSON_PARSE, BAD_PACKET,
//!                                      INVALID_SIGNATURE, INVALID_JSON, NO_COMMAND)
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - NEVER include key material or the device token in error messages
//! - Tokens are part of the wire contract; renaming one breaks clients
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use thiserror::Error;

use wakelink_common::error::CommonError;

// ============================================
// Result Type Alias
// ============================================

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

// ============================================
// CoreError
// ============================================

/// Core error types for the crypto layer and the secure packet protocol.
#[derive(Error, Debug)]
pub enum CoreError {
    // ========================================
    // Configuration Errors
    // ========================================

    /// The channel has no key material yet.
    #[error("Secure channel not initialized")]
    NotInitialized,

    /// Device token is shorter than the minimum.
    #[error("Token too short: need at least {min} characters, got {actual}")]
    TokenTooShort {
        /// Minimum length
        min: usize,
        /// Length supplied
        actual: usize,
    },

    // ========================================
    // Replay Errors
    // ========================================

    /// The request window is exhausted until an explicit reset.
    #[error("Request limit exceeded: {count}/{limit}")]
    LimitExceeded {
        /// Current counter value
        count: u32,
        /// Configured limit
        limit: u32,
    },

    // ========================================
    // Framing Errors
    // ========================================

    /// Hex payload has an odd number of characters.
    #[error("Hex payload has odd length {len}")]
    OddHexLength {
        /// Number of hex characters received
        len: usize,
    },

    /// Hex payload contains a non-hex character.
    #[error("Hex payload contains invalid characters")]
    InvalidHex,

    /// Decoded frame size is impossible or inconsistent with its header.
    #[error("Invalid packet size: {actual} bytes ({reason})")]
    InvalidPacketSize {
        /// Decoded size in bytes
        actual: usize,
        /// Which check failed
        reason: String,
    },

    /// Declared ciphertext length is zero or above the maximum.
    #[error("Invalid data length {declared}: must be in 1..={max}")]
    InvalidDataLength {
        /// Length from the frame header
        declared: usize,
        /// Maximum allowed
        max: usize,
    },

    // ========================================
    // Envelope Errors
    // ========================================

    /// Outer envelope is not valid JSON.
    #[error("Outer envelope is not valid JSON: {reason}")]
    JsonParse {
        /// Parser message
        reason: String,
    },

    /// Outer envelope has the wrong version or empty required fields.
    #[error("Malformed envelope: {reason}")]
    BadPacket {
        /// What was wrong
        reason: String,
    },

    /// Payload signature did not match.
    #[error("Signature verification failed")]
    InvalidSignature,

    /// Decrypted inner envelope is not valid JSON.
    #[error("Inner envelope is not valid JSON: {reason}")]
    InvalidJson {
        /// Parser message
        reason: String,
    },

    /// Inner envelope carries no command.
    #[error("Inner envelope has no command")]
    NoCommand,

    /// Failed to serialize an outgoing message.
    #[error("Encoding failed: {context}")]
    Encoding {
        /// What was being encoded
        context: String,
    },

    // ========================================
    // Storage Errors
    // ========================================

    /// Non-volatile storage operation failed.
    #[error("Storage {operation} failed: {reason}")]
    Storage {
        /// read, write or commit
        operation: &'static str,
        /// Why it failed
        reason: String,
    },

    // ========================================
    // Wrapped Errors
    // ========================================

    /// Error from common crate.
    #[error(transparent)]
    Common(#[from] CommonError),
}

impl CoreError {
    // ========================================
    // Convenience Constructors
    // ========================================

    /// Creates an `InvalidPacketSize` error.
    pub fn packet_size(actual: usize, reason: impl Into<String>) -> Self {
        Self::InvalidPacketSize {
            actual,
            reason: reason.into(),
        }
    }

    /// Creates a `JsonParse` error.
    pub fn json_parse(reason: impl Into<String>) -> Self {
        Self::JsonParse {
            reason: reason.into(),
        }
    }

    /// Creates a `BadPacket` error.
    pub fn bad_packet(reason: impl Into<String>) -> Self {
        Self::BadPacket {
            reason: reason.into(),
        }
    }

    /// Creates an `InvalidJson` error.
    pub fn invalid_json(reason: impl Into<String>) -> Self {
        Self::InvalidJson {
            reason: reason.into(),
        }
    }

    /// Creates an `Encoding` error.
    pub fn encoding(context: impl Into<String>) -> Self {
        Self::Encoding {
            context: context.into(),
        }
    }

    /// Creates a `Storage` error.
    pub fn storage(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::Storage {
            operation,
            reason: reason.into(),
        }
    }

    // ========================================
    // Wire Mapping
    // ========================================

    /// Returns the stable token peers match on.
    #[must_use]
    pub const fn token(&self) -> &'static str {
        match self {
            Self::NotInitialized => "CRYPTO_DISABLED",
            Self::TokenTooShort { .. } => "TOKEN_TOO_SHORT",
            Self::LimitExceeded { .. } => "LIMIT_EXCEEDED",
            Self::OddHexLength { .. } => "HEX_LEN",
            Self::InvalidHex => "INVALID_HEX",
            Self::InvalidPacketSize { .. } => "INVALID_PACKET_SIZE",
            Self::InvalidDataLength { .. } => "INVALID_DATA_LENGTH",
            Self::JsonParse { .. } => "JSON_PARSE",
            Self::BadPacket { .. } => "BAD_PACKET",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::InvalidJson { .. } => "INVALID_JSON",
            Self::NoCommand => "NO_COMMAND",
            Self::Encoding { .. } | Self::Storage { .. } | Self::Common(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the string placed in the `error` field of an error reply.
    ///
    /// Decrypt-path rejections carry the `ERROR:` prefix, envelope-level
    /// rejections carry the bare token.
    #[must_use]
    pub fn reply_error(&self) -> String {
        if self.is_decrypt_error() {
            format!("ERROR:{}", self.token())
        } else {
            self.token().to_string()
        }
    }

    // ========================================
    // Error Classification
    // ========================================

    /// Returns `true` if the error came from the decrypt step.
    #[must_use]
    pub const fn is_decrypt_error(&self) -> bool {
        matches!(
            self,
            Self::NotInitialized
                | Self::LimitExceeded { .. }
                | Self::OddHexLength { .. }
                | Self::InvalidHex
                | Self::InvalidPacketSize { .. }
                | Self::InvalidDataLength { .. }
        )
    }

    /// Returns `true` if this is a malformed-input error.
    ///
    /// These are rejected before any cryptographic work beyond hex decoding.
    #[must_use]
    pub const fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            Self::OddHexLength { .. }
                | Self::InvalidHex
                | Self::InvalidPacketSize { .. }
                | Self::InvalidDataLength { .. }
                | Self::JsonParse { .. }
                | Self::BadPacket { .. }
                | Self::InvalidJson { .. }
                | Self::NoCommand
        )
    }

    /// Returns `true` if this is a configuration error that retrying won't fix.
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(self, Self::NotInitialized | Self::TokenTooShort { .. })
    }

    /// Returns `true` if this error might indicate an attack.
    ///
    /// These are logged as security events.
    #[must_use]
    pub const fn is_suspicious(&self) -> bool {
        matches!(self, Self::InvalidSignature | Self::LimitExceeded { .. })
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
        let err = CoreError::TokenTooShort { min: 32, actual: 5 };
        assert!(err.to_string().contains("32"));
        assert!(err.to_string().contains('5'));
    }

    #[test]
    fn test_tokens() {
        assert_eq!(CoreError::NotInitialized.token(), "CRYPTO_DISABLED");
        assert_eq!(CoreError::OddHexLength { len: 3 }.token(), "HEX_LEN");
        assert_eq!(CoreError::packet_size(4, "short").token(), "INVALID_PACKET_SIZE");
        assert_eq!(
            CoreError::InvalidDataLength { declared: 0, max: 500 }.token(),
            "INVALID_DATA_LENGTH"
        );
        assert_eq!(CoreError::InvalidSignature.token(), "INVALID_SIGNATURE");
        assert_eq!(CoreError::NoCommand.token(), "NO_COMMAND");
    }

    #[test]
    fn test_reply_error_prefix() {
        let limit = CoreError::LimitExceeded { count: 1000, limit: 1000 };
        assert_eq!(limit.reply_error(), "ERROR:LIMIT_EXCEEDED");

        assert_eq!(CoreError::bad_packet("version").reply_error(), "BAD_PACKET");
        assert_eq!(CoreError::InvalidSignature.reply_error(), "INVALID_SIGNATURE");
    }

    #[test]
    fn test_error_classification() {
        assert!(CoreError::InvalidSignature.is_suspicious());
        assert!(!CoreError::InvalidSignature.is_protocol_error());

        assert!(CoreError::InvalidHex.is_protocol_error());
        assert!(CoreError::InvalidHex.is_decrypt_error());

        assert!(CoreError::NotInitialized.is_config_error());
        assert!(!CoreError::NoCommand.is_decrypt_error());
    }

    #[test]
    fn test_common_error_conversion() {
        let common = CommonError::invalid_input("field", "bad value");
        let core: CoreError = common.into();
        assert!(matches!(core, CoreError::Common(_)));
        assert_eq!(core.token(), "INTERNAL_ERROR");
    }
}
