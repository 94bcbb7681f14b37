// ============================================
// File: crates/wakelink-transport/src/error.rs
// ============================================
//! # Transport Error Types
//!
//! ## Creation Reason
//! Defines error types for the TCP line transport and the Wake-on-LAN
//! UDP sender.
//!
//! ## Main Functionality
//! - `TransportError`: Primary error enum for transport operations
//! - Error conversion from system errors
//! - Classification of transient (retryable) errors
//!
//! ## Error Categories
//! 1. **Network Errors**: bind, connect, send and receive failures
//! 2. **Framing Errors**: request lines that exceed the buffer
//! 3. **Configuration Errors**: unparsable addresses
//!
//! ## ⚠️ Important Note for Next Developer
//! - A client sending an oversized line is not a server fault; the
//!   connection is dropped and logged at debug level only
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

// ============================================
// Result Type Alias
// ============================================

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

// ============================================
// TransportError
// ============================================

/// Transport layer error types.
#[derive(Error, Debug)]
pub enum TransportError {
    // ========================================
    // Network Errors
    // ========================================

    /// Failed to bind to address.
    #[error("Failed to bind to {addr}: {reason}")]
    BindFailed {
        /// Address we tried to bind to
        addr: SocketAddr,
        /// Why binding failed
        reason: String,
    },

    /// Address already in use.
    #[error("Address {addr} already in use")]
    AddressInUse {
        /// The address that's in use
        addr: SocketAddr,
    },

    /// Could not reach a peer.
    #[error("Failed to connect to {addr}: {reason}")]
    ConnectFailed {
        /// Peer address
        addr: SocketAddr,
        /// Why the connection failed
        reason: String,
    },

    /// Send operation failed.
    #[error("Failed to send to {dest}: {reason}")]
    SendFailed {
        /// Destination address
        dest: SocketAddr,
        /// Why send failed
        reason: String,
    },

    /// Peer closed the connection before a full reply arrived.
    #[error("Connection closed by peer")]
    ConnectionClosed,

    /// Operation timed out.
    #[error("Operation timed out: {operation} after {duration_ms}ms")]
    Timeout {
        /// What operation timed out
        operation: String,
        /// How long we waited
        duration_ms: u64,
    },

    // ========================================
    // Framing Errors
    // ========================================

    /// A line exceeded the configured maximum.
    #[error("Line exceeds {limit} bytes")]
    LineTooLong {
        /// Maximum accepted line length
        limit: usize,
    },

    // ========================================
    // Configuration Errors
    // ========================================

    /// Invalid socket address.
    #[error("Invalid address: {addr}")]
    InvalidAddress {
        /// The invalid address string
        addr: String,
    },

    // ========================================
    // Wrapped Errors
    // ========================================

    /// I/O error from the system.
    #[error("I/O error: {context}")]
    Io {
        /// What was happening when the error occurred
        context: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl TransportError {
    // ========================================
    // Convenience Constructors
    // ========================================

    /// Creates a `BindFailed` error.
    pub fn bind_failed(addr: SocketAddr, reason: impl Into<String>) -> Self {
        Self::BindFailed {
            addr,
            reason: reason.into(),
        }
    }

    /// Creates an `Io` error with context.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Creates a `Timeout` error.
    pub fn timeout(operation: impl Into<String>, duration: std::time::Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
        }
    }

    // ========================================
    // Error Classification
    // ========================================

    /// Returns `true` if this error is transient and retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::SendFailed { .. } | Self::ConnectFailed { .. } => true,
            Self::Io { source, .. } => matches!(
                source.kind(),
                io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted | io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }
}

impl From<io::Error> for TransportError {
    fn from(err: io::Error) -> Self {
        Self::io("unspecified", err)
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_error_display() {
        let addr: SocketAddr = "127.0.0.1:5000".parse().unwrap();
        let err = TransportError::bind_failed(addr, "permission denied");
        assert!(err.to_string().contains("127.0.0.1:5000"));
        assert!(err.to_string().contains("permission denied"));
    }

    #[test]
    fn test_timeout_millis() {
        let err = TransportError::timeout("read line", Duration::from_secs(5));
        assert!(matches!(err, TransportError::Timeout { duration_ms: 5000, .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_classification() {
        assert!(!TransportError::LineTooLong { limit: 1023 }.is_retryable());
        assert!(!TransportError::ConnectionClosed.is_retryable());

        let io_err = TransportError::io(
            "reading",
            io::Error::new(io::ErrorKind::Interrupted, "signal"),
        );
        assert!(io_err.is_retryable());
    }
}
