// ============================================
// File: crates/wakelink-core/src/protocol/version.rs
// ============================================
//! # Protocol Versioning
//!
//! ## Creation Reason
//! The outer envelope carries a version tag. Devices and clients in the
//! field only speak `"1.0"`, so the check is an exact string match.
//!
//! ## Version History
//! | Version | Description |
//! |---------|-------------|
//! | `1.0`   | Hex payload, HMAC-SHA256 over payload string, ChaCha20 |
//!
//! ## ⚠️ Important Note for Next Developer
//! - No negotiation: anything but an exact match is `BAD_PACKET`
//! - Document new versions in the table above
//!
//! ## Last Modified
//! v0.1.0 - Initial version definitions

use std::fmt;

// ============================================
// Constants
// ============================================

/// Version tag written into every outer envelope.
pub const PROTOCOL_VERSION: &str = "1.0";

// ============================================
// ProtocolVersion
// ============================================

/// Parsed outer envelope version.
///
/// # Example
/// ```
/// use wakelink_core::protocol::ProtocolVersion;
///
/// assert!(ProtocolVersion::parse("1.0").is_supported());
/// assert!(!ProtocolVersion::parse("1.0 ").is_supported());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolVersion {
    /// `"1.0"`
    V1,
    /// Any other tag.
    Unsupported,
}

impl ProtocolVersion {
    /// Returns the version this build writes.
    #[must_use]
    pub const fn current() -> Self {
        Self::V1
    }

    /// Classifies a version tag. Matching is exact; no trimming.
    #[must_use]
    pub fn parse(tag: &str) -> Self {
        if tag == PROTOCOL_VERSION {
            Self::V1
        } else {
            Self::Unsupported
        }
    }

    /// Returns `true` if envelopes with this version are accepted.
    #[must_use]
    pub const fn is_supported(&self) -> bool {
        matches!(self, Self::V1)
    }

    /// Returns the wire tag.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::V1 => PROTOCOL_VERSION,
            Self::Unsupported => "unsupported",
        }
    }
}

impl Default for ProtocolVersion {
    fn default() -> Self {
        Self::current()
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match_only() {
        assert_eq!(ProtocolVersion::parse("1.0"), ProtocolVersion::V1);
        for tag in ["", "1", "1.00", "2.0", " 1.0", "v1.0"] {
            assert!(!ProtocolVersion::parse(tag).is_supported(), "{tag:?}");
        }
    }

    #[test]
    fn test_current_round_trips() {
        let v = ProtocolVersion::current();
        assert_eq!(ProtocolVersion::parse(v.as_str()), v);
        assert_eq!(v.to_string(), "1.0");
    }
}
