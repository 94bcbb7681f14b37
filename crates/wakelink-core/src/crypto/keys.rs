// ============================================
// File: crates/wakelink-core/src/crypto/keys.rs
// ============================================
//! # Key Material Types
//!
//! ## Creation Reason
//! Wraps the device token and the symmetric keys derived from it so
//! secret bytes are wiped on drop and never reach a log line.
//!
//! ## Main Functionality
//! - `DeviceToken`: Provisioned shared secret (>= 32 characters)
//! - `CipherKey`: 32-byte ChaCha20 key
//! - `MacKey`: 32-byte HMAC-SHA256 key
//! - `ChannelKeys`: The pair used by a secure channel
//!
//! ## Key Lifecycle
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │  DeviceToken (long-term)                                   │
//! │  ├─ Generated once on first boot, stored in config         │
//! │  ├─ Shared out of band with the client                     │
//! │  └─ Rotated only by update_token                           │
//! │                                                            │
//! │  ChannelKeys (process lifetime)                            │
//! │  ├─ Derived from the token at initialize()                 │
//! │  └─ Replaced wholesale on re-provisioning                  │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - ALL key types implement Zeroize and wipe on drop
//! - Debug output is redacted; Display is deliberately not implemented
//!   for keys
//! - Equality is constant-time
//!
//! ## Last Modified
//! v0.1.0 - Initial key type definitions

use std::fmt;

use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use super::random::RandomSource;
use super::{CHACHA20_KEY_SIZE, HMAC_KEY_SIZE};
use crate::error::{CoreError, Result};

// ============================================
// Constants
// ============================================

/// Minimum accepted token length in bytes.
pub const MIN_TOKEN_LEN: usize = 32;

/// Length of a generated token.
pub const GENERATED_TOKEN_LEN: usize = 96;

/// Alphabet generated tokens are drawn from.
pub const TOKEN_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

// ============================================
// DeviceToken
// ============================================

/// Shared secret provisioned on the device and its clients.
///
/// # Example
/// ```
/// use wakelink_core::crypto::keys::DeviceToken;
///
/// assert!(DeviceToken::new("short").is_err());
///
/// let token = DeviceToken::new("0123456789abcdef0123456789abcdef").unwrap();
/// assert_eq!(token.len(), 32);
/// assert!(!format!("{token:?}").contains("0123"));
/// ```
#[derive(Clone, Zeroize)]
pub struct DeviceToken(String);

impl Drop for DeviceToken {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl DeviceToken {
    /// Accepts a token of at least [`MIN_TOKEN_LEN`] bytes.
    ///
    /// # Errors
    /// Returns `TokenTooShort` below the minimum.
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.len() < MIN_TOKEN_LEN {
            let actual = token.len();
            let mut token = token;
            token.zeroize();
            return Err(CoreError::TokenTooShort {
                min: MIN_TOKEN_LEN,
                actual,
            });
        }
        Ok(Self(token))
    }

    /// Generates a fresh 96-character alphanumeric token.
    pub fn generate(rng: &dyn RandomSource) -> Self {
        let mut raw = [0u8; GENERATED_TOKEN_LEN];
        rng.fill_bytes(&mut raw);

        // 62 symbols: reject bytes >= 248 to avoid modulo bias
        let mut token = String::with_capacity(GENERATED_TOKEN_LEN);
        let mut pool = raw.to_vec();
        let mut idx = 0;
        while token.len() < GENERATED_TOKEN_LEN {
            if idx == pool.len() {
                pool.zeroize();
                pool = vec![0u8; GENERATED_TOKEN_LEN];
                rng.fill_bytes(&mut pool);
                idx = 0;
            }
            let b = pool[idx];
            idx += 1;
            if usize::from(b) < 248 {
                token.push(char::from(TOKEN_ALPHABET[usize::from(b) % TOKEN_ALPHABET.len()]));
            }
        }

        raw.zeroize();
        pool.zeroize();
        Self(token)
    }

    /// Returns the token bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Exposes the token text, for provisioning output only.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Returns the token length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; a valid token is never empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for DeviceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceToken([REDACTED; {}])", self.0.len())
    }
}

impl PartialEq for DeviceToken {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes().ct_eq(other.as_bytes()).into()
    }
}

impl Eq for DeviceToken {}

// ============================================
// Symmetric Keys
// ============================================

macro_rules! symmetric_key {
    ($(#[$meta:meta])* $name:ident, $size:expr) => {
        $(#[$meta])*
        #[derive(Clone, Zeroize)]
        pub struct $name([u8; $size]);

        impl $name {
            /// Wraps raw key bytes.
            #[must_use]
            pub const fn from_bytes(bytes: [u8; $size]) -> Self {
                Self(bytes)
            }

            /// Returns the raw key bytes.
            #[must_use]
            pub const fn as_bytes(&self) -> &[u8; $size] {
                &self.0
            }
        }

        impl Drop for $name {
            fn drop(&mut self) {
                self.0.zeroize();
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(concat!(stringify!($name), "([REDACTED])"))
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.0.as_slice().ct_eq(other.0.as_slice()).into()
            }
        }

        impl Eq for $name {}
    };
}

symmetric_key!(
    /// ChaCha20 key.
    CipherKey,
    CHACHA20_KEY_SIZE
);

symmetric_key!(
    /// HMAC-SHA256 key.
    MacKey,
    HMAC_KEY_SIZE
);

// ============================================
// ChannelKeys
// ============================================

/// Cipher and MAC keys held by one secure channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelKeys {
    /// Payload encryption key.
    pub cipher: CipherKey,
    /// Envelope signing key.
    pub mac: MacKey,
}

impl ChannelKeys {
    /// Returns `true` if both keys are the same bytes.
    #[must_use]
    pub fn is_shared(&self) -> bool {
        self.cipher.as_bytes().as_slice().ct_eq(self.mac.as_bytes().as_slice()).into()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::random::SeededRandom;

    #[test]
    fn test_token_minimum_length() {
        let err = DeviceToken::new("a".repeat(31)).unwrap_err();
        assert!(matches!(err, CoreError::TokenTooShort { min: 32, actual: 31 }));
        assert!(DeviceToken::new("a".repeat(32)).is_ok());
    }

    #[test]
    fn test_generated_token_shape() {
        let rng = SeededRandom::new(1);
        let token = DeviceToken::generate(&rng);

        assert_eq!(token.len(), GENERATED_TOKEN_LEN);
        assert!(token.expose().bytes().all(|b| b.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_generated_tokens_differ() {
        let rng = SeededRandom::new(2);
        let a = DeviceToken::generate(&rng);
        let b = DeviceToken::generate(&rng);
        assert_ne!(a, b);
    }

    #[test]
    fn test_debug_is_redacted() {
        let token = DeviceToken::new("S3cretS3cretS3cretS3cretS3cretS3cret").unwrap();
        assert!(!format!("{token:?}").contains("S3cret"));

        let key = CipherKey::from_bytes([0xAB; 32]);
        let dbg = format!("{key:?}");
        assert!(dbg.contains("REDACTED"));
        assert!(!dbg.to_lowercase().contains("ab"));
    }

    #[test]
    fn test_key_equality() {
        assert_eq!(MacKey::from_bytes([1; 32]), MacKey::from_bytes([1; 32]));
        assert_ne!(MacKey::from_bytes([1; 32]), MacKey::from_bytes([2; 32]));
    }

    #[test]
    fn test_channel_keys_shared() {
        let shared = ChannelKeys {
            cipher: CipherKey::from_bytes([5; 32]),
            mac: MacKey::from_bytes([5; 32]),
        };
        assert!(shared.is_shared());

        let split = ChannelKeys {
            cipher: CipherKey::from_bytes([5; 32]),
            mac: MacKey::from_bytes([6; 32]),
        };
        assert!(!split.is_shared());
    }
}
