// ============================================
// File: crates/wakelink-core/src/crypto/hmac.rs
// ============================================
//! # HMAC-SHA256 Message Authenticator
//!
//! ## Creation Reason
//! Authenticates the hex payload string of every outer envelope. Built
//! on the in-crate SHA-256 engine (RFC 2104 construction).
//!
//! ## Main Functionality
//! - `hmac_sha256`: Raw 32-byte tag
//! - `Authenticator`: Keyed signer producing and verifying hex tags
//!
//! ## Construction
//! ```text
//! key > 64 bytes ──► SHA-256(key)
//! K = key ∥ 0x00…  (64 bytes)
//! tag = H((K ⊕ 0x5c) ∥ H((K ⊕ 0x36) ∥ data))
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Tags travel as 64 lowercase hex characters
//! - Verification decodes hex first (any case) and compares raw bytes
//!   in constant time; never compare hex strings with `==`
//!
//! ## Last Modified
//! v0.1.0 - Initial authenticator

use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use super::keys::MacKey;
use super::sha256::{self, Sha256, BLOCK_SIZE};
use super::{HMAC_TAG_SIZE, SHA256_DIGEST_SIZE};

// ============================================
// Constants
// ============================================

const IPAD: u8 = 0x36;
const OPAD: u8 = 0x5c;

/// Length of a hex-encoded tag in characters.
pub const HMAC_HEX_LEN: usize = HMAC_TAG_SIZE * 2;

// ============================================
// Raw HMAC
// ============================================

/// Computes HMAC-SHA256 of `data` under `key`.
#[must_use]
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> [u8; HMAC_TAG_SIZE] {
    let mut block_key = [0u8; BLOCK_SIZE];
    if key.len() > BLOCK_SIZE {
        let mut hashed = sha256::digest(key);
        block_key[..SHA256_DIGEST_SIZE].copy_from_slice(&hashed);
        hashed.zeroize();
    } else {
        block_key[..key.len()].copy_from_slice(key);
    }

    let mut pad = [0u8; BLOCK_SIZE];

    for (p, k) in pad.iter_mut().zip(block_key.iter()) {
        *p = k ^ IPAD;
    }
    let mut inner = Sha256::new();
    inner.update(&pad);
    inner.update(data);
    let mut inner_hash = inner.finalize();

    for (p, k) in pad.iter_mut().zip(block_key.iter()) {
        *p = k ^ OPAD;
    }
    let mut outer = Sha256::new();
    outer.update(&pad);
    outer.update(&inner_hash);

    block_key.zeroize();
    pad.zeroize();
    inner_hash.zeroize();

    outer.finalize()
}

// ============================================
// Authenticator
// ============================================

/// Signs and verifies envelope payloads with a fixed key.
///
/// # Example
/// ```
/// use wakelink_core::crypto::hmac::Authenticator;
/// use wakelink_core::crypto::keys::MacKey;
///
/// let auth = Authenticator::new(MacKey::from_bytes([7u8; 32]));
/// let tag = auth.sign_hex(b"00ab");
///
/// assert_eq!(tag.len(), 64);
/// assert!(auth.verify_hex(b"00ab", &tag));
/// assert!(auth.verify_hex(b"00ab", &tag.to_uppercase()));
/// assert!(!auth.verify_hex(b"00ac", &tag));
/// ```
#[derive(Debug, Clone)]
pub struct Authenticator {
    key: MacKey,
}

impl Authenticator {
    /// Creates an authenticator bound to `key`.
    #[must_use]
    pub const fn new(key: MacKey) -> Self {
        Self { key }
    }

    /// Returns the raw tag for `data`.
    #[must_use]
    pub fn sign(&self, data: &[u8]) -> [u8; HMAC_TAG_SIZE] {
        hmac_sha256(self.key.as_bytes(), data)
    }

    /// Returns the tag for `data` as lowercase hex.
    #[must_use]
    pub fn sign_hex(&self, data: &[u8]) -> String {
        hex::encode(self.sign(data))
    }

    /// Checks a hex tag received from a peer.
    ///
    /// Accepts upper or lower case. Anything that does not decode to
    /// exactly 32 bytes is rejected.
    #[must_use]
    pub fn verify_hex(&self, data: &[u8], received: &str) -> bool {
        if received.len() != HMAC_HEX_LEN {
            return false;
        }
        let Ok(received) = hex::decode(received) else {
            return false;
        };
        let expected = self.sign(data);
        expected.as_slice().ct_eq(received.as_slice()).into()
    }
}

// ============================================
// Tests
// ============================================
