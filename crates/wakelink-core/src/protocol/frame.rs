// ============================================
// File: crates/wakelink-core/src/protocol/frame.rs
// ============================================
//! # Secure Frame Codec
//!
//! ## Creation Reason
//! Encrypted payloads travel as a hex string inside the outer envelope.
//! This module owns the byte layout under that hex and every size check
//! performed on it.
//!
//! ## Wire Format
//! ```text
//! ┌──────────────┬─────────────────────┬──────────────────┐
//! │ len (u16 BE) │ ciphertext (len B)  │ nonce (16 B)     │
//! └──────────────┴─────────────────────┴──────────────────┘
//!   2 bytes        1..=500 bytes         first 12 feed ChaCha20
//! ```
//!
//! ## Decode Order
//! 1. Odd hex length → `HEX_LEN`
//! 2. Hex longer than the largest legal frame → `INVALID_PACKET_SIZE`
//! 3. Non-hex character → `INVALID_HEX`
//! 4. Fewer than 22 bytes → `INVALID_PACKET_SIZE`
//! 5. Declared length outside `1..=500` → `INVALID_DATA_LENGTH`
//! 6. Total ≠ `2 + len + 16` → `INVALID_PACKET_SIZE`
//!
//! ## ⚠️ Important Note for Next Developer
//! - The 4 trailing nonce bytes are carried but never interpreted
//! - Size limits are checked before anything is allocated
//!
//! ## Last Modified
//! v0.1.0 - Initial frame codec

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::crypto::CHACHA20_NONCE_SIZE;
use crate::error::{CoreError, Result};

// ============================================
// Constants
// ============================================

/// Maximum ciphertext length in one frame.
pub const MAX_DATA_LEN: usize = 500;

/// Nonce bytes carried on the wire.
pub const WIRE_NONCE_SIZE: usize = 16;

/// Size of the big-endian length prefix.
pub const LENGTH_PREFIX_SIZE: usize = 2;

/// Smallest decoded frame accepted.
pub const MIN_FRAME_SIZE: usize = 22;

/// Largest decoded frame possible.
pub const MAX_FRAME_SIZE: usize = LENGTH_PREFIX_SIZE + MAX_DATA_LEN + WIRE_NONCE_SIZE;

// ============================================
// SecureFrame
// ============================================

/// Decoded payload: ciphertext plus its wire nonce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecureFrame {
    ciphertext: Bytes,
    nonce: [u8; WIRE_NONCE_SIZE],
}

impl SecureFrame {
    /// Creates a frame.
    ///
    /// # Errors
    /// Returns `InvalidDataLength` if `ciphertext` does not fit the
    /// length prefix rules.
    pub fn new(ciphertext: impl Into<Bytes>, nonce: [u8; WIRE_NONCE_SIZE]) -> Result<Self> {
        let ciphertext = ciphertext.into();
        if ciphertext.len() > MAX_DATA_LEN {
            return Err(CoreError::InvalidDataLength {
                declared: ciphertext.len(),
                max: MAX_DATA_LEN,
            });
        }
        Ok(Self { ciphertext, nonce })
    }

    /// Returns the ciphertext.
    #[must_use]
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// Returns all 16 wire nonce bytes.
    #[must_use]
    pub const fn wire_nonce(&self) -> &[u8; WIRE_NONCE_SIZE] {
        &self.nonce
    }

    /// Returns the 12 bytes that feed the cipher.
    #[must_use]
    pub fn cipher_nonce(&self) -> [u8; CHACHA20_NONCE_SIZE] {
        let mut nonce = [0u8; CHACHA20_NONCE_SIZE];
        nonce.copy_from_slice(&self.nonce[..CHACHA20_NONCE_SIZE]);
        nonce
    }

    /// Serializes to the raw byte layout.
    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        let mut buf =
            BytesMut::with_capacity(LENGTH_PREFIX_SIZE + self.ciphertext.len() + WIRE_NONCE_SIZE);
        // new() bounds the length to MAX_DATA_LEN, which fits u16
        #[allow(clippy::cast_possible_truncation)]
        buf.put_u16(self.ciphertext.len() as u16);
        buf.put_slice(&self.ciphertext);
        buf.put_slice(&self.nonce);
        buf.freeze()
    }

    /// Serializes to lowercase hex.
    #[must_use]
    pub fn encode_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Parses a hex payload.
    ///
    /// # Errors
    /// See the module docs for the order of checks.
    pub fn decode_hex(payload: &str) -> Result<Self> {
        if payload.len() % 2 != 0 {
            return Err(CoreError::OddHexLength { len: payload.len() });
        }
        if payload.len() > MAX_FRAME_SIZE * 2 {
            return Err(CoreError::packet_size(payload.len() / 2, "exceeds maximum frame"));
        }

        let raw = hex::decode(payload).map_err(|_| CoreError::InvalidHex)?;
        Self::decode(Bytes::from(raw))
    }

    /// Parses the raw byte layout.
    ///
    /// # Errors
    /// Returns `InvalidPacketSize` or `InvalidDataLength`.
    pub fn decode(mut buf: Bytes) -> Result<Self> {
        let total = buf.len();
        if total < MIN_FRAME_SIZE {
            return Err(CoreError::packet_size(total, "below minimum frame"));
        }

        let declared = usize::from(buf.get_u16());
        if declared == 0 || declared > MAX_DATA_LEN {
            return Err(CoreError::InvalidDataLength {
                declared,
                max: MAX_DATA_LEN,
            });
        }
        if total != LENGTH_PREFIX_SIZE + declared + WIRE_NONCE_SIZE {
            return Err(CoreError::packet_size(total, "does not match declared length"));
        }

        let ciphertext = buf.split_to(declared);
        let mut nonce = [0u8; WIRE_NONCE_SIZE];
        buf.copy_to_slice(&mut nonce);

        Ok(Self { ciphertext, nonce })
    }
}

// ============================================
// Tests
// ============================================
