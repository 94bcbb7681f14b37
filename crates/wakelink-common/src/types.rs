// ============================================
// File: crates/wakelink-common/src/types.rs
// ============================================
//! # Core Type Definitions
//!
//! ## Creation Reason
//! Centralizes the identifiers that travel inside WakeLink envelopes so
//! their validation lives in one place.
//!
//! ## Main Functionality
//! - `DeviceId`: Non-empty device name carried in the outer envelope
//! - `RequestId`: 8-character `[A-Z0-9]` correlation id
//! - `MacAddress`: 48-bit hardware address and its Wake-on-LAN magic packet
//!
//! ## Magic Packet Layout
//! ```text
//! ┌──────────────┬───────────────────────────────────────┐
//! │ FF × 6       │ MAC × 16                              │
//! │ (6 bytes)    │ (96 bytes)                            │
//! └──────────────┴───────────────────────────────────────┘
//!                      total: 102 bytes
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - `RequestId` is correlation only; it is not a nonce and not secret
//! - `MacAddress` accepts `:` / `-` separators or bare hex, any case
//!
//! ## Last Modified
//! v0.1.0 - Initial type definitions

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::CommonError;

// ============================================
// Constants
// ============================================

/// Length of a request id in characters.
pub const REQUEST_ID_LEN: usize = 8;

/// Alphabet request ids are drawn from.
pub const REQUEST_ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Size of a hardware address in bytes.
pub const MAC_ADDRESS_SIZE: usize = 6;

/// Size of a Wake-on-LAN magic packet in bytes.
pub const MAGIC_PACKET_SIZE: usize = 6 + 16 * MAC_ADDRESS_SIZE;

// ============================================
// DeviceId
// ============================================

/// Name a device announces in every outer envelope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Creates a device id, rejecting empty or whitespace-only names.
    ///
    /// # Errors
    /// Returns `InvalidInput` if `id` is blank.
    pub fn new(id: impl Into<String>) -> Result<Self, CommonError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(CommonError::invalid_input("device_id", "cannot be empty"));
        }
        Ok(Self(id))
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DeviceId {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

// ============================================
// RequestId
// ============================================

/// Correlation id attached to each command and echoed in its reply.
///
/// # Example
/// ```
/// use wakelink_common::types::RequestId;
///
/// let id = RequestId::generate();
/// assert_eq!(id.as_str().len(), 8);
/// assert!(id.as_str().chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Generates a random id using the thread-local generator.
    #[must_use]
    pub fn generate() -> Self {
        Self::generate_with(&mut rand::thread_rng())
    }

    /// Generates a random id from the given generator.
    pub fn generate_with<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let id = (0..REQUEST_ID_LEN)
            .map(|_| char::from(REQUEST_ID_ALPHABET[rng.gen_range(0..REQUEST_ID_ALPHABET.len())]))
            .collect();
        Self(id)
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RequestId {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != REQUEST_ID_LEN {
            return Err(CommonError::invalid_length(REQUEST_ID_LEN, s.len()));
        }
        if !s.bytes().all(|b| REQUEST_ID_ALPHABET.contains(&b)) {
            return Err(CommonError::invalid_input(
                "request_id",
                "must contain only A-Z and 0-9",
            ));
        }
        Ok(Self(s.to_string()))
    }
}

// ============================================
// MacAddress
// ============================================

/// 48-bit hardware address of a machine to wake.
///
/// # Example
/// ```
/// use wakelink_common::types::MacAddress;
///
/// let mac: MacAddress = "aa-bb-cc-dd-ee-ff".parse().unwrap();
/// assert_eq!(mac.to_string(), "AA:BB:CC:DD:EE:FF");
/// assert_eq!(mac.magic_packet().len(), 102);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddress([u8; MAC_ADDRESS_SIZE]);

impl MacAddress {
    /// Creates an address from raw octets.
    #[must_use]
    pub const fn new(octets: [u8; MAC_ADDRESS_SIZE]) -> Self {
        Self(octets)
    }

    /// Returns the raw octets.
    #[must_use]
    pub const fn octets(&self) -> [u8; MAC_ADDRESS_SIZE] {
        self.0
    }

    /// Builds the Wake-on-LAN magic packet for this address.
    #[must_use]
    pub fn magic_packet(&self) -> [u8; MAGIC_PACKET_SIZE] {
        let mut packet = [0xFF; MAGIC_PACKET_SIZE];
        for chunk in packet[6..].chunks_exact_mut(MAC_ADDRESS_SIZE) {
            chunk.copy_from_slice(&self.0);
        }
        packet
    }
}

impl fmt::Debug for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MacAddress({self})")
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

impl FromStr for MacAddress {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits: String = s.trim().chars().filter(|c| *c != ':' && *c != '-').collect();

        if digits.len() != MAC_ADDRESS_SIZE * 2 {
            return Err(CommonError::invalid_input(
                "mac",
                format!("expected 12 hex digits, got {}", digits.len()),
            ));
        }

        let bytes = hex::decode(&digits)?;
        let mut octets = [0u8; MAC_ADDRESS_SIZE];
        octets.copy_from_slice(&bytes);
        Ok(Self(octets))
    }
}

impl Serialize for MacAddress {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MacAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================
// Tests
// ============================================
