// ============================================
// File: crates/wakelink-core/src/crypto/mod.rs
// ============================================
//! # Cryptography Module
//!
//! ## Creation Reason
//! Holds the fixed WakeLink suite: SHA-256, ChaCha20 and HMAC-SHA256,
//! all bound to one provisioned device token.
//!
//! ## Main Functionality
//!
//! ### Submodules
//! - [`sha256`]: Streaming hash engine
//! - [`chacha20`]: Stream cipher
//! - [`hmac`]: Message authenticator
//! - [`kdf`]: Token to key derivation
//! - [`keys`]: Token and key wrappers
//! - [`random`]: Injected randomness
//!
//! ## Cryptographic Design
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  DeviceToken ──► SHA-256 ──► root key                       │
//! │                                 │                           │
//! │                    ┌────────────┴────────────┐              │
//! │                    ▼                         ▼              │
//! │               cipher key                  mac key           │
//! │                    │                         │              │
//! │  plaintext ──► ChaCha20 ──► frame ──► hex ──► HMAC ──► tag  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Security Properties
//! - **Confidentiality**: ChaCha20 with a fresh random nonce per message
//! - **Integrity**: HMAC-SHA256 over the hex payload string
//! - **Replay bound**: request counter gates decryption (see `counter`)
//! - No forward secrecy and no cipher agility
//!
//! ## ⚠️ Important Note for Next Developer
//! - Firmware peers implement the same primitives; any change here must
//!   stay bit-compatible with them
//! - ALL key types implement Zeroize
//! - Test vectors come from FIPS 180-4, RFC 4231 and RFC 8439
//!
//! ## Last Modified
//! v0.1.0 - Initial crypto implementation

pub mod chacha20;
pub mod hmac;
pub mod kdf;
pub mod keys;
pub mod random;
pub mod sha256;

// Re-export primary types at module level
pub use hmac::Authenticator;
pub use kdf::{derive_keys, KeyMode};
pub use keys::{ChannelKeys, CipherKey, DeviceToken, MacKey};
pub use random::{OsRandom, RandomSource, SeededRandom};

// ============================================
// Constants
// ============================================

/// Size of a SHA-256 digest in bytes.
pub const SHA256_DIGEST_SIZE: usize = 32;

/// Size of a ChaCha20 key in bytes.
pub const CHACHA20_KEY_SIZE: usize = 32;

/// Size of a ChaCha20 nonce in bytes.
pub const CHACHA20_NONCE_SIZE: usize = 12;

/// Size of an HMAC key in bytes.
pub const HMAC_KEY_SIZE: usize = 32;

/// Size of an HMAC-SHA256 tag in bytes.
pub const HMAC_TAG_SIZE: usize = 32;
