// ============================================
// File: crates/wakelink-core/src/lib.rs
// ============================================
//! # WakeLink Core - Crypto & Secure Packet Protocol
//!
//! ## Creation Reason
//! Every command a WakeLink device accepts arrives sealed by this crate
//! and every reply leaves sealed by it. It is the security backbone of
//! the device and of the clients that talk to it.
//!
//! ## Main Functionality
//!
//! ### Crypto Module ([`crypto`])
//! - SHA-256, ChaCha20 and HMAC-SHA256 implemented in-crate so firmware
//!   peers can match them bit for bit
//! - Token and key types with zeroize-on-drop
//! - Key derivation (`KeyMode::Shared` / `KeyMode::Separated`)
//!
//! ### Protocol Module ([`protocol`])
//! - Secure frame codec under the hex payload
//! - Outer and inner JSON envelopes, version tag
//!
//! ### Replay Window ([`counter`], [`storage`])
//! - Bounded request counter persisted to `NvStorage`
//!
//! ### Channel ([`channel`])
//! - `SecureChannel`: the context object tying keys, counter and codec
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              wakelink-server                        │
//! │                    │                                │
//! │         ┌──────────┴──────────┐                     │
//! │         ▼                     ▼                     │
//! │   wakelink-core       wakelink-transport            │
//! │   You are here                │                     │
//! │         │                     │                     │
//! │         └──────────┬──────────┘                     │
//! │                    ▼                                │
//! │             wakelink-common                         │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Security Properties
//! - **Confidentiality**: ChaCha20 with a random nonce per message
//! - **Integrity**: HMAC-SHA256 over the payload hex, checked before decrypt
//! - **Replay bound**: 1000 decrypts per token until an explicit reset
//! - No forward secrecy, no cipher agility
//!
//! ## ⚠️ Important Note for Next Developer
//! - Nothing in this crate may panic on peer input
//! - ALL keys MUST implement Zeroize
//! - Wire changes break deployed firmware
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod channel;
pub mod counter;
pub mod crypto;
pub mod error;
pub mod protocol;
pub mod storage;

// Re-export commonly used items
pub use channel::{ChannelConfig, SealedCommand, SecureChannel};
pub use counter::{CounterConfig, ReplayCounter, REQUEST_LIMIT};
pub use crypto::{DeviceToken, KeyMode, OsRandom, RandomSource, SeededRandom};
pub use error::{CoreError, Result};
pub use protocol::{IncomingCommand, OuterEnvelope, SecureFrame, PROTOCOL_VERSION};
pub use storage::{MemoryStorage, NvStorage};
