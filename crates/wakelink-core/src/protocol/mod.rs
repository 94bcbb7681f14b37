// ============================================
// File: crates/wakelink-core/src/protocol/mod.rs
// ============================================
//! # Protocol Module
//!
//! ## Creation Reason
//! Defines the WakeLink secure packet format: the byte frame under the hex
//! payload and the two JSON envelopes around it.
//!
//! ## Main Functionality
//!
//! ### Submodules
//! - [`frame`]: `[len][ciphertext][nonce]` codec and size checks
//! - [`envelope`]: Outer (signed) and inner (encrypted) JSON envelopes
//! - [`version`]: Version tag handling
//!
//! ## Protocol Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Client ─── outer{payload=hex(frame(ChaCha20(inner)))} ──►  │
//! │                                                      Device │
//! │  Client ◄── outer{payload=hex(frame(ChaCha20(reply)))} ───  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Format Principles
//! - Big-endian length prefix inside the frame
//! - Signature covers the payload hex string exactly as transmitted
//! - One JSON document per line on stream transports
//!
//! ## ⚠️ Important Note for Next Developer
//! - ANY wire change requires a new version tag
//! - Deployed firmware shares this format byte for byte
//!
//! ## Last Modified
//! v0.1.0 - Initial protocol definitions

pub mod envelope;
pub mod frame;
pub mod version;

pub use envelope::{IncomingCommand, InnerEnvelope, OuterEnvelope};
pub use frame::{SecureFrame, MAX_DATA_LEN, WIRE_NONCE_SIZE};
pub use version::{ProtocolVersion, PROTOCOL_VERSION};
