// ============================================
// File: crates/wakelink-transport/src/lib.rs
// ============================================
//! # WakeLink Transport - Network I/O Layer
//!
//! ## Creation Reason
//! Carries sealed envelopes between clients and the device, and sends the
//! Wake-on-LAN broadcasts the device exists for.
//!
//! ## Main Functionality
//!
//! ### Modules
//! - [`tcp`]: Line-delimited TCP listener, connection and client helper
//! - [`wol`]: Broadcast UDP magic packet sender
//! - [`traits`]: `WakeSender` seam and connection metadata
//! - [`mock`]: Recording `WakeSender` for tests
//! - [`error`]: Transport-specific error types
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              wakelink-server                        │
//! │                    │                                │
//! │         ┌──────────┴──────────┐                     │
//! │         ▼                     ▼                     │
//! │   wakelink-core       wakelink-transport            │
//! │                       You are here ◄──              │
//! │         │                     │                     │
//! │         └──────────┬──────────┘                     │
//! │                    ▼                                │
//! │             wakelink-common                         │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Data Flow
//! ```text
//!   client ══ TCP line ══► TcpLineListener ──► server logic
//!                                                  │
//!                                      wake cmd    ▼
//!                                  UdpWakeSender ── UDP :9 ──► LAN broadcast
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - This crate never sees plaintext; it moves opaque lines
//! - Always go through `WakeSender` so tests can swap in the mock
//!
//! ## Last Modified
//! v0.1.0 - Initial transport layer implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod mock;
pub mod tcp;
pub mod traits;
pub mod wol;

// Re-export primary types
pub use error::{Result, TransportError};
pub use tcp::{request_line, LineConnection, LineLimits, TcpLineListener};
pub use traits::{PeerInfo, WakeSender};
pub use wol::UdpWakeSender;
