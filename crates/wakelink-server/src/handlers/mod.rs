// ============================================
// File: crates/wakelink-server/src/handlers/mod.rs
// ============================================
//! # Request Handlers
//!
//! ## Creation Reason
//! Glue between the TCP line transport and the command services.
//!
//! ## Request Flow
//! ```text
//! Client → Device:
//!   1. Read one line from the connection
//!   2. Verify signature, decrypt, count
//!   3. Dispatch command
//!   4. Seal reply (request_id echoed)
//!   5. Write one line, close
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Handlers must always produce a reply line, even for garbage input
//! - Log suspicious activity (bad signature, exhausted window)
//!
//! ## Last Modified
//! v0.1.0 - Initial handlers structure

pub mod packet;

pub use packet::{HandlerStats, PacketHandler};
