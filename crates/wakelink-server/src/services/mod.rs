// ============================================
// File: crates/wakelink-server/src/services/mod.rs
// ============================================
//! # Device Services
//!
//! ## Creation Reason
//! Business logic that sits behind the packet handler: what each command
//! does, and where the device token lives.
//!
//! ## Main Functionality
//! - [`commands`]: Command table and dispatcher
//! - [`token`]: Token file persistence and first-start generation
//!
//! ## Service Interactions
//! ```text
//! PacketHandler ──► CommandDispatcher ──► WakeSender
//!       │                  │
//!       │                  └──► SecureChannel (counters, token generation)
//!       ▼
//!   TokenStore  (update_token, after the reply is sealed)
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Services never see ciphertext
//! - All services are Send + Sync and shared via Arc
//!
//! ## Last Modified
//! v0.1.0 - Initial services structure

pub mod commands;
pub mod token;

// Re-export primary types
pub use commands::{Command, CommandDispatcher, CommandOutcome, PostAction};
pub use token::{TokenSource, TokenStore};
