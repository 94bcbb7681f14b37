// ============================================
// File: crates/wakelink-server/src/lib.rs
// ============================================
//! # WakeLink Device Library
//!
//! ## Creation Reason
//! Provides the device daemon for the WakeLink secure packet protocol:
//! it accepts sealed commands over TCP and wakes machines on the LAN.
//!
//! ## Main Functionality
//!
//! ### Modules
//! - [`config`]: Daemon configuration management
//! - [`server`]: Component wiring and lifecycle
//! - [`services`]: Business logic services
//!   - [`services::commands`]: Command table and dispatch
//!   - [`services::token`]: Device token persistence
//! - [`handlers`]: Request line handling
//! - [`storage`]: File-backed EEPROM image
//! - [`client`]: Command-line client side of the protocol
//! - [`error`]: Server-specific error types
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        WakeLink Device                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐     ┌─────────────┐     ┌─────────────────┐    │
//! │  │   Config    │────►│   Server    │────►│ Packet Handler  │    │
//! │  └─────────────┘     └──────┬──────┘     └────────┬────────┘    │
//! │                             │                     │             │
//! │         ┌───────────────────┼─────────────────────┤             │
//! │         ▼                   ▼                     ▼             │
//! │  ┌─────────────┐     ┌─────────────┐     ┌─────────────────┐    │
//! │  │ FileStorage │     │ TokenStore  │     │CommandDispatcher│    │
//! │  └─────────────┘     └─────────────┘     └─────────────────┘    │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                     Transport Layer                             │
//! │  ┌─────────────────────┐     ┌─────────────────────────────┐    │
//! │  │  TCP line listener  │     │   UDP Wake-on-LAN sender    │    │
//! │  └─────────────────────┘     └─────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Data Flow
//! ```text
//! Client → TCP → Verify → Decrypt → Dispatch → (UDP magic packet)
//! Client ← TCP ← Sign   ← Encrypt ← Reply
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Configuration changes require restart (no hot-reload)
//! - The replay counter lives in the storage image; deleting it reopens
//!   the window
//!
//! ## Last Modified
//! v0.1.0 - Initial device library

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod error;
pub mod handlers;
pub mod server;
pub mod services;
pub mod storage;

// Re-export primary types
pub use client::DeviceClient;
pub use config::ServerConfig;
pub use error::{Result, ServerError};
pub use server::{build_handler, Server};
pub use storage::FileStorage;
