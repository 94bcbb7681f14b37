// ============================================
// File: crates/wakelink-common/src/lib.rs
// ============================================
//! # WakeLink Common - Shared Utilities Library
//!
//! ## Creation Reason
//! Provides the small set of types every WakeLink crate agrees on:
//! device and request identifiers, hardware addresses, the uptime clock
//! and the base error type.
//!
//! ## Main Functionality
//! - [`types`]: `DeviceId`, `RequestId`, `MacAddress`
//! - [`time`]: `Clock` abstraction with monotonic and manual implementations
//! - [`error`]: Common error types and result aliases
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              wakelink-server                        │
//! │                    │                                │
//! │         ┌──────────┴──────────┐                     │
//! │         ▼                     ▼                     │
//! │   wakelink-core       wakelink-transport            │
//! │         │                     │                     │
//! │         └──────────┬──────────┘                     │
//! │                    ▼                                │
//! │             wakelink-common  ◄── You are here       │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - This crate is the foundation - changes affect everything
//! - No internal crate dependencies (leaf node)
//! - Identifiers here travel in JSON; keep their string forms stable
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod time;
pub mod types;

// Re-export commonly used items at crate root
pub use error::{CommonError, Result};
pub use time::{Clock, ManualClock, MonotonicClock};
pub use types::{DeviceId, MacAddress, RequestId};
