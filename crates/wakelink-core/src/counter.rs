// ============================================
// File: crates/wakelink-core/src/counter.rs
// ============================================
//! # Replay Counter
//!
//! ## Creation Reason
//! Bounds how many inbound packets one token may ever decrypt. After the
//! limit, every packet is refused until an administrator resets the
//! window. The count survives restarts through `NvStorage`.
//!
//! ## Main Functionality
//! - `ReplayCounter`: Load / increment / reset state machine
//! - `CounterConfig`: Storage offset, limit and checkpoint interval
//!
//! ## State Machine
//! ```text
//!  Uninitialized ──load()──► Active ──increment() hits limit──► LimitExceeded
//!                              ▲                                    │
//!                              └──────────── reset() ───────────────┘
//! ```
//!
//! ## Storage Record
//! ```text
//! offset:  +0 .. +3          +4     +5
//!          ┌─────────────────┬──────┬──────┐
//!          │ count (u32 LE)  │ 0xCC │ 0xDD │
//!          └─────────────────┴──────┴──────┘
//! ```
//!
//! ## Persistence Policy
//! - Every 10th increment, and unconditionally when the limit is reached
//! - `reset()` persists immediately
//! - A failed write is logged; the in-memory value stays authoritative
//!   for the rest of the session
//!
//! ## ⚠️ Important Note for Next Developer
//! - A power loss can roll the counter back by up to 9 requests; the
//!   checkpoint interval trades that for flash wear
//! - The default offset sits right after the device config block
//!
//! ## Last Modified
//! v0.1.0 - Initial replay counter

use tracing::{debug, info, warn};

use crate::error::{CoreError, Result};
use crate::storage::NvStorage;

// ============================================
// Constants
// ============================================

/// Requests allowed per token before a reset is required.
pub const REQUEST_LIMIT: u32 = 1000;

/// Increments between checkpoints.
pub const PERSIST_INTERVAL: u32 = 10;

/// Validity marker written after the count.
pub const COUNTER_MARKER: [u8; 2] = [0xCC, 0xDD];

/// Default storage offset of the counter record.
pub const DEFAULT_COUNTER_OFFSET: usize = 386;

/// Size of the counter record in bytes.
pub const COUNTER_RECORD_SIZE: usize = 4 + COUNTER_MARKER.len();

// ============================================
// CounterConfig
// ============================================

/// Placement and limits of a replay counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterConfig {
    /// Byte offset of the record in storage.
    pub offset: usize,
    /// Requests allowed before the window closes.
    pub limit: u32,
    /// Increments between checkpoints.
    pub persist_interval: u32,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            offset: DEFAULT_COUNTER_OFFSET,
            limit: REQUEST_LIMIT,
            persist_interval: PERSIST_INTERVAL,
        }
    }
}

// ============================================
// CounterState
// ============================================

/// Lifecycle state of a [`ReplayCounter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterState {
    /// Not loaded from storage yet.
    Uninitialized,
    /// Accepting requests.
    Active,
    /// Window exhausted; decryption is refused.
    LimitExceeded,
}

impl CounterState {
    /// Returns the status word used in key info strings.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "UNINITIALIZED",
            Self::Active => "ACTIVE",
            Self::LimitExceeded => "LIMIT_EXCEEDED",
        }
    }
}

// ============================================
// ReplayCounter
// ============================================

/// Persisted, bounded request counter.
///
/// # Example
/// ```
/// use wakelink_core::counter::{CounterConfig, ReplayCounter};
/// use wakelink_core::storage::MemoryStorage;
///
/// let mut counter = ReplayCounter::new(Box::new(MemoryStorage::default()), CounterConfig::default());
/// counter.load().unwrap();
///
/// counter.increment().unwrap();
/// assert_eq!(counter.value(), 1);
/// assert!(!counter.is_limit_exceeded());
/// ```
pub struct ReplayCounter {
    storage: Box<dyn NvStorage>,
    config: CounterConfig,
    value: u32,
    state: CounterState,
}

impl ReplayCounter {
    /// Creates an unloaded counter over `storage`.
    #[must_use]
    pub fn new(storage: Box<dyn NvStorage>, config: CounterConfig) -> Self {
        Self {
            storage,
            config,
            value: 0,
            state: CounterState::Uninitialized,
        }
    }

    /// Reads the persisted count.
    ///
    /// A missing marker means first use and yields `Active` at 0.
    ///
    /// # Errors
    /// Returns `Storage` if the record cannot be read at all.
    pub fn load(&mut self) -> Result<()> {
        let mut record = [0u8; COUNTER_RECORD_SIZE];
        self.storage.read(self.config.offset, &mut record)?;

        if record[4..] == COUNTER_MARKER {
            self.value = u32::from_le_bytes([record[0], record[1], record[2], record[3]]);
            info!(requests = self.value, limit = self.config.limit, "Loaded request counter");
        } else {
            self.value = 0;
            info!("No valid request counter found, starting from 0");
        }

        self.state = if self.value >= self.config.limit {
            CounterState::LimitExceeded
        } else {
            CounterState::Active
        };
        Ok(())
    }

    /// Counts one successfully decrypted request.
    ///
    /// # Errors
    /// - `NotInitialized` before [`load`](Self::load)
    /// - `LimitExceeded` once the window is closed
    pub fn increment(&mut self) -> Result<u32> {
        match self.state {
            CounterState::Uninitialized => return Err(CoreError::NotInitialized),
            CounterState::LimitExceeded => {
                return Err(CoreError::LimitExceeded {
                    count: self.value,
                    limit: self.config.limit,
                })
            }
            CounterState::Active => {}
        }

        self.value += 1;
        let reached = self.value >= self.config.limit;
        if reached {
            self.state = CounterState::LimitExceeded;
            warn!(limit = self.config.limit, "Request limit reached, decryption disabled until reset");
        }

        if reached || self.value % self.config.persist_interval.max(1) == 0 {
            self.persist_logged();
        }

        debug!(requests = self.value, limit = self.config.limit, "Request counted");
        Ok(self.value)
    }

    /// Opens a fresh window and persists it immediately.
    ///
    /// The in-memory reset always takes effect.
    ///
    /// # Errors
    /// Returns `Storage` if the new value could not be made durable.
    pub fn reset(&mut self) -> Result<()> {
        self.value = 0;
        self.state = CounterState::Active;
        info!("Request counter reset to 0");
        self.persist()
    }

    /// Returns `true` once the window is closed.
    #[must_use]
    pub fn is_limit_exceeded(&self) -> bool {
        self.state == CounterState::LimitExceeded
    }

    /// Returns the current count.
    #[must_use]
    pub const fn value(&self) -> u32 {
        self.value
    }

    /// Returns the configured limit.
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.config.limit
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub const fn state(&self) -> CounterState {
        self.state
    }

    fn persist(&mut self) -> Result<()> {
        let mut record = [0u8; COUNTER_RECORD_SIZE];
        record[..4].copy_from_slice(&self.value.to_le_bytes());
        record[4..].copy_from_slice(&COUNTER_MARKER);

        self.storage.write(self.config.offset, &record)?;
        self.storage.commit()?;
        debug!(requests = self.value, "Saved request counter");
        Ok(())
    }

    fn persist_logged(&mut self) {
        if let Err(e) = self.persist() {
            warn!(requests = self.value, error = %e, "Failed to save request counter");
        }
    }
}

impl std::fmt::Debug for ReplayCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplayCounter")
            .field("value", &self.value)
            .field("state", &self.state)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// ============================================
// Tests
// ============================================
