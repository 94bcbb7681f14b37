// ============================================
// File: crates/wakelink-common/src/time.rs
// ============================================
//! # Time Utilities
//!
//! ## Creation Reason
//! Command envelopes carry a millisecond timestamp taken from device
//! uptime, and the `info` command reports uptime. Both read time through
//! the `Clock` trait so tests can pin the value.
//!
//! ## Main Functionality
//! - `Clock`: Millisecond clock abstraction
//! - `MonotonicClock`: Milliseconds since process start
//! - `ManualClock`: Settable clock for tests
//! - `unix_timestamp_millis`: Wall-clock helper
//!
//! ## ⚠️ Important Note for Next Developer
//! - Envelope timestamps are uptime, not wall-clock time; peers never
//!   compare them against their own clock
//! - `MonotonicClock` shares one reference instant per process
//!
//! ## Last Modified
//! v0.1.0 - Initial time utilities

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

// ============================================
// Clock
// ============================================

/// Source of millisecond timestamps.
pub trait Clock: Send + Sync {
    /// Returns the current time in milliseconds.
    fn now_millis(&self) -> u64;
}

// ============================================
// MonotonicClock
// ============================================

/// Milliseconds elapsed since the process first touched the clock.
///
/// # Example
/// ```
/// use wakelink_common::time::{Clock, MonotonicClock};
///
/// let clock = MonotonicClock::new();
/// let a = clock.now_millis();
/// let b = clock.now_millis();
/// assert!(b >= a);
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl MonotonicClock {
    /// Creates the clock and pins the process reference instant.
    #[must_use]
    pub fn new() -> Self {
        let _ = Self::reference();
        Self
    }

    fn reference() -> Instant {
        static REFERENCE: OnceLock<Instant> = OnceLock::new();
        *REFERENCE.get_or_init(Instant::now)
    }
}

impl Clock for MonotonicClock {
    fn now_millis(&self) -> u64 {
        u64::try_from(Self::reference().elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

// ============================================
// ManualClock
// ============================================

/// Clock whose value only changes when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicU64,
}

impl ManualClock {
    /// Creates a clock reading `millis`.
    #[must_use]
    pub const fn new(millis: u64) -> Self {
        Self {
            millis: AtomicU64::new(millis),
        }
    }

    /// Sets the current reading.
    pub fn set(&self, millis: u64) {
        self.millis.store(millis, Ordering::Relaxed);
    }

    /// Moves the clock forward by `millis`.
    pub fn advance(&self, millis: u64) {
        self.millis.fetch_add(millis, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.millis.load(Ordering::Relaxed)
    }
}

// ============================================
// Utility Functions
// ============================================

/// Returns the current Unix timestamp in milliseconds.
///
/// A system clock set before 1970 reads as zero.
#[must_use]
pub fn unix_timestamp_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_monotonic_clock_advances() {
        let clock = MonotonicClock::new();
        let before = clock.now_millis();
        thread::sleep(Duration::from_millis(15));
        let after = clock.now_millis();

        assert!(after >= before + 10);
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(1_000);
        assert_eq!(clock.now_millis(), 1_000);

        clock.advance(250);
        assert_eq!(clock.now_millis(), 1_250);

        clock.set(7);
        assert_eq!(clock.now_millis(), 7);
    }

    #[test]
    fn test_unix_timestamp_millis_is_recent() {
        // 2020-01-01 in milliseconds
        assert!(unix_timestamp_millis() > 1_577_836_800_000);
    }
}
