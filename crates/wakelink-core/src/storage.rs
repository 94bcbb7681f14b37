// ============================================
// File: crates/wakelink-core/src/storage.rs
// ============================================
//! # Non-Volatile Storage Abstraction
//!
//! ## Creation Reason
//! The replay counter must survive restarts. Devices keep it in a small
//! byte-addressable EEPROM-style region; this module defines that seam.
//!
//! ## Main Functionality
//! - `NvStorage`: read / write / commit over a fixed-size byte region
//! - `MemoryStorage`: In-memory region with staged writes, used in tests
//!   to simulate power loss and failing commits
//!
//! ## Write Model
//! ```text
//!   write() ──► staged image ──commit()──► durable image
//!                     ▲                          │
//!                     └──── power_cycle() ───────┘
//! ```
//! Writes are invisible after a power cycle until committed.
//!
//! ## ⚠️ Important Note for Next Developer
//! - Offsets are absolute byte positions; callers own the layout
//! - Out-of-range access is an error, never a panic
//!
//! ## Last Modified
//! v0.1.0 - Initial storage abstraction

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{CoreError, Result};

// ============================================
// Constants
// ============================================

/// Default region size, matching the device EEPROM.
pub const DEFAULT_CAPACITY: usize = 512;

/// Value of a never-written byte.
pub const ERASED_BYTE: u8 = 0xFF;

// ============================================
// NvStorage Trait
// ============================================

/// Byte-addressable persistent region.
pub trait NvStorage: Send {
    /// Returns the region size in bytes.
    fn capacity(&self) -> usize;

    /// Reads `buf.len()` bytes starting at `offset`.
    ///
    /// # Errors
    /// Returns `Storage` if the range is outside the region or the
    /// backing medium fails.
    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<()>;

    /// Stages `data` at `offset`. Not durable until [`commit`](Self::commit).
    ///
    /// # Errors
    /// Returns `Storage` if the range is outside the region.
    fn write(&mut self, offset: usize, data: &[u8]) -> Result<()>;

    /// Makes all staged writes durable.
    ///
    /// # Errors
    /// Returns `Storage` if the backing medium rejects the commit.
    fn commit(&mut self) -> Result<()>;
}

/// Validates that `[offset, offset + len)` lies inside `capacity`.
///
/// # Errors
/// Returns `Storage` naming `operation` when the range does not fit.
pub fn check_range(
    operation: &'static str,
    offset: usize,
    len: usize,
    capacity: usize,
) -> Result<()> {
    match offset.checked_add(len) {
        Some(end) if end <= capacity => Ok(()),
        _ => Err(CoreError::storage(
            operation,
            format!("range {offset}+{len} outside {capacity}-byte region"),
        )),
    }
}

// ============================================
// MemoryStorage
// ============================================

#[derive(Debug)]
struct MemoryInner {
    staged: Vec<u8>,
    durable: Vec<u8>,
    fail_commits: bool,
    commits: usize,
}

/// In-memory region with separate staged and durable images.
///
/// Clones share the same region, so a test can keep a handle after
/// moving one into a counter.
///
/// # Example
/// ```
/// use wakelink_core::storage::{MemoryStorage, NvStorage};
///
/// let mut storage = MemoryStorage::new(16);
/// storage.write(0, &[1, 2, 3]).unwrap();
/// storage.power_cycle();
///
/// let mut buf = [0u8; 3];
/// storage.read(0, &mut buf).unwrap();
/// assert_eq!(buf, [0xFF; 3]);
/// ```
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryStorage {
    /// Creates an erased region of `capacity` bytes.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryInner {
                staged: vec![ERASED_BYTE; capacity],
                durable: vec![ERASED_BYTE; capacity],
                fail_commits: false,
                commits: 0,
            })),
        }
    }

    /// Discards staged writes, as if power was lost.
    pub fn power_cycle(&self) {
        let mut inner = self.inner.lock();
        inner.staged = inner.durable.clone();
    }

    /// Makes subsequent commits fail (or succeed again).
    pub fn set_fail_commits(&self, fail: bool) {
        self.inner.lock().fail_commits = fail;
    }

    /// Returns how many commits succeeded.
    #[must_use]
    pub fn commit_count(&self) -> usize {
        self.inner.lock().commits
    }

    /// Returns a copy of the durable image.
    #[must_use]
    pub fn durable_image(&self) -> Vec<u8> {
        self.inner.lock().durable.clone()
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl NvStorage for MemoryStorage {
    fn capacity(&self) -> usize {
        self.inner.lock().staged.len()
    }

    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<()> {
        let inner = self.inner.lock();
        check_range("read", offset, buf.len(), inner.staged.len())?;
        buf.copy_from_slice(&inner.staged[offset..offset + buf.len()]);
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<()> {
        let mut inner = self.inner.lock();
        check_range("write", offset, data.len(), inner.staged.len())?;
        inner.staged[offset..offset + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.fail_commits {
            return Err(CoreError::storage("commit", "simulated medium failure"));
        }
        inner.durable = inner.staged.clone();
        inner.commits += 1;
        Ok(())
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_region_is_erased() {
        let storage = MemoryStorage::new(8);
        let mut buf = [0u8; 8];
        storage.read(0, &mut buf).unwrap();
        assert_eq!(buf, [ERASED_BYTE; 8]);
    }

    #[test]
    fn test_commit_survives_power_cycle() {
        let mut storage = MemoryStorage::new(8);
        storage.write(2, &[9, 9]).unwrap();
        storage.commit().unwrap();
        storage.write(2, &[7, 7]).unwrap();
        storage.power_cycle();

        let mut buf = [0u8; 2];
        storage.read(2, &mut buf).unwrap();
        assert_eq!(buf, [9, 9]);
        assert_eq!(storage.commit_count(), 1);
    }

    #[test]
    fn test_failed_commit_keeps_old_image() {
        let mut storage = MemoryStorage::new(4);
        storage.set_fail_commits(true);
        storage.write(0, &[1]).unwrap();

        assert!(matches!(storage.commit(), Err(CoreError::Storage { operation: "commit", .. })));
        assert_eq!(storage.durable_image(), vec![ERASED_BYTE; 4]);
    }

    #[test]
    fn test_out_of_range_access() {
        let mut storage = MemoryStorage::new(4);
        let mut buf = [0u8; 2];
        assert!(storage.read(3, &mut buf).is_err());
        assert!(storage.write(4, &[1]).is_err());
        assert!(storage.write(usize::MAX, &[1]).is_err());
    }

    #[test]
    fn test_clones_share_region() {
        let mut a = MemoryStorage::new(4);
        let b = a.clone();
        a.write(0, &[42]).unwrap();

        let mut buf = [0u8; 1];
        b.read(0, &mut buf).unwrap();
        assert_eq!(buf, [42]);
    }
}
