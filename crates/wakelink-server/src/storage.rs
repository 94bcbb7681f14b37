// ============================================
// File: crates/wakelink-server/src/storage.rs
// ============================================
//! # File-Backed EEPROM Image
//!
//! ## Creation Reason
//! The replay counter must survive daemon restarts. On the device this is
//! an EEPROM page; here it is a fixed-size image file.
//!
//! ## Main Functionality
//! - `FileStorage`: `NvStorage` over an image file
//!
//! ## Commit Model
//! ```text
//! write() ──► staged buffer (memory)
//! commit() ──► <path>.tmp ──rename──► <path>
//! ```
//! A crash before the rename leaves the previous image intact.
//!
//! ## ⚠️ Important Note for Next Developer
//! - A fresh image is filled with 0xFF, like an erased EEPROM
//! - An image shorter than the configured capacity is padded; a longer one
//!   is refused rather than silently truncated
//! - `commit()` is blocking file I/O and runs under the channel lock on a
//!   runtime worker; keep the image small
//!
//! ## Last Modified
//! v0.1.0 - Initial file storage

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use wakelink_core::error::{CoreError, Result as CoreResult};
use wakelink_core::storage::{check_range, NvStorage, ERASED_BYTE};

use crate::error::{Result, ServerError};

// ============================================
// FileStorage
// ============================================

/// Non-volatile region persisted as an image file.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    staged: Vec<u8>,
}

impl FileStorage {
    /// Opens the image at `path`, creating an erased one if missing.
    ///
    /// # Errors
    /// Returns `StorageImage` if the file cannot be read or created, or is
    /// larger than `capacity`.
    pub fn open(path: impl AsRef<Path>, capacity: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let shown = path.display().to_string();

        let staged = match fs::read(&path) {
            Ok(mut image) => {
                if image.len() > capacity {
                    return Err(ServerError::storage_image(
                        &shown,
                        format!("image is {} bytes, capacity is {capacity}", image.len()),
                    ));
                }
                image.resize(capacity, ERASED_BYTE);
                debug!(path = %shown, capacity, "Storage image loaded");
                image
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let image = vec![ERASED_BYTE; capacity];
                write_image(&path, &image)
                    .map_err(|e| ServerError::storage_image(&shown, e.to_string()))?;
                info!(path = %shown, capacity, "Created erased storage image");
                image
            }
            Err(e) => return Err(ServerError::storage_image(&shown, e.to_string())),
        };

        Ok(Self { path, staged })
    }

    /// Returns the image file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl NvStorage for FileStorage {
    fn capacity(&self) -> usize {
        self.staged.len()
    }

    fn read(&self, offset: usize, buf: &mut [u8]) -> CoreResult<()> {
        check_range("read", offset, buf.len(), self.staged.len())?;
        buf.copy_from_slice(&self.staged[offset..offset + buf.len()]);
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> CoreResult<()> {
        check_range("write", offset, data.len(), self.staged.len())?;
        self.staged[offset..offset + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn commit(&mut self) -> CoreResult<()> {
        write_image(&self.path, &self.staged)
            .map_err(|e| CoreError::storage("commit", e.to_string()))
    }
}

fn write_image(path: &Path, image: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let mut file = fs::File::create(&tmp)?;
    file.write_all(image)?;
    file.sync_all()?;
    drop(file);
    fs::rename(&tmp, path)
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use wakelink_core::counter::{CounterConfig, ReplayCounter};

    #[test]
    fn test_creates_erased_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("eeprom.bin");

        let storage = FileStorage::open(&path, 64).unwrap();
        assert_eq!(storage.capacity(), 64);
        assert_eq!(fs::read(&path).unwrap(), vec![ERASED_BYTE; 64]);
    }

    #[test]
    fn test_uncommitted_writes_are_lost() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eeprom.bin");

        let mut storage = FileStorage::open(&path, 16).unwrap();
        storage.write(0, &[1, 2, 3]).unwrap();
        drop(storage);

        let reopened = FileStorage::open(&path, 16).unwrap();
        let mut buf = [0u8; 3];
        reopened.read(0, &mut buf).unwrap();
        assert_eq!(buf, [ERASED_BYTE; 3]);
    }

    #[test]
    fn test_commit_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eeprom.bin");

        let mut storage = FileStorage::open(&path, 16).unwrap();
        storage.write(4, &[0xAB, 0xCD]).unwrap();
        storage.commit().unwrap();

        let reopened = FileStorage::open(&path, 16).unwrap();
        let mut buf = [0u8; 2];
        reopened.read(4, &mut buf).unwrap();
        assert_eq!(buf, [0xAB, 0xCD]);
        assert!(!dir.path().join("eeprom.bin.tmp").exists());
    }

    #[test]
    fn test_short_image_padded_long_image_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eeprom.bin");

        fs::write(&path, [0u8; 8]).unwrap();
        let storage = FileStorage::open(&path, 16).unwrap();
        let mut buf = [0u8; 16];
        storage.read(0, &mut buf).unwrap();
        assert_eq!(&buf[..8], &[0u8; 8]);
        assert_eq!(&buf[8..], &[ERASED_BYTE; 8]);

        let err = FileStorage::open(&path, 4).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FileStorage::open(dir.path().join("eeprom.bin"), 8).unwrap();
        assert!(storage.write(6, &[0; 4]).is_err());
        let mut buf = [0u8; 9];
        assert!(storage.read(0, &mut buf).is_err());
    }

    #[test]
    fn test_counter_persists_across_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eeprom.bin");
        let config = CounterConfig::default();

        let mut counter = ReplayCounter::new(Box::new(FileStorage::open(&path, 512).unwrap()), config);
        counter.load().unwrap();
        for _ in 0..25 {
            counter.increment().unwrap();
        }
        drop(counter);

        let mut counter = ReplayCounter::new(Box::new(FileStorage::open(&path, 512).unwrap()), config);
        counter.load().unwrap();
        assert_eq!(counter.value(), 20);
    }
}
