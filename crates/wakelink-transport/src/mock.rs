// ============================================
// File: crates/wakelink-transport/src/mock.rs
// ============================================
//! # Mock Wake Sender
//!
//! ## Creation Reason
//! Lets command and server tests assert that a `wake` request produced
//! a magic packet without touching the network.
//!
//! ## Usage in Tests
//! ```
//! use wakelink_common::MacAddress;
//! use wakelink_transport::mock::MockWakeSender;
//! use wakelink_transport::traits::WakeSender;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let sender = MockWakeSender::new();
//! let mac: MacAddress = "AA:BB:CC:DD:EE:FF".parse()?;
//! sender.send_magic_packet(&mac).await?;
//!
//! assert_eq!(sender.take_sent(), vec![mac]);
//! # Ok(())
//! # }
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Testing only; nothing leaves the process
//!
//! ## Last Modified
//! v0.1.0 - Initial mock implementation

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use wakelink_common::types::MAGIC_PACKET_SIZE;
use wakelink_common::MacAddress;

use crate::error::{Result, TransportError};
use crate::traits::WakeSender;
use crate::wol::DEFAULT_WOL_PORT;

// ============================================
// MockWakeSender
// ============================================

/// Records every address it is asked to wake.
#[derive(Debug)]
pub struct MockWakeSender {
    sent: Mutex<Vec<MacAddress>>,
    fail: AtomicBool,
    notify: Notify,
}

impl MockWakeSender {
    /// Creates a mock that succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    /// Makes subsequent sends fail (or succeed again).
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::Release);
    }

    /// Takes the recorded addresses, clearing the log.
    #[must_use]
    pub fn take_sent(&self) -> Vec<MacAddress> {
        std::mem::take(&mut *self.sent.lock())
    }

    /// Returns how many packets were recorded.
    #[must_use]
    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }

    /// Waits until at least one packet has been recorded.
    pub async fn wait_for_send(&self) {
        loop {
            let notified = self.notify.notified();
            if self.sent_count() > 0 {
                return;
            }
            notified.await;
        }
    }
}

impl Default for MockWakeSender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WakeSender for MockWakeSender {
    async fn send_magic_packet(&self, mac: &MacAddress) -> Result<usize> {
        if self.fail.load(Ordering::Acquire) {
            return Err(TransportError::SendFailed {
                dest: self.target(),
                reason: "mock failure".to_string(),
            });
        }
        self.sent.lock().push(*mac);
        self.notify.notify_waiters();
        Ok(MAGIC_PACKET_SIZE)
    }

    fn target(&self) -> SocketAddr {
        SocketAddrV4::new(Ipv4Addr::BROADCAST, DEFAULT_WOL_PORT).into()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_records_and_clears() {
        let sender = MockWakeSender::new();
        let mac: MacAddress = "01:02:03:04:05:06".parse().unwrap();

        assert_eq!(sender.send_magic_packet(&mac).await.unwrap(), 102);
        assert_eq!(sender.sent_count(), 1);
        assert_eq!(sender.take_sent(), vec![mac]);
        assert_eq!(sender.sent_count(), 0);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let sender = MockWakeSender::new();
        sender.set_fail(true);
        let mac: MacAddress = "01:02:03:04:05:06".parse().unwrap();

        assert!(sender.send_magic_packet(&mac).await.is_err());
        assert_eq!(sender.sent_count(), 0);
    }

    #[tokio::test]
    async fn test_wait_for_send() {
        let sender = Arc::new(MockWakeSender::new());
        let waiter = {
            let sender = Arc::clone(&sender);
            tokio::spawn(async move { sender.wait_for_send().await })
        };

        let mac: MacAddress = "01:02:03:04:05:06".parse().unwrap();
        sender.send_magic_packet(&mac).await.unwrap();
        waiter.await.unwrap();
    }
}
