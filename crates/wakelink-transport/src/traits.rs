// ============================================
// File: crates/wakelink-transport/src/traits.rs
// ============================================
//! # Transport Traits
//!
//! ## Creation Reason
//! Command handlers must send Wake-on-LAN packets without owning a real
//! broadcast socket in tests. The seam lives here.
//!
//! ## Main Functionality
//! - `WakeSender`: Sends a magic packet for a hardware address
//! - `PeerInfo`: Metadata about an accepted connection
//!
//! ## ⚠️ Important Note for Next Developer
//! - Implementations must be Send + Sync; one sender is shared by all
//!   connection tasks
//!
//! ## Last Modified
//! v0.1.0 - Initial trait definitions

use std::net::SocketAddr;
use std::time::Instant;

use async_trait::async_trait;

use wakelink_common::MacAddress;

use crate::error::Result;

// ============================================
// PeerInfo
// ============================================

/// Where a connection came from and when.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerInfo {
    /// Remote address.
    pub addr: SocketAddr,
    /// When the connection was accepted.
    pub accepted_at: Instant,
}

impl PeerInfo {
    /// Creates a `PeerInfo` stamped now.
    #[must_use]
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            accepted_at: Instant::now(),
        }
    }

    /// Returns how long ago the connection was accepted.
    #[must_use]
    pub fn age(&self) -> std::time::Duration {
        self.accepted_at.elapsed()
    }
}

// ============================================
// WakeSender Trait
// ============================================

/// Sends Wake-on-LAN magic packets.
///
/// # Example
/// ```ignore
/// async fn wake<W: WakeSender>(sender: &W, mac: &MacAddress) -> Result<()> {
///     sender.send_magic_packet(mac).await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait WakeSender: Send + Sync {
    /// Sends one magic packet for `mac`.
    ///
    /// # Returns
    /// Number of bytes sent (102 on success).
    ///
    /// # Errors
    /// Returns error if the datagram cannot be sent.
    async fn send_magic_packet(&self, mac: &MacAddress) -> Result<usize>;

    /// Returns the broadcast destination.
    fn target(&self) -> SocketAddr;
}
