// ============================================
// File: crates/wakelink-transport/src/wol.rs
// ============================================
//! # Wake-on-LAN Sender
//!
//! ## Creation Reason
//! The `wake` command ends in a single UDP broadcast. This module owns
//! that socket.
//!
//! ## Main Functionality
//! - `UdpWakeSender`: Broadcast-enabled UDP socket bound to an ephemeral port
//!
//! ## Magic Packet
//! ```text
//! ┌──────────────────┬──────────────────────────────────────┐
//! │ FF FF FF FF FF FF│ MAC × 16                             │
//! └──────────────────┴──────────────────────────────────────┘
//!        6 bytes                 96 bytes
//! ```
//!
//! ## Design Choices
//! - SO_BROADCAST set before bind so 255.255.255.255 is reachable
//! - SO_REUSEADDR for quick restarts
//!
//! ## ⚠️ Important Note for Next Developer
//! - UDP gives no delivery guarantee; success means "handed to the kernel"
//! - Directed broadcasts (e.g. 192.168.1.255) also work if configured
//!
//! ## Last Modified
//! v0.1.0 - Initial Wake-on-LAN sender

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use async_trait::async_trait;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tracing::{debug, info};

use wakelink_common::MacAddress;

use crate::error::{Result, TransportError};
use crate::traits::WakeSender;

// ============================================
// Constants
// ============================================

/// Conventional Wake-on-LAN port.
pub const DEFAULT_WOL_PORT: u16 = 9;

/// Limited broadcast address.
pub const DEFAULT_BROADCAST: Ipv4Addr = Ipv4Addr::BROADCAST;

// ============================================
// UdpWakeSender
// ============================================

/// Sends magic packets over a broadcast UDP socket.
///
/// # Example
/// ```ignore
/// use wakelink_transport::UdpWakeSender;
///
/// let sender = UdpWakeSender::bind("255.255.255.255:9".parse()?).await?;
/// sender.send_magic_packet(&"AA:BB:CC:DD:EE:FF".parse()?).await?;
/// ```
pub struct UdpWakeSender {
    socket: UdpSocket,
    target: SocketAddr,
}

impl UdpWakeSender {
    /// Creates a sender for `target` bound to an ephemeral local port.
    ///
    /// # Errors
    /// Returns an `Io` error if the socket cannot be created or bound.
    pub async fn bind(target: SocketAddr) -> Result<Self> {
        let local: SocketAddr = if target.is_ipv4() {
            SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            "[::]:0".parse().map_err(|_| TransportError::InvalidAddress {
                addr: "[::]:0".to_string(),
            })?
        };
        Self::bind_local(local, target).await
    }

    /// Creates a sender for `target` bound to `local`.
    ///
    /// # Errors
    /// Returns an `Io` error if the socket cannot be created or bound.
    pub async fn bind_local(local: SocketAddr, target: SocketAddr) -> Result<Self> {
        let socket = Socket::new(Domain::for_address(local), Type::DGRAM, Some(Protocol::UDP))
            .map_err(|e| TransportError::io("creating WoL socket", e))?;

        socket
            .set_reuse_address(true)
            .map_err(|e| TransportError::io("setting SO_REUSEADDR", e))?;
        socket
            .set_broadcast(true)
            .map_err(|e| TransportError::io("setting SO_BROADCAST", e))?;
        socket
            .set_nonblocking(true)
            .map_err(|e| TransportError::io("setting non-blocking", e))?;
        socket
            .bind(&local.into())
            .map_err(|e| TransportError::bind_failed(local, e.to_string()))?;

        let std_socket: std::net::UdpSocket = socket.into();
        let socket = UdpSocket::from_std(std_socket)
            .map_err(|e| TransportError::io("converting to Tokio socket", e))?;

        info!(%target, "Wake-on-LAN sender ready");
        Ok(Self { socket, target })
    }

    /// Returns the local socket address.
    ///
    /// # Errors
    /// Returns an `Io` error if the OS cannot report it.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket
            .local_addr()
            .map_err(|e| TransportError::io("getting local address", e))
    }
}

#[async_trait]
impl WakeSender for UdpWakeSender {
    async fn send_magic_packet(&self, mac: &MacAddress) -> Result<usize> {
        let packet = mac.magic_packet();
        let sent = self
            .socket
            .send_to(&packet, self.target)
            .await
            .map_err(|e| TransportError::SendFailed {
                dest: self.target,
                reason: e.to_string(),
            })?;

        debug!(%mac, target = %self.target, bytes = sent, "Magic packet sent");
        Ok(sent)
    }

    fn target(&self) -> SocketAddr {
        self.target
    }
}

impl std::fmt::Debug for UdpWakeSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UdpWakeSender")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use wakelink_common::types::MAGIC_PACKET_SIZE;

    #[tokio::test]
    async fn test_magic_packet_on_the_wire() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let target = receiver.local_addr().unwrap();

        let sender = UdpWakeSender::bind_local("127.0.0.1:0".parse().unwrap(), target)
            .await
            .unwrap();
        let mac: MacAddress = "AA:BB:CC:DD:EE:FF".parse().unwrap();
        let sent = sender.send_magic_packet(&mac).await.unwrap();
        assert_eq!(sent, MAGIC_PACKET_SIZE);

        let mut buf = [0u8; 256];
        let (len, _) = receiver.recv_from(&mut buf).await.unwrap();
        assert_eq!(len, MAGIC_PACKET_SIZE);
        assert_eq!(&buf[..6], &[0xFF; 6]);
        for rep in buf[6..len].chunks(6) {
            assert_eq!(rep, &[0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
        }
    }

    #[tokio::test]
    async fn test_target_reported() {
        let target: SocketAddr = "127.0.0.1:9".parse().unwrap();
        let sender = UdpWakeSender::bind(target).await.unwrap();
        assert_eq!(sender.target(), target);
        assert!(sender.local_addr().unwrap().port() > 0);
    }
}
