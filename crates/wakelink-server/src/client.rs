// ============================================
// File: crates/wakelink-server/src/client.rs
// ============================================
//! # Device Client
//!
//! Sends one sealed command to a device over TCP and opens the reply.
//! Used by the `send` subcommand and the integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use wakelink_common::MonotonicClock;
use wakelink_core::counter::CounterConfig;
use wakelink_core::crypto::KeyMode;
use wakelink_core::{ChannelConfig, MemoryStorage, OsRandom, SecureChannel};
use wakelink_transport::request_line;

use crate::error::{Result, ServerError};

/// Default connect/reply timeout.
pub const DEFAULT_CLIENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client half of a device channel bound to one device address.
pub struct DeviceClient {
    addr: SocketAddr,
    channel: SecureChannel,
    timeout: Duration,
}

impl DeviceClient {
    /// Creates a client for the device at `addr`.
    ///
    /// The client keeps no persistent replay window; its counter is
    /// in-memory and effectively unbounded.
    ///
    /// # Errors
    /// Returns `Core(TokenTooShort)` for a short token.
    pub fn new(addr: SocketAddr, device_id: &str, token: &str, key_mode: KeyMode) -> Result<Self> {
        let config = ChannelConfig {
            device_id: device_id.to_string(),
            key_mode,
            counter: CounterConfig {
                limit: u32::MAX,
                ..CounterConfig::default()
            },
        };
        let channel = SecureChannel::new(
            config,
            Box::new(MemoryStorage::default()),
            Arc::new(OsRandom),
            Arc::new(MonotonicClock::new()),
        );
        channel.initialize(token)?;

        Ok(Self {
            addr,
            channel,
            timeout: DEFAULT_CLIENT_TIMEOUT,
        })
    }

    /// Sets the connect and reply timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the device address.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Sends `command` and returns the decrypted reply object.
    ///
    /// A plain (unsealed) error reply from a device without keys is
    /// surfaced as `DeviceError`.
    ///
    /// # Errors
    /// Transport failures, or any envelope/decrypt rejection of the reply.
    pub async fn send(&self, command: &str, data: Map<String, Value>) -> Result<Map<String, Value>> {
        let sealed = self.channel.encode_command(command, data)?;
        debug!(command, request_id = %sealed.request_id, addr = %self.addr, "Sending command");

        let line = request_line(self.addr, &sealed.wire, self.timeout).await?;

        let reply = match self.channel.decode_response(&line) {
            Ok(reply) => reply,
            Err(e) => return Err(plain_device_error(&line).unwrap_or(ServerError::Core(e))),
        };

        match reply.get("request_id").and_then(Value::as_str) {
            Some(id) if id == sealed.request_id.as_str() => {}
            Some(id) => warn!(expected = %sealed.request_id, got = id, "Reply request_id mismatch"),
            None => debug!("Reply carries no request_id"),
        }

        Ok(reply)
    }

    /// Switches to a new token, e.g. after `update_token`.
    ///
    /// # Errors
    /// Returns `Core(TokenTooShort)` for a short token.
    pub fn rotate(&self, token: &str) -> Result<()> {
        self.channel.rotate(token)?;
        Ok(())
    }
}

fn plain_device_error(line: &str) -> Option<ServerError> {
    let value: Value = serde_json::from_str(line).ok()?;
    if value.get("payload").is_some() {
        return None;
    }
    let error = value.get("error")?.as_str()?;
    Some(ServerError::DeviceError {
        error: error.to_string(),
    })
}

impl std::fmt::Debug for DeviceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceClient")
            .field("addr", &self.addr)
            .field("device_id", &self.channel.device_id())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;

    const TOKEN: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_short_token_rejected() {
        let addr = "127.0.0.1:99".parse().unwrap();
        let err = DeviceClient::new(addr, "WL-1", "short", KeyMode::Shared).unwrap_err();
        assert!(matches!(err, ServerError::Core(_)));
    }

    #[test]
    fn test_builder_accessors() {
        let addr = "192.168.1.50:99".parse().unwrap();
        let client = DeviceClient::new(addr, "WL-1", TOKEN, KeyMode::Shared)
            .unwrap()
            .with_timeout(Duration::from_millis(250));
        assert_eq!(client.addr(), addr);
        assert!(format!("{client:?}").contains("250ms"));
    }

    #[test]
    fn test_plain_error_detection() {
        let plain = r#"{"status":"error","error":"ERROR:CRYPTO_DISABLED","request_id":null}"#;
        assert!(matches!(
            plain_device_error(plain),
            Some(ServerError::DeviceError { ref error }) if error == "ERROR:CRYPTO_DISABLED"
        ));
        assert!(plain_device_error(r#"{"payload":"00","error":"x"}"#).is_none());
        assert!(plain_device_error("garbage").is_none());
    }

    #[tokio::test]
    async fn test_plain_reply_surfaces_device_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (read, mut write) = stream.into_split();
            let mut line = String::new();
            BufReader::new(read).read_line(&mut line).await.unwrap();
            write
                .write_all(b"{\"status\":\"error\",\"error\":\"ERROR:CRYPTO_DISABLED\",\"request_id\":null}\n")
                .await
                .unwrap();
        });

        let client = DeviceClient::new(addr, "WL-1", TOKEN, KeyMode::Shared)
            .unwrap()
            .with_timeout(Duration::from_secs(2));
        let err = client.send("ping", Map::new()).await.unwrap_err();
        assert!(matches!(err, ServerError::DeviceError { .. }));
    }
}
