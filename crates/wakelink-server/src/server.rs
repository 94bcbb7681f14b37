// ============================================
// File: crates/wakelink-server/src/server.rs
// ============================================
//! # Server Orchestrator
//!
//! ## Creation Reason
//! Main daemon implementation that wires storage, the secure channel, the
//! Wake-on-LAN sender and the TCP listener together and manages the
//! lifecycle.
//!
//! ## Main Functionality
//! - `Server`: Daemon struct and lifecycle management
//! - `build_handler`: Component initialization and wiring
//! - Accept loop with one task per connection
//! - Graceful shutdown handling
//!
//! ## Server Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Server                              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐                                           │
//! │  │ Accept Task  │──spawn──► connection task (≤ 5 s)         │
//! │  └──────┬───────┘              │ read line                  │
//! │         │                      ▼                            │
//! │         │           ┌──────────────────────┐                │
//! │         │           │    Packet Handler    │                │
//! │         │           └──────────┬───────────┘                │
//! │         │                      ▼                            │
//! │  ┌──────┴─────────────────────────────────────────────┐     │
//! │  │ SecureChannel │ CommandDispatcher │ TokenStore     │     │
//! │  │ FileStorage   │ UdpWakeSender                      │     │
//! │  └────────────────────────────────────────────────────┘     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Port 99 needs CAP_NET_BIND_SERVICE or root
//! - Graceful shutdown waits for the accept task, not for in-flight
//!   connections (each is bounded by the read timeout)
//! - All components are Arc-wrapped for sharing
//!
//! ## Last Modified
//! v0.1.0 - Initial server implementation

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use wakelink_common::{Clock, MonotonicClock};
use wakelink_core::{OsRandom, SecureChannel};
use wakelink_transport::tcp::MAX_REQUEST_LINE;
use wakelink_transport::{LineConnection, LineLimits, PeerInfo, TcpLineListener};
use wakelink_transport::{UdpWakeSender, WakeSender};

use crate::config::ServerConfig;
use crate::error::{Result, ServerError};
use crate::handlers::PacketHandler;
use crate::services::{CommandDispatcher, TokenStore};
use crate::storage::FileStorage;

/// How long shutdown waits for the accept task.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Pause after a failed accept before trying again.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

// ============================================
// Component Wiring
// ============================================

/// Opens storage, provisions the channel and builds the packet handler.
///
/// # Errors
/// Returns error if storage or the token cannot be loaded, or the channel
/// refuses the token.
pub async fn build_handler(
    config: &ServerConfig,
    waker: Arc<dyn WakeSender>,
) -> Result<Arc<PacketHandler>> {
    let storage = FileStorage::open(&config.storage.path, config.storage.capacity)?;
    let clock: Arc<dyn Clock> = Arc::new(MonotonicClock::new());

    let channel = Arc::new(SecureChannel::new(
        config.channel_config(),
        Box::new(storage),
        Arc::new(OsRandom),
        Arc::clone(&clock),
    ));

    let tokens = TokenStore::from_config(&config.device);
    let (token, source) = tokens.resolve(&config.device, &channel).await?;
    channel.initialize(token.expose())?;

    info!(
        device_id = %config.device.device_id,
        token_source = ?source,
        key_mode = %config.crypto.key_mode,
        "Secure channel ready: {}",
        channel.key_info()
    );

    let dispatcher = CommandDispatcher::new(Arc::clone(&channel), waker, clock);
    Ok(Arc::new(PacketHandler::new(channel, dispatcher, tokens)))
}

// ============================================
// Server
// ============================================

/// Main WakeLink device daemon.
///
/// # Lifecycle
/// 1. Create with `Server::new(config)`
/// 2. Start with `server.run().await`
/// 3. Shutdown via Ctrl+C or `server.shutdown()`
pub struct Server {
    /// Daemon configuration.
    config: ServerConfig,
    /// Shutdown flag.
    shutdown: Arc<AtomicBool>,
    /// Shutdown signal sender.
    shutdown_tx: broadcast::Sender<()>,
}

impl Server {
    /// Creates a new server instance.
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            config,
            shutdown: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
        }
    }

    /// Runs the daemon until shutdown.
    ///
    /// # Errors
    /// Returns error if the daemon fails to start.
    pub async fn run(&self) -> Result<()> {
        info!("Starting WakeLink device v{}", env!("CARGO_PKG_VERSION"));

        let waker = UdpWakeSender::bind(self.config.wol_target())
            .await
            .map_err(|e| ServerError::startup_failed(format!("WoL socket failed: {e}")))?;
        let handler = build_handler(&self.config, Arc::new(waker)).await?;
        let listener = self.bind().await?;

        self.serve(listener, handler).await
    }

    /// Binds the configured TCP listener.
    ///
    /// # Errors
    /// Returns `StartupFailed` if the address cannot be bound.
    pub async fn bind(&self) -> Result<TcpLineListener> {
        let limits = LineLimits {
            max_len: MAX_REQUEST_LINE,
            read_timeout: self.config.read_timeout(),
        };
        TcpLineListener::bind(self.config.listen_addr(), limits)
            .await
            .map_err(|e| ServerError::startup_failed(format!("TCP bind failed: {e}")))
    }

    /// Serves connections from `listener` until shutdown.
    ///
    /// # Errors
    /// Currently infallible once started; kept fallible for callers.
    pub async fn serve(&self, listener: TcpLineListener, handler: Arc<PacketHandler>) -> Result<()> {
        info!("Device listening on {}", listener.local_addr());

        let accept_task = self.spawn_accept_task(listener, Arc::clone(&handler));

        info!("Server started successfully");

        self.wait_for_shutdown().await;

        info!("Shutting down server...");
        self.shutdown();

        match tokio::time::timeout(SHUTDOWN_GRACE, accept_task).await {
            Ok(Ok(())) => debug!("Accept task completed"),
            Ok(Err(e)) => warn!("Accept task failed: {}", e),
            Err(_) => warn!("Accept task timed out during shutdown"),
        }

        let stats = handler.stats();
        info!(
            handled = stats.handled,
            rejected = stats.rejected,
            "Server shutdown complete"
        );
        Ok(())
    }

    /// Triggers server shutdown programmatically.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        let _ = self.shutdown_tx.send(());
    }

    /// Returns `true` once shutdown has been requested.
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Spawns the accept loop.
    fn spawn_accept_task(
        &self,
        listener: TcpLineListener,
        handler: Arc<PacketHandler>,
    ) -> JoinHandle<()> {
        let shutdown = Arc::clone(&self.shutdown);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        debug!("Accept task received shutdown signal");
                        break;
                    }
                    result = listener.accept() => {
                        match result {
                            Ok((conn, peer)) => {
                                if shutdown.load(Ordering::SeqCst) {
                                    break;
                                }
                                tokio::spawn(handle_connection(conn, peer, Arc::clone(&handler)));
                            }
                            Err(e) if shutdown.load(Ordering::SeqCst) => {
                                debug!("Accept error during shutdown: {}", e);
                            }
                            Err(e) if e.is_retryable() => {
                                debug!("Transient accept error: {}", e);
                            }
                            Err(e) => {
                                error!("Accept error: {}", e);
                                tokio::time::sleep(ACCEPT_BACKOFF).await;
                            }
                        }
                    }
                }
            }

            debug!("Accept task exiting");
        })
    }

    /// Waits for Ctrl+C or a programmatic shutdown.
    async fn wait_for_shutdown(&self) {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        if self.is_shutting_down() {
            return;
        }

        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                match result {
                    Ok(()) => info!("Received shutdown signal"),
                    Err(e) => {
                        warn!("Failed to listen for Ctrl+C: {}", e);
                        let _ = shutdown_rx.recv().await;
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                debug!("Programmatic shutdown requested");
            }
        }
    }
}

/// Reads one request, replies, closes.
async fn handle_connection(mut conn: LineConnection, peer: PeerInfo, handler: Arc<PacketHandler>) {
    let line = match conn.read_line().await {
        Ok(Some(line)) => line,
        Ok(None) => {
            debug!(peer = %peer.addr, "Empty request, closing");
            let _ = conn.close().await;
            return;
        }
        Err(e) => {
            debug!(peer = %peer.addr, error = %e, "Dropping connection");
            return;
        }
    };

    let reply = handler.handle_line(&line).await;

    if let Err(e) = conn.write_line(&reply).await {
        debug!(peer = %peer.addr, error = %e, "Failed to write reply");
        return;
    }
    if let Err(e) = conn.close().await {
        debug!(peer = %peer.addr, error = %e, "Close error");
    }

    debug!(
        peer = %peer.addr,
        elapsed_ms = u64::try_from(peer.age().as_millis()).unwrap_or(u64::MAX),
        "Request served"
    );
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("listen_addr", &self.config.network.listen_addr)
            .field("device_id", &self.config.device.device_id)
            .finish()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;
    use wakelink_transport::mock::MockWakeSender;
    use wakelink_transport::request_line;

    const TOKEN: &str = "0123456789abcdef0123456789abcdef";

    fn test_config(dir: &std::path::Path) -> ServerConfig {
        let mut config = ServerConfig::default();
        config.network.listen_addr = "127.0.0.1:0".parse().unwrap();
        config.device.token = Some(TOKEN.to_string());
        config.device.token_file = dir.join("token").display().to_string();
        config.storage.path = dir.join("eeprom.bin").display().to_string();
        config
    }

    #[tokio::test]
    async fn test_build_handler_generates_token_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.device.token = None;

        build_handler(&config, Arc::new(MockWakeSender::new())).await.unwrap();
        let saved = std::fs::read_to_string(dir.path().join("token")).unwrap();
        assert_eq!(saved.trim().len(), 96);
        assert!(dir.path().join("eeprom.bin").exists());
    }

    #[tokio::test]
    async fn test_serve_and_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let handler = build_handler(&config, Arc::new(MockWakeSender::new())).await.unwrap();

        let server = Arc::new(Server::new(config));
        let listener = server.bind().await.unwrap();
        let addr = listener.local_addr();

        let task = {
            let server = Arc::clone(&server);
            let handler = Arc::clone(&handler);
            tokio::spawn(async move { server.serve(listener, handler).await })
        };

        let client = SecureChannel::new(
            wakelink_core::ChannelConfig::new("client"),
            Box::new(wakelink_core::MemoryStorage::default()),
            Arc::new(OsRandom),
            Arc::new(MonotonicClock::new()),
        );
        client.initialize(TOKEN).unwrap();

        let sealed = client.encode_command("ping", Map::new()).unwrap();
        let reply_line = request_line(addr, &sealed.wire, Duration::from_secs(2)).await.unwrap();
        let reply = client.decode_response(&reply_line).unwrap();
        assert_eq!(reply["result"], "pong");

        server.shutdown();
        task.await.unwrap().unwrap();
        assert!(server.is_shutting_down());
        assert_eq!(handler.stats().handled, 1);
    }
}
