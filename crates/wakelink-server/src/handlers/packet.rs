// ============================================
// File: crates/wakelink-server/src/handlers/packet.rs
// ============================================
//! # Packet Handler
//!
//! ## Creation Reason
//! Turns one request line into one reply line: open the envelope, run the
//! command, seal the answer.
//!
//! ## Packet Processing
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  1. decode_incoming(line)                                   │
//! │     signature → limit → frame → decrypt → counter++         │
//! │        │ failure                                            │
//! │        └──► {"status":"error","error":TOKEN,                │
//! │              "request_id":null}  sealed (or plain JSON if   │
//! │              the channel has no keys)                       │
//! │                                                             │
//! │  2. CommandDispatcher::dispatch                             │
//! │                                                             │
//! │  3. reply["request_id"] = request_id or "unknown"           │
//! │                                                             │
//! │  4. encode_response(reply)      ◄── still the OLD key       │
//! │                                                             │
//! │  5. post action (update_token): rotate channel, save token  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Step 4 must happen before step 5
//! - Log security events (bad signature, exhausted window) at warn, the
//!   rest at debug to avoid log flooding
//!
//! ## Last Modified
//! v0.1.0 - Initial packet handler

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use wakelink_core::{CoreError, SecureChannel};

use crate::services::{CommandDispatcher, PostAction, TokenStore};

// ============================================
// HandlerStats
// ============================================

/// Counters exposed for shutdown logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandlerStats {
    /// Requests that reached a command.
    pub handled: u64,
    /// Requests rejected before dispatch.
    pub rejected: u64,
}

// ============================================
// PacketHandler
// ============================================

/// Processes request lines.
///
/// # Thread Safety
/// All operations are thread-safe and can be called concurrently.
pub struct PacketHandler {
    channel: Arc<SecureChannel>,
    dispatcher: CommandDispatcher,
    tokens: TokenStore,
    handled: AtomicU64,
    rejected: AtomicU64,
}

impl PacketHandler {
    /// Creates a new packet handler.
    pub fn new(channel: Arc<SecureChannel>, dispatcher: CommandDispatcher, tokens: TokenStore) -> Self {
        Self {
            channel,
            dispatcher,
            tokens,
            handled: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    /// Processes one request line and returns the reply line.
    pub async fn handle_line(&self, line: &str) -> String {
        let incoming = match self.channel.decode_incoming(line) {
            Ok(incoming) => incoming,
            Err(e) => return self.reject(&e),
        };
        self.handled.fetch_add(1, Ordering::Relaxed);

        let outcome = self.dispatcher.dispatch(&incoming).await;
        let mut reply = outcome.reply;
        reply.insert(
            "request_id".to_string(),
            Value::String(incoming.reply_request_id().to_string()),
        );
        let reply = Value::Object(reply);

        let wire = match self.channel.encode_response(&reply) {
            Ok(wire) => wire,
            Err(e) => {
                error!(error = %e, command = %incoming.command, "Failed to seal reply");
                plain_error(&e, Value::String(incoming.reply_request_id().to_string()))
            }
        };

        if let Some(post) = outcome.post {
            self.apply(post).await;
        }

        wire
    }

    /// Returns request counters.
    #[must_use]
    pub fn stats(&self) -> HandlerStats {
        HandlerStats {
            handled: self.handled.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }

    fn reject(&self, err: &CoreError) -> String {
        self.rejected.fetch_add(1, Ordering::Relaxed);

        if err.is_suspicious() {
            warn!(error = %err, token = err.token(), "Security event: request rejected");
        } else {
            debug!(error = %err, token = err.token(), "Request rejected");
        }

        let reply = json!({
            "status": "error",
            "error": err.reply_error(),
            "request_id": Value::Null,
        });

        match self.channel.encode_response(&reply) {
            Ok(wire) => wire,
            Err(_) => reply.to_string(),
        }
    }

    async fn apply(&self, post: PostAction) {
        match post {
            PostAction::RotateToken(token) => {
                if let Err(e) = self.channel.rotate(token.expose()) {
                    error!(error = %e, "Token rotation failed; old token stays active");
                    return;
                }
                if let Err(e) = self.tokens.save(&token).await {
                    error!(error = %e, "New token is active but was not saved");
                }
                info!("Device token updated by command");
            }
        }
    }
}

fn plain_error(err: &CoreError, request_id: Value) -> String {
    json!({
        "status": "error",
        "error": err.reply_error(),
        "request_id": request_id,
    })
    .to_string()
}

impl std::fmt::Debug for PacketHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketHandler")
            .field("device_id", &self.channel.device_id())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;
    use wakelink_common::ManualClock;
    use wakelink_core::{ChannelConfig, MemoryStorage, SeededRandom};
    use wakelink_transport::mock::MockWakeSender;

    const TOKEN: &str = "0123456789abcdef0123456789abcdef";

    fn channel(device_id: &str, seed: u64) -> Arc<SecureChannel> {
        Arc::new(SecureChannel::new(
            ChannelConfig::new(device_id),
            Box::new(MemoryStorage::default()),
            Arc::new(SeededRandom::new(seed)),
            Arc::new(ManualClock::new(0)),
        ))
    }

    struct Fixture {
        handler: PacketHandler,
        device: Arc<SecureChannel>,
        client: Arc<SecureChannel>,
        waker: Arc<MockWakeSender>,
        _dir: tempfile::TempDir,
        token_path: std::path::PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let token_path = dir.path().join("token");
        let device = channel("WL-TEST", 1);
        device.initialize(TOKEN).unwrap();
        let client = channel("client", 2);
        client.initialize(TOKEN).unwrap();

        let waker = Arc::new(MockWakeSender::new());
        let dispatcher = CommandDispatcher::new(
            device.clone(),
            waker.clone(),
            Arc::new(ManualClock::new(0)),
        );
        let handler = PacketHandler::new(device.clone(), dispatcher, TokenStore::new(&token_path));
        Fixture {
            handler,
            device,
            client,
            waker,
            _dir: dir,
            token_path,
        }
    }

    #[tokio::test]
    async fn test_ping_round_trip() {
        let f = fixture();
        let sealed = f.client.encode_command("ping", Map::new()).unwrap();

        let wire = f.handler.handle_line(&sealed.wire).await;
        let reply = f.client.decode_response(&wire).unwrap();

        assert_eq!(reply["status"], "success");
        assert_eq!(reply["result"], "pong");
        assert_eq!(reply["request_id"], sealed.request_id.as_str());
        assert_eq!(f.handler.stats(), HandlerStats { handled: 1, rejected: 0 });
    }

    #[tokio::test]
    async fn test_wake_through_handler() {
        let f = fixture();
        let mut data = Map::new();
        data.insert("mac".to_string(), json!("AA:BB:CC:DD:EE:FF"));
        let sealed = f.client.encode_command("wake", data).unwrap();

        let reply = f
            .client
            .decode_response(&f.handler.handle_line(&sealed.wire).await)
            .unwrap();
        assert_eq!(reply["result"], "wol_sent");
        assert_eq!(f.waker.sent_count(), 1);
    }

    #[tokio::test]
    async fn test_bad_signature_gets_sealed_error() {
        let f = fixture();
        let sealed = f.client.encode_command("ping", Map::new()).unwrap();
        let mut outer: Value = serde_json::from_str(&sealed.wire).unwrap();
        outer["signature"] = json!("00".repeat(32));

        let wire = f.handler.handle_line(&outer.to_string()).await;
        let reply = f.client.decode_response(&wire).unwrap();

        assert_eq!(reply["status"], "error");
        assert_eq!(reply["error"], "INVALID_SIGNATURE");
        assert!(reply["request_id"].is_null());
        assert_eq!(f.device.request_count(), 0);
        assert_eq!(f.handler.stats().rejected, 1);
    }

    #[tokio::test]
    async fn test_garbage_line() {
        let f = fixture();
        let wire = f.handler.handle_line("not json").await;
        let reply = f.client.decode_response(&wire).unwrap();
        assert_eq!(reply["error"], "JSON_PARSE");
    }

    #[tokio::test]
    async fn test_uninitialized_device_replies_plain() {
        let device = channel("WL-TEST", 3);
        let dispatcher = CommandDispatcher::new(
            device.clone(),
            Arc::new(MockWakeSender::new()),
            Arc::new(ManualClock::new(0)),
        );
        let handler = PacketHandler::new(device, dispatcher, TokenStore::new("/nonexistent/token"));

        let client = channel("client", 4);
        client.initialize(TOKEN).unwrap();
        let sealed = client.encode_command("ping", Map::new()).unwrap();

        let wire = handler.handle_line(&sealed.wire).await;
        let reply: Value = serde_json::from_str(&wire).unwrap();
        assert_eq!(reply["status"], "error");
        assert_eq!(reply["error"], "ERROR:CRYPTO_DISABLED");
    }

    #[tokio::test]
    async fn test_update_token_reply_readable_with_old_key() {
        let f = fixture();
        let sealed = f.client.encode_command("update_token", Map::new()).unwrap();

        let wire = f.handler.handle_line(&sealed.wire).await;
        let reply = f.client.decode_response(&wire).unwrap();
        assert_eq!(reply["result"], "token_updated");
        let new_token = reply["new_token"].as_str().unwrap().to_string();

        // Old key no longer accepted.
        let stale = f.client.encode_command("ping", Map::new()).unwrap();
        let rejected = f.handler.handle_line(&stale.wire).await;
        assert!(f.client.decode_response(&rejected).is_err());

        // New key works and the counter restarted.
        f.client.rotate(&new_token).unwrap();
        let fresh = f.client.encode_command("counter_info", Map::new()).unwrap();
        let reply = f
            .client
            .decode_response(&f.handler.handle_line(&fresh.wire).await)
            .unwrap();
        assert_eq!(reply["requests"], 1);

        let saved = std::fs::read_to_string(&f.token_path).unwrap();
        assert_eq!(saved.trim(), new_token);
    }
}
