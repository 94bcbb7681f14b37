// ============================================
// File: crates/wakelink-server/src/services/commands.rs
// ============================================
//! # Command Dispatcher
//!
//! ## Creation Reason
//! Maps a decrypted inner envelope to the device action it names and
//! builds the reply object.
//!
//! ## Main Functionality
//! - `Command`: The commands this device understands
//! - `CommandDispatcher`: Executes one command
//! - `CommandOutcome`: Reply plus any action that must wait until the
//!   reply has been sealed
//!
//! ## Command Table
//! ```text
//! ┌────────────────┬───────────────────────────────────────────────┐
//! │ ping           │ result: pong                                  │
//! │ wake           │ data.mac → magic packet; result: wol_sent     │
//! │ info           │ device_id, requests, crypto_enabled, uptime   │
//! │ crypto_info    │ enabled, requests, limit, key_info            │
//! │ counter_info   │ requests, limit                               │
//! │ reset_counter  │ result: counter_reset                         │
//! │ update_token   │ result: token_updated, new_token              │
//! │ (other)        │ error: UNKNOWN_COMMAND                        │
//! └────────────────┴───────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - `update_token` must NOT rotate the channel here; the reply has to be
//!   sealed with the old key or the client can never read it
//! - Replies never include `request_id`; the packet handler adds it
//!
//! ## Last Modified
//! v0.1.0 - Initial command set

use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use wakelink_common::{Clock, MacAddress};
use wakelink_core::crypto::DeviceToken;
use wakelink_core::{IncomingCommand, SecureChannel};
use wakelink_transport::WakeSender;

// ============================================
// Command
// ============================================

/// Commands accepted inside an inner envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Liveness check.
    Ping,
    /// Send a Wake-on-LAN packet.
    Wake,
    /// Device diagnostics.
    Info,
    /// Crypto status.
    CryptoInfo,
    /// Replay counter status.
    CounterInfo,
    /// Open a fresh replay window.
    ResetCounter,
    /// Replace the device token.
    UpdateToken,
}

impl Command {
    /// Looks up a command by its wire name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "ping" => Some(Self::Ping),
            "wake" => Some(Self::Wake),
            "info" => Some(Self::Info),
            "crypto_info" => Some(Self::CryptoInfo),
            "counter_info" => Some(Self::CounterInfo),
            "reset_counter" => Some(Self::ResetCounter),
            "update_token" => Some(Self::UpdateToken),
            _ => None,
        }
    }

    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::Wake => "wake",
            Self::Info => "info",
            Self::CryptoInfo => "crypto_info",
            Self::CounterInfo => "counter_info",
            Self::ResetCounter => "reset_counter",
            Self::UpdateToken => "update_token",
        }
    }
}

// ============================================
// CommandOutcome
// ============================================

/// Work to do after the reply is sealed.
#[derive(Debug)]
pub enum PostAction {
    /// Install and persist this token.
    RotateToken(DeviceToken),
}

/// Result of executing one command.
#[derive(Debug)]
pub struct CommandOutcome {
    /// Reply object, without `request_id`.
    pub reply: Map<String, Value>,
    /// Deferred action, if any.
    pub post: Option<PostAction>,
}

impl CommandOutcome {
    fn reply(value: Value) -> Self {
        let reply = match value {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self { reply, post: None }
    }

    fn error(error: &str) -> Self {
        Self::reply(json!({ "status": "error", "error": error }))
    }

    /// Returns `true` if the reply reports success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.reply.get("status").and_then(Value::as_str) == Some("success")
    }
}

// ============================================
// CommandDispatcher
// ============================================

/// Executes commands against the device.
pub struct CommandDispatcher {
    channel: Arc<SecureChannel>,
    waker: Arc<dyn WakeSender>,
    clock: Arc<dyn Clock>,
}

impl CommandDispatcher {
    /// Creates a dispatcher.
    pub fn new(
        channel: Arc<SecureChannel>,
        waker: Arc<dyn WakeSender>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            channel,
            waker,
            clock,
        }
    }

    /// Executes `incoming` and returns its reply.
    pub async fn dispatch(&self, incoming: &IncomingCommand) -> CommandOutcome {
        let Some(command) = Command::parse(&incoming.command) else {
            warn!(command = %incoming.command, "Unknown command");
            return CommandOutcome::reply(json!({
                "status": "error",
                "error": "UNKNOWN_COMMAND",
                "command": incoming.command,
            }));
        };

        debug!(command = command.as_str(), request_id = incoming.reply_request_id(), "Executing");

        match command {
            Command::Ping => CommandOutcome::reply(json!({
                "status": "success",
                "result": "pong",
            })),
            Command::Wake => self.wake(&incoming.data).await,
            Command::Info => self.info(),
            Command::CryptoInfo => CommandOutcome::reply(json!({
                "status": "success",
                "enabled": self.channel.is_initialized(),
                "requests": self.channel.request_count(),
                "limit": self.channel.request_limit(),
                "key_info": self.channel.key_info(),
            })),
            Command::CounterInfo => CommandOutcome::reply(json!({
                "status": "success",
                "requests": self.channel.request_count(),
                "limit": self.channel.request_limit(),
            })),
            Command::ResetCounter => self.reset_counter(),
            Command::UpdateToken => self.update_token(),
        }
    }

    // ========================================
    // Handlers
    // ========================================

    async fn wake(&self, data: &Map<String, Value>) -> CommandOutcome {
        let Some(raw) = data.get("mac").and_then(Value::as_str) else {
            return CommandOutcome::error("MAC_ADDRESS_REQUIRED");
        };

        let mac: MacAddress = match raw.parse() {
            Ok(mac) => mac,
            Err(e) => {
                debug!(mac = raw, error = %e, "Rejected MAC address");
                return CommandOutcome::error("INVALID_MAC");
            }
        };

        match self.waker.send_magic_packet(&mac).await {
            Ok(_) => {
                info!(%mac, target = %self.waker.target(), "Wake-on-LAN packet sent");
                CommandOutcome::reply(json!({
                    "status": "success",
                    "result": "wol_sent",
                    "mac": raw,
                }))
            }
            Err(e) => {
                warn!(%mac, error = %e, "Wake-on-LAN send failed");
                CommandOutcome::error("WOL_SEND_FAILED")
            }
        }
    }

    fn info(&self) -> CommandOutcome {
        CommandOutcome::reply(json!({
            "status": "success",
            "device_id": self.channel.device_id(),
            "requests": self.channel.request_count(),
            "crypto_enabled": self.channel.is_initialized(),
            "uptime_ms": self.clock.now_millis(),
            "version": env!("CARGO_PKG_VERSION"),
        }))
    }

    fn reset_counter(&self) -> CommandOutcome {
        if let Err(e) = self.channel.reset_replay_counter() {
            warn!(error = %e, "Counter reset not persisted");
        }
        info!("Replay counter reset by command");
        CommandOutcome::reply(json!({
            "status": "success",
            "result": "counter_reset",
        }))
    }

    fn update_token(&self) -> CommandOutcome {
        let token = self.channel.generate_token();
        let mut outcome = CommandOutcome::reply(json!({
            "status": "success",
            "result": "token_updated",
            "new_token": token.expose(),
            "message": "Token updated. Use the new token for further requests.",
        }));
        outcome.post = Some(PostAction::RotateToken(token));
        outcome
    }
}

impl std::fmt::Debug for CommandDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDispatcher")
            .field("device_id", &self.channel.device_id())
            .field("wol_target", &self.waker.target())
            .finish()
    }
}

// ============================================
// Tests
// ============================================
