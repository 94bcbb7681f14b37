// ============================================
// File: crates/wakelink-core/src/channel.rs
// ============================================
//! # Secure Channel
//!
//! ## Creation Reason
//! Owns everything a device needs to speak the secure packet protocol:
//! the derived keys, the replay counter and the injected randomness and
//! clock. One instance is shared by all connections.
//!
//! ## Main Functionality
//! - `initialize` / `rotate`: Install (or replace) the device token
//! - `create_secure_response` / `process_secure_packet`: Frame level
//! - `create_outer_packet` / `parse_outer_packet`: Envelope level
//! - `encode_command` / `decode_incoming`: Requests
//! - `encode_response` / `decode_response`: Replies
//!
//! ## Inbound Flow
//! ```text
//! wire JSON
//!    │  OuterEnvelope::from_json          JSON_PARSE / BAD_PACKET
//!    ▼
//! ┌────────────────── state lock held ──────────────────┐
//! │  verify HMAC(payload string)        INVALID_SIGNATURE│
//! │  limit check                        LIMIT_EXCEEDED   │
//! │  SecureFrame::decode_hex            HEX_LEN / ...    │
//! │  ChaCha20 decrypt                                    │
//! │  counter.increment()                                 │
//! └──────────────────────────────────────────────────────┘
//!    │  IncomingCommand::from_plaintext   INVALID_JSON / NO_COMMAND
//!    ▼
//! dispatch
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Signature verification ALWAYS precedes decryption
//! - A rejected packet never touches the counter
//! - Plaintext above 500 bytes is truncated with a warning, not rejected
//! - In `KeyMode::Shared` the same 32 bytes key both cipher and MAC; this
//!   is what deployed peers expect
//!
//! ## Last Modified
//! v0.1.0 - Initial secure channel

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use wakelink_common::{Clock, RequestId};

use crate::counter::{CounterConfig, ReplayCounter};
use crate::crypto::{chacha20, derive_keys, Authenticator, ChannelKeys, DeviceToken, KeyMode};
use crate::crypto::{RandomSource, CHACHA20_NONCE_SIZE};
use crate::error::{CoreError, Result};
use crate::protocol::envelope::{IncomingCommand, InnerEnvelope, OuterEnvelope};
use crate::protocol::frame::{SecureFrame, MAX_DATA_LEN, WIRE_NONCE_SIZE};
use crate::storage::NvStorage;

// ============================================
// ChannelConfig
// ============================================

/// Static settings of a [`SecureChannel`].
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Identifier written into outgoing outer envelopes.
    pub device_id: String,
    /// Key derivation mode; both peers must agree.
    pub key_mode: KeyMode,
    /// Replay counter placement and limits.
    pub counter: CounterConfig,
}

impl ChannelConfig {
    /// Creates a config with default key mode and counter settings.
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            key_mode: KeyMode::default(),
            counter: CounterConfig::default(),
        }
    }
}

// ============================================
// SealedCommand
// ============================================

/// Outbound request ready for a transport.
#[derive(Debug, Clone)]
pub struct SealedCommand {
    /// Correlation id placed in the inner envelope.
    pub request_id: RequestId,
    /// Outer envelope JSON.
    pub wire: String,
}

// ============================================
// SecureChannel
// ============================================

struct ChannelState {
    keys: Option<ChannelKeys>,
    counter: ReplayCounter,
}

/// Keys, replay counter and codec for one provisioned device token.
///
/// # Thread Safety
/// All mutable state sits behind one lock; verify, decrypt and counter
/// increment of an inbound packet happen inside a single critical section.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use wakelink_common::MonotonicClock;
/// use wakelink_core::channel::{ChannelConfig, SecureChannel};
/// use wakelink_core::crypto::OsRandom;
/// use wakelink_core::storage::MemoryStorage;
///
/// let device = SecureChannel::new(
///     ChannelConfig::new("WL-01"),
///     Box::new(MemoryStorage::default()),
///     Arc::new(OsRandom),
///     Arc::new(MonotonicClock::new()),
/// );
/// device.initialize("0123456789abcdef0123456789abcdef").unwrap();
///
/// let client = SecureChannel::new(
///     ChannelConfig::new("client"),
///     Box::new(MemoryStorage::default()),
///     Arc::new(OsRandom),
///     Arc::new(MonotonicClock::new()),
/// );
/// client.initialize("0123456789abcdef0123456789abcdef").unwrap();
///
/// let sealed = client.encode_command("ping", Default::default()).unwrap();
/// let incoming = device.decode_incoming(&sealed.wire).unwrap();
/// assert_eq!(incoming.command, "ping");
/// ```
pub struct SecureChannel {
    config: ChannelConfig,
    state: Mutex<ChannelState>,
    rng: Arc<dyn RandomSource>,
    clock: Arc<dyn Clock>,
}

impl SecureChannel {
    /// Creates an uninitialized channel.
    ///
    /// Every operation needing keys fails with `CRYPTO_DISABLED` until
    /// [`initialize`](Self::initialize) succeeds.
    #[must_use]
    pub fn new(
        config: ChannelConfig,
        storage: Box<dyn NvStorage>,
        rng: Arc<dyn RandomSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let counter = ReplayCounter::new(storage, config.counter);
        Self {
            config,
            state: Mutex::new(ChannelState {
                keys: None,
                counter,
            }),
            rng,
            clock,
        }
    }

    // ========================================
    // Provisioning
    // ========================================

    /// Installs the device token and loads the replay counter.
    ///
    /// # Errors
    /// - `TokenTooShort` if `secret` has fewer than 32 characters
    /// - `Storage` if the counter record cannot be read
    pub fn initialize(&self, secret: &str) -> Result<()> {
        let token = DeviceToken::new(secret)?;
        let keys = derive_keys(&token, self.config.key_mode);

        let mut state = self.state.lock();
        if state.keys.is_none() {
            state.counter.load()?;
        }
        state.keys = Some(keys);

        info!(
            device_id = %self.config.device_id,
            mode = %self.config.key_mode,
            requests = state.counter.value(),
            limit = state.counter.limit(),
            "Secure channel initialized"
        );
        Ok(())
    }

    /// Replaces the token and opens a fresh replay window.
    ///
    /// A failure to persist the reset is logged; the in-memory counter is
    /// still reset.
    ///
    /// # Errors
    /// - `TokenTooShort` if `secret` has fewer than 32 characters
    /// - `NotInitialized` if the channel was never initialized
    pub fn rotate(&self, secret: &str) -> Result<()> {
        let token = DeviceToken::new(secret)?;
        let keys = derive_keys(&token, self.config.key_mode);

        let mut state = self.state.lock();
        if state.keys.is_none() {
            return Err(CoreError::NotInitialized);
        }
        state.keys = Some(keys);
        if let Err(e) = state.counter.reset() {
            warn!(error = %e, "Token rotated but counter reset was not persisted");
        }

        info!(device_id = %self.config.device_id, "Device token rotated");
        Ok(())
    }

    /// Generates a fresh 96-character alphanumeric token.
    #[must_use]
    pub fn generate_token(&self) -> DeviceToken {
        DeviceToken::generate(self.rng.as_ref())
    }

    /// Returns `true` once keys are installed.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.state.lock().keys.is_some()
    }

    /// Returns the configured device id.
    #[must_use]
    pub fn device_id(&self) -> &str {
        &self.config.device_id
    }

    /// Returns the key derivation mode.
    #[must_use]
    pub const fn key_mode(&self) -> KeyMode {
        self.config.key_mode
    }

    // ========================================
    // Frame Level
    // ========================================

    /// Encrypts `plaintext` into a hex payload.
    ///
    /// Input above 500 bytes is truncated to 500.
    ///
    /// Plaintext below 4 bytes still seals, but the resulting frame is
    /// under the 22-byte minimum and the receiving side refuses it with
    /// `INVALID_PACKET_SIZE`.
    ///
    /// # Errors
    /// Returns `NotInitialized` without keys.
    pub fn create_secure_response(&self, plaintext: &str) -> Result<String> {
        let state = self.state.lock();
        let keys = state.keys.as_ref().ok_or(CoreError::NotInitialized)?;
        self.seal_payload(keys, plaintext.as_bytes())
    }

    /// Decrypts a hex payload and counts it against the replay window.
    ///
    /// Performs no signature check; callers holding an outer envelope
    /// should use [`decode_incoming`](Self::decode_incoming).
    ///
    /// # Errors
    /// `CRYPTO_DISABLED`, `LIMIT_EXCEEDED`, `HEX_LEN`, `INVALID_HEX`,
    /// `INVALID_PACKET_SIZE` or `INVALID_DATA_LENGTH`.
    pub fn process_secure_packet(&self, payload: &str) -> Result<String> {
        let mut state = self.state.lock();
        Self::open_payload(&mut state, payload)
    }

    // ========================================
    // Envelope Level
    // ========================================

    /// Wraps a hex payload in a signed outer envelope.
    ///
    /// # Errors
    /// Returns `NotInitialized` without keys.
    pub fn create_outer_packet(&self, payload: &str) -> Result<String> {
        let state = self.state.lock();
        let keys = state.keys.as_ref().ok_or(CoreError::NotInitialized)?;
        self.wrap_outer(keys, payload)
    }

    /// Parses an outer envelope and verifies its signature.
    ///
    /// # Errors
    /// `JSON_PARSE`, `BAD_PACKET`, `INVALID_SIGNATURE` or `CRYPTO_DISABLED`.
    pub fn parse_outer_packet(&self, raw: &str) -> Result<OuterEnvelope> {
        let envelope = OuterEnvelope::from_json(raw)?;
        let state = self.state.lock();
        let keys = state.keys.as_ref().ok_or(CoreError::NotInitialized)?;
        Self::verify(keys, &envelope)?;
        Ok(envelope)
    }

    // ========================================
    // Requests and Replies
    // ========================================

    /// Seals a command for a device.
    ///
    /// # Errors
    /// Returns `NotInitialized` without keys, or `Encoding`.
    pub fn encode_command(&self, command: &str, data: Map<String, Value>) -> Result<SealedCommand> {
        let request_id = RequestId::generate();
        let inner = InnerEnvelope {
            command: command.to_string(),
            data,
            request_id: request_id.to_string(),
            timestamp: self.clock.now_millis(),
        };
        let wire = self.seal(&inner.to_json()?)?;

        debug!(command, request_id = %request_id, "Sealed command");
        Ok(SealedCommand { request_id, wire })
    }

    /// Opens an inbound request.
    ///
    /// # Errors
    /// Any envelope, decrypt or inner-envelope rejection.
    pub fn decode_incoming(&self, raw: &str) -> Result<IncomingCommand> {
        let plaintext = self.open(raw)?;
        IncomingCommand::from_plaintext(&plaintext)
    }

    /// Seals a reply object.
    ///
    /// # Errors
    /// Returns `NotInitialized` without keys, or `Encoding`.
    pub fn encode_response(&self, result: &Value) -> Result<String> {
        let json = serde_json::to_string(result)
            .map_err(|e| CoreError::encoding(format!("response: {e}")))?;
        self.seal(&json)
    }

    /// Opens a reply; unlike requests no `command` field is required.
    ///
    /// # Errors
    /// Any envelope or decrypt rejection, or `INVALID_JSON` if the
    /// plaintext is not a JSON object.
    pub fn decode_response(&self, raw: &str) -> Result<Map<String, Value>> {
        let plaintext = self.open(raw)?;
        match serde_json::from_str(&plaintext) {
            Ok(Value::Object(object)) => Ok(object),
            Ok(_) => Err(CoreError::invalid_json("reply is not an object")),
            Err(e) => Err(CoreError::invalid_json(e.to_string())),
        }
    }

    // ========================================
    // Replay Window
    // ========================================

    /// Returns `true` while decryption is refused.
    #[must_use]
    pub fn is_replay_limit_exceeded(&self) -> bool {
        self.state.lock().counter.is_limit_exceeded()
    }

    /// Opens a fresh replay window.
    ///
    /// # Errors
    /// Returns `Storage` if the reset was not persisted; the in-memory
    /// reset still applies.
    pub fn reset_replay_counter(&self) -> Result<()> {
        self.state.lock().counter.reset()
    }

    /// Returns the number of requests decrypted in this window.
    #[must_use]
    pub fn request_count(&self) -> u32 {
        self.state.lock().counter.value()
    }

    /// Returns the size of the replay window.
    #[must_use]
    pub fn request_limit(&self) -> u32 {
        self.state.lock().counter.limit()
    }

    /// Returns `SECURE|REQUESTS:n/limit|STATUS:ACTIVE` (or `LIMIT_EXCEEDED`).
    #[must_use]
    pub fn key_info(&self) -> String {
        let state = self.state.lock();
        let status = if state.counter.is_limit_exceeded() {
            "LIMIT_EXCEEDED"
        } else {
            "ACTIVE"
        };
        format!(
            "SECURE|REQUESTS:{}/{}|STATUS:{status}",
            state.counter.value(),
            state.counter.limit()
        )
    }

    // ========================================
    // Internal
    // ========================================

    fn seal(&self, plaintext: &str) -> Result<String> {
        let state = self.state.lock();
        let keys = state.keys.as_ref().ok_or(CoreError::NotInitialized)?;
        let payload = self.seal_payload(keys, plaintext.as_bytes())?;
        self.wrap_outer(keys, &payload)
    }

    fn open(&self, raw: &str) -> Result<String> {
        let envelope = OuterEnvelope::from_json(raw)?;

        let mut state = self.state.lock();
        let keys = state.keys.as_ref().ok_or(CoreError::NotInitialized)?;
        Self::verify(keys, &envelope)?;
        Self::open_payload(&mut state, &envelope.payload)
    }

    fn seal_payload(&self, keys: &ChannelKeys, plaintext: &[u8]) -> Result<String> {
        let plaintext = if plaintext.len() > MAX_DATA_LEN {
            warn!(
                len = plaintext.len(),
                max = MAX_DATA_LEN,
                "Plaintext truncated to fit secure frame"
            );
            &plaintext[..MAX_DATA_LEN]
        } else {
            plaintext
        };

        let mut nonce = [0u8; WIRE_NONCE_SIZE];
        self.rng.fill_bytes(&mut nonce);
        let mut cipher_nonce = [0u8; CHACHA20_NONCE_SIZE];
        cipher_nonce.copy_from_slice(&nonce[..CHACHA20_NONCE_SIZE]);

        let ciphertext = chacha20::encrypt(keys.cipher.as_bytes(), &cipher_nonce, plaintext);
        Ok(SecureFrame::new(ciphertext, nonce)?.encode_hex())
    }

    fn open_payload(state: &mut ChannelState, payload: &str) -> Result<String> {
        let keys = state.keys.as_ref().ok_or(CoreError::NotInitialized)?;
        if state.counter.is_limit_exceeded() {
            warn!(limit = state.counter.limit(), "Packet refused, request limit exceeded");
            return Err(CoreError::LimitExceeded {
                count: state.counter.value(),
                limit: state.counter.limit(),
            });
        }

        let frame = SecureFrame::decode_hex(payload)?;
        let plaintext =
            chacha20::decrypt(keys.cipher.as_bytes(), &frame.cipher_nonce(), frame.ciphertext());

        state.counter.increment()?;
        Ok(String::from_utf8_lossy(&plaintext).into_owned())
    }

    fn wrap_outer(&self, keys: &ChannelKeys, payload: &str) -> Result<String> {
        let signature = Authenticator::new(keys.mac.clone()).sign_hex(payload.as_bytes());
        OuterEnvelope::new(self.config.device_id.clone(), payload, signature).to_json()
    }

    fn verify(keys: &ChannelKeys, envelope: &OuterEnvelope) -> Result<()> {
        let authenticator = Authenticator::new(keys.mac.clone());
        if authenticator.verify_hex(envelope.payload.as_bytes(), &envelope.signature) {
            Ok(())
        } else {
            warn!(device_id = %envelope.device_id, "Signature verification failed");
            Err(CoreError::InvalidSignature)
        }
    }
}

impl std::fmt::Debug for SecureChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("SecureChannel")
            .field("device_id", &self.config.device_id)
            .field("key_mode", &self.config.key_mode)
            .field("initialized", &state.keys.is_some())
            .field("counter", &state.counter)
            .finish_non_exhaustive()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::SeededRandom;
    use crate::storage::MemoryStorage;
    use proptest::prelude::*;
    use serde_json::json;
    use wakelink_common::ManualClock;

    const TOKEN: &str = "0123456789abcdef0123456789abcdef";

    fn channel_on(storage: &MemoryStorage, limit: u32) -> SecureChannel {
        let mut config = ChannelConfig::new("WL-TEST");
        config.counter.limit = limit;
        SecureChannel::new(
            config,
            Box::new(storage.clone()),
            Arc::new(SeededRandom::new(7)),
            Arc::new(ManualClock::new(1234)),
        )
    }

    fn ready_channel() -> SecureChannel {
        let channel = channel_on(&MemoryStorage::default(), 1000);
        channel.initialize(TOKEN).unwrap();
        channel
    }

    #[test]
    fn test_short_token_rejected() {
        let channel = channel_on(&MemoryStorage::default(), 1000);
        let err = channel.initialize("short").unwrap_err();
        assert_eq!(err.token(), "TOKEN_TOO_SHORT");
        assert!(!channel.is_initialized());
    }

    #[test]
    fn test_uninitialized_is_crypto_disabled() {
        let channel = channel_on(&MemoryStorage::default(), 1000);
        assert_eq!(
            channel.create_secure_response("x").unwrap_err().token(),
            "CRYPTO_DISABLED"
        );
        assert_eq!(
            channel.process_secure_packet("00").unwrap_err().reply_error(),
            "ERROR:CRYPTO_DISABLED"
        );
    }

    #[test]
    fn test_end_to_end_ping() {
        let channel = ready_channel();
        let plaintext = r#"{"command":"ping"}"#;

        let payload = channel.create_secure_response(plaintext).unwrap();
        assert_eq!(payload.len(), 2 * (2 + plaintext.len() + 16));

        assert_eq!(channel.process_secure_packet(&payload).unwrap(), plaintext);
        assert_eq!(channel.request_count(), 1);
    }

    #[test]
    fn test_truncates_long_plaintext() {
        let channel = ready_channel();
        let long = "a".repeat(700);

        let payload = channel.create_secure_response(&long).unwrap();
        assert_eq!(payload.len(), 2 * (2 + MAX_DATA_LEN + 16));
        assert_eq!(channel.process_secure_packet(&payload).unwrap(), "a".repeat(500));
    }

    #[test]
    fn test_rejected_packets_do_not_count() {
        let channel = ready_channel();
        let bad = [
            "abc".to_string(),
            "zz".repeat(30),
            "00".repeat(21),
            format!("0000{}", "00".repeat(20)),
            format!("01f5{}", "00".repeat(40)),
            format!("0004{}", "00".repeat(30)),
        ];
        for payload in &bad {
            let err = channel.process_secure_packet(payload).unwrap_err();
            assert!(err.is_decrypt_error(), "{payload}: {err}");
        }
        assert_eq!(channel.request_count(), 0);
    }

    #[test]
    fn test_outer_round_trip_and_signature() {
        let channel = ready_channel();
        let payload = channel.create_secure_response("hello").unwrap();
        let wire = channel.create_outer_packet(&payload).unwrap();

        let envelope = channel.parse_outer_packet(&wire).unwrap();
        assert_eq!(envelope.payload, payload);
        assert_eq!(envelope.device_id, "WL-TEST");
        assert_eq!(envelope.signature.len(), 64);
        assert_eq!(envelope.signature, envelope.signature.to_lowercase());
    }

    #[test]
    fn test_uppercase_signature_verifies() {
        let channel = ready_channel();
        let payload = channel.create_secure_response("hello").unwrap();
        let mut value: Value =
            serde_json::from_str(&channel.create_outer_packet(&payload).unwrap()).unwrap();
        let upper = value["signature"].as_str().unwrap().to_uppercase();
        value["signature"] = Value::String(upper);

        assert!(channel.parse_outer_packet(&value.to_string()).is_ok());
    }

    #[test]
    fn test_tampered_payload_fails_signature_without_counting() {
        let channel = ready_channel();
        let payload = channel.create_secure_response("hello").unwrap();
        let mut value: Value =
            serde_json::from_str(&channel.create_outer_packet(&payload).unwrap()).unwrap();
        let mut tampered = payload.clone();
        tampered.replace_range(4..6, if &payload[4..6] == "00" { "01" } else { "00" });
        value["payload"] = Value::String(tampered);

        let err = channel.decode_incoming(&value.to_string()).unwrap_err();
        assert_eq!(err.token(), "INVALID_SIGNATURE");
        assert!(err.is_suspicious());
        assert_eq!(channel.request_count(), 0);
    }

    #[test]
    fn test_bad_version_is_bad_packet() {
        let channel = ready_channel();
        let wire = channel.encode_response(&json!({"status":"success"})).unwrap();
        let mut value: Value = serde_json::from_str(&wire).unwrap();
        value["version"] = json!("1.1");

        let err = channel.decode_response(&value.to_string()).unwrap_err();
        assert_eq!(err.reply_error(), "BAD_PACKET");
    }

    #[test]
    fn test_command_round_trip_between_peers() {
        let device = ready_channel();
        let client = ready_channel();

        let mut data = Map::new();
        data.insert("mac".into(), json!("AA:BB:CC:DD:EE:FF"));
        let sealed = client.encode_command("wake", data).unwrap();

        let incoming = device.decode_incoming(&sealed.wire).unwrap();
        assert_eq!(incoming.command, "wake");
        assert_eq!(incoming.data["mac"], "AA:BB:CC:DD:EE:FF");
        assert_eq!(incoming.request_id.as_deref(), Some(sealed.request_id.as_str()));
        assert_eq!(incoming.timestamp, Some(1234));

        let reply = device
            .encode_response(&json!({"status":"success","request_id":incoming.reply_request_id()}))
            .unwrap();
        let opened = client.decode_response(&reply).unwrap();
        assert_eq!(opened["status"], "success");
        assert_eq!(opened["request_id"], sealed.request_id.as_str());
    }

    #[test]
    fn test_wrong_token_cannot_talk() {
        let device = ready_channel();
        let other = channel_on(&MemoryStorage::default(), 1000);
        other.initialize("ffffffffffffffffffffffffffffffff").unwrap();

        let sealed = other.encode_command("ping", Map::new()).unwrap();
        assert_eq!(
            device.decode_incoming(&sealed.wire).unwrap_err().token(),
            "INVALID_SIGNATURE"
        );
    }

    #[test]
    fn test_key_mode_mismatch_fails_signature() {
        let device = ready_channel();
        let mut config = ChannelConfig::new("client");
        config.key_mode = KeyMode::Separated;
        let client = SecureChannel::new(
            config,
            Box::new(MemoryStorage::default()),
            Arc::new(SeededRandom::new(1)),
            Arc::new(ManualClock::new(0)),
        );
        client.initialize(TOKEN).unwrap();

        let sealed = client.encode_command("ping", Map::new()).unwrap();
        assert!(device.decode_incoming(&sealed.wire).is_err());
    }

    #[test]
    fn test_limit_then_reset() {
        let channel = channel_on(&MemoryStorage::default(), 3);
        channel.initialize(TOKEN).unwrap();

        for _ in 0..3 {
            let payload = channel.create_secure_response("ping").unwrap();
            channel.process_secure_packet(&payload).unwrap();
        }
        assert!(channel.is_replay_limit_exceeded());
        assert_eq!(channel.key_info(), "SECURE|REQUESTS:3/3|STATUS:LIMIT_EXCEEDED");

        let payload = channel.create_secure_response("ping").unwrap();
        assert_eq!(
            channel.process_secure_packet(&payload).unwrap_err().reply_error(),
            "ERROR:LIMIT_EXCEEDED"
        );

        channel.reset_replay_counter().unwrap();
        assert!(!channel.is_replay_limit_exceeded());
        assert_eq!(channel.process_secure_packet(&payload).unwrap(), "ping");
        assert_eq!(channel.key_info(), "SECURE|REQUESTS:1/3|STATUS:ACTIVE");
    }

    #[test]
    fn test_counter_survives_restart() {
        let storage = MemoryStorage::default();
        let channel = channel_on(&storage, 1000);
        channel.initialize(TOKEN).unwrap();
        for _ in 0..12 {
            let payload = channel.create_secure_response("ping").unwrap();
            channel.process_secure_packet(&payload).unwrap();
        }
        drop(channel);

        storage.power_cycle();
        let restarted = channel_on(&storage, 1000);
        restarted.initialize(TOKEN).unwrap();
        assert_eq!(restarted.request_count(), 10);
    }

    #[test]
    fn test_rotate_switches_keys_and_resets() {
        let device = ready_channel();
        let client = ready_channel();
        let payload = device.create_secure_response("ping").unwrap();
        device.process_secure_packet(&payload).unwrap();

        let fresh = device.generate_token();
        assert_eq!(fresh.len(), 96);
        device.rotate(fresh.expose()).unwrap();
        assert_eq!(device.request_count(), 0);

        let old = client.encode_command("ping", Map::new()).unwrap();
        assert_eq!(device.decode_incoming(&old.wire).unwrap_err().token(), "INVALID_SIGNATURE");

        client.initialize(fresh.expose()).unwrap();
        let new = client.encode_command("ping", Map::new()).unwrap();
        assert!(device.decode_incoming(&new.wire).is_ok());
    }

    #[test]
    fn test_rotate_requires_initialize() {
        let channel = channel_on(&MemoryStorage::default(), 1000);
        assert_eq!(channel.rotate(TOKEN).unwrap_err().token(), "CRYPTO_DISABLED");
    }

    #[test]
    fn test_below_minimum_frame_seals_but_is_refused() {
        let channel = ready_channel();

        let payload = channel.create_secure_response("abc").unwrap();
        assert_eq!(payload.len(), 2 * (2 + 3 + 16));

        let err = channel.process_secure_packet(&payload).unwrap_err();
        assert_eq!(err.token(), "INVALID_PACKET_SIZE");
        assert_eq!(channel.request_count(), 0);

        let payload = channel.create_secure_response("abcd").unwrap();
        assert_eq!(channel.process_secure_packet(&payload).unwrap(), "abcd");
    }

    #[test]
    fn test_debug_hides_keys() {
        let debug = format!("{:?}", ready_channel());
        assert!(debug.contains("initialized: true"));
        assert!(!debug.contains(TOKEN));
    }

    proptest! {
        #[test]
        fn test_payload_round_trip(plaintext in "[ -~]{4,500}") {
            let channel = ready_channel();
            let payload = channel.create_secure_response(&plaintext).unwrap();
            prop_assert_eq!(payload.len(), 2 * (2 + plaintext.len() + 16));
            prop_assert_eq!(channel.process_secure_packet(&payload).unwrap(), plaintext);
        }

        #[test]
        fn test_cipher_round_trip(data in proptest::collection::vec(any::<u8>(), 0..=500)) {
            let key = [0x42u8; 32];
            let nonce = [0x24u8; CHACHA20_NONCE_SIZE];
            let ct = chacha20::encrypt(&key, &nonce, &data);
            prop_assert_eq!(chacha20::decrypt(&key, &nonce, &ct), data);
        }
    }
}
