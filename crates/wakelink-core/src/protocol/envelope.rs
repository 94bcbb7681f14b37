// ============================================
// File: crates/wakelink-core/src/protocol/envelope.rs
// ============================================
//! # Protocol Envelopes
//!
//! ## Creation Reason
//! Two JSON layers wrap every exchange: an inner command envelope that is
//! encrypted, and an outer transport envelope that is signed.
//!
//! ## Main Functionality
//! - `OuterEnvelope`: `device_id` / `payload` / `signature` / `version`
//! - `InnerEnvelope`: `command` / `data` / `request_id` / `timestamp`
//! - `IncomingCommand`: Validated inner envelope handed to dispatch
//!
//! ## Layering
//! ```text
//! {"device_id":"..","payload":"<hex frame>","signature":"<64 hex>","version":"1.0"}
//!                               │
//!                    decrypt    ▼
//! {"command":"wake","data":{"mac":".."},"request_id":"AB12CD34","timestamp":1234}
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Outer fields are read leniently: missing or non-string values count
//!   as empty and surface as `BAD_PACKET`, not `JSON_PARSE`
//! - `data` that is missing or not an object becomes `{}`
//!
//! ## Last Modified
//! v0.1.0 - Initial envelope definitions

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CoreError, Result};
use crate::protocol::version::{ProtocolVersion, PROTOCOL_VERSION};

// ============================================
// OuterEnvelope
// ============================================

/// Signed transport envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OuterEnvelope {
    /// Sender's device identifier.
    pub device_id: String,
    /// Hex-encoded secure frame.
    pub payload: String,
    /// HMAC-SHA256 of `payload` as lowercase hex.
    pub signature: String,
    /// Protocol version tag.
    pub version: String,
}

impl OuterEnvelope {
    /// Creates an envelope at the current protocol version.
    pub fn new(
        device_id: impl Into<String>,
        payload: impl Into<String>,
        signature: impl Into<String>,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            payload: payload.into(),
            signature: signature.into(),
            version: PROTOCOL_VERSION.to_string(),
        }
    }

    /// Parses wire JSON and checks the structural rules.
    ///
    /// # Errors
    /// - `JsonParse` if `raw` is not JSON
    /// - `BadPacket` on a version mismatch or empty payload / signature
    pub fn from_json(raw: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(raw).map_err(|e| CoreError::json_parse(e.to_string()))?;

        let field = |name: &str| {
            value
                .get(name)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let envelope = Self {
            device_id: field("device_id"),
            payload: field("payload"),
            signature: field("signature"),
            version: field("version"),
        };

        if !ProtocolVersion::parse(&envelope.version).is_supported() {
            return Err(CoreError::bad_packet(format!(
                "unsupported version {:?}",
                envelope.version
            )));
        }
        if envelope.payload.is_empty() {
            return Err(CoreError::bad_packet("empty payload"));
        }
        if envelope.signature.is_empty() {
            return Err(CoreError::bad_packet("empty signature"));
        }

        Ok(envelope)
    }

    /// Serializes to wire JSON.
    ///
    /// # Errors
    /// Returns `Encoding` if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| CoreError::encoding(format!("outer envelope: {e}")))
    }
}

// ============================================
// InnerEnvelope
// ============================================

/// Plaintext command envelope, as produced by the sending side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InnerEnvelope {
    /// Command name.
    pub command: String,
    /// Command arguments.
    pub data: Map<String, Value>,
    /// Correlation identifier, 8 chars of `[A-Z0-9]`.
    pub request_id: String,
    /// Sender uptime in milliseconds.
    pub timestamp: u64,
}

impl InnerEnvelope {
    /// Serializes to JSON.
    ///
    /// # Errors
    /// Returns `Encoding` if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| CoreError::encoding(format!("inner envelope: {e}")))
    }
}

// ============================================
// IncomingCommand
// ============================================

/// Inner envelope after validation, ready for dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingCommand {
    /// Non-empty command name.
    pub command: String,
    /// Arguments; `{}` when absent or not an object.
    pub data: Map<String, Value>,
    /// Correlation identifier, if the sender supplied one.
    pub request_id: Option<String>,
    /// Sender timestamp, if present.
    pub timestamp: Option<u64>,
}

impl IncomingCommand {
    /// Parses decrypted plaintext.
    ///
    /// # Errors
    /// - `InvalidJson` if the plaintext is not a JSON object
    /// - `NoCommand` if `command` is missing, empty or not a string
    pub fn from_plaintext(plaintext: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(plaintext).map_err(|e| CoreError::invalid_json(e.to_string()))?;
        let Value::Object(mut object) = value else {
            return Err(CoreError::invalid_json("inner envelope is not an object"));
        };

        let command = match object.remove("command") {
            Some(Value::String(command)) if !command.is_empty() => command,
            _ => return Err(CoreError::NoCommand),
        };
        let data = match object.remove("data") {
            Some(Value::Object(data)) => data,
            _ => Map::new(),
        };
        let request_id = object
            .get("request_id")
            .and_then(Value::as_str)
            .map(str::to_string);
        let timestamp = object.get("timestamp").and_then(Value::as_u64);

        Ok(Self {
            command,
            data,
            request_id,
            timestamp,
        })
    }

    /// Returns the request id to echo, or `"unknown"`.
    #[must_use]
    pub fn reply_request_id(&self) -> &str {
        self.request_id.as_deref().unwrap_or("unknown")
    }
}

// ============================================
// Tests
// ============================================
