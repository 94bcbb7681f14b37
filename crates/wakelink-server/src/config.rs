// ============================================
// File: crates/wakelink-server/src/config.rs
// ============================================
//! # Device Configuration
//!
//! ## Creation Reason
//! Provides configuration management for the WakeLink device daemon,
//! loaded from a TOML file with every field defaulted.
//!
//! ## Main Functionality
//! - `ServerConfig`: Main configuration structure
//! - TOML file loading and parsing
//! - Section-by-section validation
//! - Conversion into the core `ChannelConfig`
//!
//! ## Configuration Sections
//! - `device`: Device id and where the token lives
//! - `network`: TCP listen address, request read timeout
//! - `wol`: Broadcast destination for magic packets
//! - `storage`: EEPROM image file and counter placement
//! - `crypto`: Key derivation mode, replay window
//! - `logging`: Log level
//!
//! ## Example Configuration
//! ```toml
//! [device]
//! device_id = "WL-LIVINGROOM"
//! token_file = "/etc/wakelink/token"
//!
//! [network]
//! listen_addr = "0.0.0.0:99"
//! read_timeout_ms = 5000
//!
//! [wol]
//! broadcast_addr = "192.168.1.255"
//! port = 9
//!
//! [storage]
//! path = "/var/lib/wakelink/eeprom.bin"
//!
//! [crypto]
//! key_mode = "shared"
//! request_limit = 1000
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - All config changes require daemon restart
//! - `crypto.key_mode` must match every client; `shared` is what deployed
//!   firmware speaks
//! - An inline `device.token` wins over `device.token_file`
//!
//! ## Last Modified
//! v0.1.0 - Initial configuration implementation

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use wakelink_common::DeviceId;
use wakelink_core::channel::ChannelConfig;
use wakelink_core::counter::{CounterConfig, COUNTER_RECORD_SIZE, DEFAULT_COUNTER_OFFSET};
use wakelink_core::counter::{PERSIST_INTERVAL, REQUEST_LIMIT};
use wakelink_core::crypto::keys::MIN_TOKEN_LEN;
use wakelink_core::crypto::KeyMode;
use wakelink_core::storage::DEFAULT_CAPACITY;

use crate::error::{Result, ServerError};

/// Config file used when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/wakelink/device.toml";

// ============================================
// ServerConfig
// ============================================

/// Main daemon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Device identity and token location.
    #[serde(default)]
    pub device: DeviceConfig,

    /// Network configuration.
    #[serde(default)]
    pub network: NetworkConfig,

    /// Wake-on-LAN destination.
    #[serde(default)]
    pub wol: WolConfig,

    /// Persistent storage image.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Key derivation and replay window.
    #[serde(default)]
    pub crypto: CryptoConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ServerConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    /// Returns error if file cannot be read, parsed or validated.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        info!("Loading configuration from: {}", path_str);

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ServerError::config_load(&path_str, e.to_string()))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ServerError::config_load(&path_str, e.to_string()))?;

        config.validate()?;

        info!("Configuration loaded successfully");
        Ok(config)
    }

    /// Loads configuration from a string (useful for testing).
    ///
    /// # Errors
    /// Returns error if the content cannot be parsed or validated.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ServerError::config_load("<string>", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns `ConfigInvalid` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        self.device.validate()?;
        self.network.validate()?;
        self.wol.validate()?;
        self.storage.validate()?;
        self.crypto.validate()?;
        Ok(())
    }

    /// Serializes configuration to TOML string.
    #[must_use]
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }

    /// Builds the secure channel settings.
    #[must_use]
    pub fn channel_config(&self) -> ChannelConfig {
        ChannelConfig {
            device_id: self.device.device_id.clone(),
            key_mode: self.crypto.key_mode,
            counter: CounterConfig {
                offset: self.storage.counter_offset,
                limit: self.crypto.request_limit,
                persist_interval: self.crypto.persist_interval,
            },
        }
    }

    // ========================================
    // Helper methods
    // ========================================

    /// Returns listen address.
    #[must_use]
    pub fn listen_addr(&self) -> SocketAddr {
        self.network.listen_addr
    }

    /// Returns the request read timeout.
    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.network.read_timeout_ms)
    }

    /// Returns where magic packets are sent.
    #[must_use]
    pub fn wol_target(&self) -> SocketAddr {
        self.wol.target()
    }
}

// ============================================
// DeviceConfig
// ============================================

/// Device identity section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Name announced in every outer envelope.
    #[serde(default = "default_device_id")]
    pub device_id: String,

    /// Inline token. Prefer `token_file` outside of testing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// File holding the token; generated on first start if absent.
    #[serde(default = "default_token_file")]
    pub token_file: String,
}

fn default_device_id() -> String {
    "WL-0001".to_string()
}

fn default_token_file() -> String {
    "/etc/wakelink/token".to_string()
}

impl DeviceConfig {
    fn validate(&self) -> Result<()> {
        DeviceId::new(self.device_id.as_str())
            .map_err(|_| ServerError::config_invalid("device.device_id", "cannot be empty"))?;

        if let Some(token) = &self.token {
            if token.len() < MIN_TOKEN_LEN {
                return Err(ServerError::config_invalid(
                    "device.token",
                    format!("must be at least {MIN_TOKEN_LEN} characters"),
                ));
            }
        }

        if self.token.is_none() && self.token_file.is_empty() {
            return Err(ServerError::config_invalid(
                "device.token_file",
                "cannot be empty when no inline token is set",
            ));
        }
        Ok(())
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            device_id: default_device_id(),
            token: None,
            token_file: default_token_file(),
        }
    }
}

// ============================================
// NetworkConfig
// ============================================

/// Network configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// TCP listen address.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Time allowed for a request line to arrive, in milliseconds.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

fn default_listen_addr() -> SocketAddr {
    SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 99).into()
}

fn default_read_timeout_ms() -> u64 {
    5000
}

impl NetworkConfig {
    fn validate(&self) -> Result<()> {
        if self.listen_addr.port() == 0 {
            return Err(ServerError::config_invalid(
                "network.listen_addr",
                "port cannot be 0",
            ));
        }
        if self.read_timeout_ms == 0 {
            return Err(ServerError::config_invalid(
                "network.read_timeout_ms",
                "must be greater than 0",
            ));
        }
        Ok(())
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            read_timeout_ms: default_read_timeout_ms(),
        }
    }
}

// ============================================
// WolConfig
// ============================================

/// Wake-on-LAN section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WolConfig {
    /// Broadcast address, limited or directed.
    #[serde(default = "default_broadcast_addr")]
    pub broadcast_addr: Ipv4Addr,

    /// Destination UDP port.
    #[serde(default = "default_wol_port")]
    pub port: u16,
}

fn default_broadcast_addr() -> Ipv4Addr {
    Ipv4Addr::BROADCAST
}

fn default_wol_port() -> u16 {
    9
}

impl WolConfig {
    fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(ServerError::config_invalid("wol.port", "cannot be 0"));
        }
        Ok(())
    }

    /// Returns the destination socket address.
    #[must_use]
    pub fn target(&self) -> SocketAddr {
        SocketAddrV4::new(self.broadcast_addr, self.port).into()
    }
}

impl Default for WolConfig {
    fn default() -> Self {
        Self {
            broadcast_addr: default_broadcast_addr(),
            port: default_wol_port(),
        }
    }
}

// ============================================
// StorageConfig
// ============================================

/// Persistent storage section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// EEPROM image file.
    #[serde(default = "default_storage_path")]
    pub path: String,

    /// Image size in bytes.
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Byte offset of the replay counter record.
    #[serde(default = "default_counter_offset")]
    pub counter_offset: usize,
}

fn default_storage_path() -> String {
    "/var/lib/wakelink/eeprom.bin".to_string()
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_counter_offset() -> usize {
    DEFAULT_COUNTER_OFFSET
}

impl StorageConfig {
    fn validate(&self) -> Result<()> {
        if self.path.is_empty() {
            return Err(ServerError::config_invalid("storage.path", "cannot be empty"));
        }
        if self.capacity == 0 {
            return Err(ServerError::config_invalid(
                "storage.capacity",
                "must be greater than 0",
            ));
        }
        let fits = self
            .counter_offset
            .checked_add(COUNTER_RECORD_SIZE)
            .is_some_and(|end| end <= self.capacity);
        if !fits {
            return Err(ServerError::config_invalid(
                "storage.counter_offset",
                format!(
                    "{COUNTER_RECORD_SIZE}-byte counter record does not fit in {} bytes",
                    self.capacity
                ),
            ));
        }
        Ok(())
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
            capacity: default_capacity(),
            counter_offset: default_counter_offset(),
        }
    }
}

// ============================================
// CryptoConfig
// ============================================

/// Key derivation and replay window section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CryptoConfig {
    /// `shared` (wire-compatible) or `separated`.
    #[serde(default)]
    pub key_mode: KeyMode,

    /// Requests allowed per token before a reset is required.
    #[serde(default = "default_request_limit")]
    pub request_limit: u32,

    /// Increments between counter checkpoints.
    #[serde(default = "default_persist_interval")]
    pub persist_interval: u32,
}

fn default_request_limit() -> u32 {
    REQUEST_LIMIT
}

fn default_persist_interval() -> u32 {
    PERSIST_INTERVAL
}

impl CryptoConfig {
    fn validate(&self) -> Result<()> {
        if self.request_limit == 0 {
            return Err(ServerError::config_invalid(
                "crypto.request_limit",
                "must be greater than 0",
            ));
        }
        if self.persist_interval == 0 {
            return Err(ServerError::config_invalid(
                "crypto.persist_interval",
                "must be greater than 0",
            ));
        }
        Ok(())
    }
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            key_mode: KeyMode::default(),
            request_limit: default_request_limit(),
            persist_interval: default_persist_interval(),
        }
    }
}

// ============================================
// LoggingConfig
// ============================================

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.listen_addr().port(), 99);
        assert_eq!(config.wol_target().to_string(), "255.255.255.255:9");
        assert_eq!(config.read_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
            [device]
            device_id = "WL-GARAGE"
            token = "0123456789abcdef0123456789abcdef"

            [network]
            listen_addr = "127.0.0.1:9099"
            read_timeout_ms = 250

            [wol]
            broadcast_addr = "192.168.1.255"
            port = 7

            [storage]
            path = "/tmp/eeprom.bin"
            counter_offset = 0

            [crypto]
            key_mode = "separated"
            request_limit = 50

            [logging]
            level = "debug"
        "#;

        let config = ServerConfig::from_str(toml).unwrap();
        assert_eq!(config.device.device_id, "WL-GARAGE");
        assert_eq!(config.listen_addr().port(), 9099);
        assert_eq!(config.wol_target().to_string(), "192.168.1.255:7");
        assert_eq!(config.storage.capacity, 512);
        assert_eq!(config.crypto.key_mode, KeyMode::Separated);
        assert_eq!(config.logging.level, "debug");

        let channel = config.channel_config();
        assert_eq!(channel.device_id, "WL-GARAGE");
        assert_eq!(channel.counter.offset, 0);
        assert_eq!(channel.counter.limit, 50);
        assert_eq!(channel.counter.persist_interval, 10);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = ServerConfig::from_str("").unwrap();
        assert_eq!(config.device.device_id, "WL-0001");
        assert_eq!(config.crypto.key_mode, KeyMode::Shared);
        assert_eq!(config.storage.counter_offset, 386);
    }

    #[test]
    fn test_invalid_fields() {
        let short_token = "[device]\ntoken = \"short\"\n";
        let err = ServerConfig::from_str(short_token).unwrap_err();
        assert!(matches!(err, ServerError::ConfigInvalid { ref field, .. } if field == "device.token"));

        let bad_offset = "[storage]\ncapacity = 64\ncounter_offset = 60\n";
        let err = ServerConfig::from_str(bad_offset).unwrap_err();
        assert!(matches!(err, ServerError::ConfigInvalid { ref field, .. } if field == "storage.counter_offset"));

        let zero_limit = "[crypto]\nrequest_limit = 0\n";
        assert!(ServerConfig::from_str(zero_limit).unwrap_err().is_config_error());

        let blank_id = "[device]\ndevice_id = \"  \"\n";
        assert!(ServerConfig::from_str(blank_id).is_err());
    }

    #[test]
    fn test_to_toml_reparses() {
        let mut config = ServerConfig::default();
        config.device.device_id = "WL-42".to_string();
        let reparsed = ServerConfig::from_str(&config.to_toml()).unwrap();
        assert_eq!(reparsed.device.device_id, "WL-42");
        assert_eq!(reparsed.listen_addr(), config.listen_addr());
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let err = ServerConfig::load("/nonexistent/wakelink.toml").await.unwrap_err();
        assert!(err.is_fatal());
    }
}
