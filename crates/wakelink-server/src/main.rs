// ============================================
// File: crates/wakelink-server/src/main.rs
// ============================================
//! # WakeLink Device Entry Point
//!
//! ## Creation Reason
//! Main entry point for the WakeLink device daemon binary. Also carries a
//! small client mode for sending commands to a device.
//!
//! ## Main Functionality
//! - CLI argument parsing with clap
//! - Logging initialization with tracing
//! - Configuration loading
//! - Token provisioning and offline counter reset
//! - Daemon execution
//!
//! ## Usage
//! ```bash
//! # Start the device (generates a token on first run)
//! wakelink-server start
//!
//! # Show or rotate the provisioned token
//! wakelink-server token
//! wakelink-server token --rotate
//!
//! # Other commands
//! wakelink-server validate                # Validate config file
//! wakelink-server reset-counter           # Reopen the replay window offline
//! wakelink-server send --host 192.168.1.50 --token <TOKEN> \
//!     --device-id WL-0001 wake --data '{"mac":"AA:BB:CC:DD:EE:FF"}'
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Port 99 needs root or CAP_NET_BIND_SERVICE
//! - `token` prints the secret to stdout; that is its purpose
//! - Run `reset-counter` only while the daemon is stopped
//!
//! ## Last Modified
//! v0.1.0 - Initial CLI implementation

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter, Registry};

use wakelink_core::counter::ReplayCounter;
use wakelink_core::crypto::{DeviceToken, KeyMode};
use wakelink_core::OsRandom;
use wakelink_server::config::DEFAULT_CONFIG_PATH;
use wakelink_server::services::TokenStore;
use wakelink_server::{DeviceClient, FileStorage, Server, ServerConfig};

// ============================================
// CLI Definition
// ============================================

/// WakeLink device daemon
///
/// Accepts signed, encrypted commands over TCP and sends Wake-on-LAN
/// packets on the local network.
#[derive(Parser, Debug)]
#[command(name = "wakelink-server")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the device daemon
    Start {
        /// Path to configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },

    /// Validate configuration file
    Validate {
        /// Path to configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },

    /// Show the provisioned device token
    Token {
        /// Path to configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        /// Generate and save a new token, resetting the replay counter
        #[arg(long)]
        rotate: bool,
    },

    /// Reset the persisted replay counter (daemon must be stopped)
    ResetCounter {
        /// Path to configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },

    /// Send one command to a device and print the reply
    Send {
        /// Device host name or IP address
        #[arg(long)]
        host: String,

        /// Device TCP port
        #[arg(long, default_value_t = 99)]
        port: u16,

        /// Device token
        #[arg(long)]
        token: String,

        /// Device id placed in the outer envelope
        #[arg(long, default_value = "WL-0001")]
        device_id: String,

        /// Key derivation mode: shared or separated
        #[arg(long, default_value = "shared")]
        key_mode: String,

        /// Connect and reply timeout in seconds
        #[arg(long, default_value_t = 10)]
        timeout: u64,

        /// Command name (ping, wake, info, ...)
        command: String,

        /// Command data as a JSON object
        #[arg(long)]
        data: Option<String>,
    },
}

// ============================================
// Main
// ============================================

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_handle = init_logging("info");

    let result = match cli.command {
        Commands::Start { config } => cmd_start(config, log_handle.as_ref()).await,
        Commands::Validate { config } => cmd_validate(config).await,
        Commands::Token { config, rotate } => cmd_token(config, rotate).await,
        Commands::ResetCounter { config } => cmd_reset_counter(config).await,
        Commands::Send {
            host,
            port,
            token,
            device_id,
            key_mode,
            timeout,
            command,
            data,
        } => cmd_send(host, port, token, device_id, key_mode, timeout, command, data).await,
    };

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

// ============================================
// Commands
// ============================================

/// Starts the daemon.
async fn cmd_start(config_path: PathBuf, log_handle: Option<&LogHandle>) -> anyhow::Result<()> {
    let config = load_or_default_config(&config_path).await?;

    if let Some(handle) = log_handle {
        apply_log_level(handle, filter_for(&config.logging.level));
    }

    info!("════════════════════════════════════════");
    info!("Device ID:  {}", config.device.device_id);
    info!("Listen:     {}", config.listen_addr());
    info!("WoL target: {}", config.wol_target());
    info!("Key mode:   {}", config.crypto.key_mode);
    info!("════════════════════════════════════════");

    let server = Server::new(config);
    server.run().await?;

    Ok(())
}

/// Validates configuration file.
async fn cmd_validate(config_path: PathBuf) -> anyhow::Result<()> {
    if !config_path.exists() {
        println!("⚠️  Config file not found: {}", config_path.display());
        println!("   Device will use default values.");
        return Ok(());
    }

    let config = ServerConfig::load(&config_path).await?;

    println!("✅ Configuration is valid");
    println!();
    println!("Device:");
    println!("   ID:          {}", config.device.device_id);
    if config.device.token.is_some() {
        println!("   Token:       inline (device.token)");
    } else {
        println!("   Token file:  {}", config.device.token_file);
    }
    println!();
    println!("Network:");
    println!("   Listen:      {}", config.listen_addr());
    println!("   Timeout:     {}ms", config.network.read_timeout_ms);
    println!();
    println!("Wake-on-LAN:");
    println!("   Target:      {}", config.wol_target());
    println!();
    println!("Storage:");
    println!("   Image:       {}", config.storage.path);
    println!("   Capacity:    {} bytes", config.storage.capacity);
    println!("   Counter at:  {}", config.storage.counter_offset);
    println!();
    println!("Crypto:");
    println!("   Key mode:    {}", config.crypto.key_mode);
    println!("   Limit:       {} requests", config.crypto.request_limit);
    println!();

    Ok(())
}

/// Prints or rotates the device token.
async fn cmd_token(config_path: PathBuf, rotate: bool) -> anyhow::Result<()> {
    let config = load_or_default_config(&config_path).await?;
    let store = TokenStore::from_config(&config.device);

    if rotate {
        let token = DeviceToken::generate(&OsRandom);
        store.save(&token).await?;

        let storage = FileStorage::open(&config.storage.path, config.storage.capacity)?;
        let mut counter = ReplayCounter::new(Box::new(storage), config.channel_config().counter);
        counter.reset()?;

        println!("{}", token.expose());
        return Ok(());
    }

    if let Some(inline) = &config.device.token {
        println!("{inline}");
        return Ok(());
    }

    match store.load().await? {
        Some(token) => {
            println!("{}", token.expose());
            Ok(())
        }
        None => bail!(
            "no token at {}; run `wakelink-server start` or `token --rotate` first",
            store.path().display()
        ),
    }
}

/// Resets the persisted replay counter.
async fn cmd_reset_counter(config_path: PathBuf) -> anyhow::Result<()> {
    let config = load_or_default_config(&config_path).await?;

    let storage = FileStorage::open(&config.storage.path, config.storage.capacity)?;
    let mut counter = ReplayCounter::new(Box::new(storage), config.channel_config().counter);
    counter.load()?;
    let before = counter.value();
    counter.reset()?;

    println!("✅ Replay counter reset ({before} → 0 of {})", counter.limit());
    Ok(())
}

/// Sends one command to a device.
#[allow(clippy::too_many_arguments)]
async fn cmd_send(
    host: String,
    port: u16,
    token: String,
    device_id: String,
    key_mode: String,
    timeout: u64,
    command: String,
    data: Option<String>,
) -> anyhow::Result<()> {
    let key_mode = parse_key_mode(&key_mode)?;
    let data = parse_data(data.as_deref())?;

    let addr = tokio::net::lookup_host((host.as_str(), port))
        .await
        .with_context(|| format!("resolving {host}"))?
        .next()
        .ok_or_else(|| anyhow!("no address for {host}"))?;

    let client = DeviceClient::new(addr, &device_id, &token, key_mode)?
        .with_timeout(Duration::from_secs(timeout));
    let reply = client.send(&command, data).await?;

    println!("{}", serde_json::to_string_pretty(&Value::Object(reply))?);
    Ok(())
}

// ============================================
// Helper Functions
// ============================================

/// Handle used to swap the level filter once the config is loaded.
type LogHandle = reload::Handle<EnvFilter, Registry>;

/// Installs the tracing subscriber with a reloadable level filter.
fn init_logging(level: &str) -> Option<LogHandle> {
    let (filter, handle) = reload::Layer::new(filter_for(level));

    match tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init()
    {
        Ok(()) => Some(handle),
        Err(e) => {
            eprintln!("Failed to install logger: {e}");
            None
        }
    }
}

/// Builds the filter for `level`; `RUST_LOG` takes precedence.
fn filter_for(level: &str) -> EnvFilter {
    filter_from(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref(), level)
}

fn filter_from(env: Option<&str>, level: &str) -> EnvFilter {
    env.and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(level))
}

fn apply_log_level(handle: &LogHandle, filter: EnvFilter) {
    if let Err(e) = handle.reload(filter) {
        warn!("Failed to apply configured log level: {}", e);
    }
}

/// Loads config, or returns defaults if the file does not exist.
async fn load_or_default_config(path: &Path) -> anyhow::Result<ServerConfig> {
    if path.exists() {
        Ok(ServerConfig::load(path).await?)
    } else {
        info!("Config file not found, using defaults");
        Ok(ServerConfig::default())
    }
}

fn parse_key_mode(raw: &str) -> anyhow::Result<KeyMode> {
    match raw {
        "shared" => Ok(KeyMode::Shared),
        "separated" => Ok(KeyMode::Separated),
        other => bail!("unknown key mode '{other}' (expected shared or separated)"),
    }
}

fn parse_data(raw: Option<&str>) -> anyhow::Result<Map<String, Value>> {
    let Some(raw) = raw else {
        return Ok(Map::new());
    };
    match serde_json::from_str(raw).context("--data is not valid JSON")? {
        Value::Object(map) => Ok(map),
        _ => bail!("--data must be a JSON object"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;

    #[test]
    fn test_configured_level_applied_through_reload() {
        let (filter, handle) = reload::Layer::new(filter_from(None, "info"));
        let subscriber = tracing_subscriber::registry().with(filter);

        tracing::subscriber::with_default(subscriber, || {
            assert!(tracing::enabled!(Level::INFO));
            assert!(!tracing::enabled!(Level::DEBUG));

            apply_log_level(&handle, filter_from(None, "debug"));
            assert!(tracing::enabled!(Level::DEBUG));
        });
    }

    #[test]
    fn test_env_directives_override_configured_level() {
        let (filter, _handle) = reload::Layer::new(filter_from(Some("warn"), "debug"));
        let subscriber = tracing_subscriber::registry().with(filter);

        tracing::subscriber::with_default(subscriber, || {
            assert!(tracing::enabled!(Level::WARN));
            assert!(!tracing::enabled!(Level::INFO));
        });
    }

    #[test]
    fn test_parse_key_mode() {
        assert_eq!(parse_key_mode("shared").unwrap(), KeyMode::Shared);
        assert_eq!(parse_key_mode("separated").unwrap(), KeyMode::Separated);
        assert!(parse_key_mode("hkdf").is_err());
    }

    #[test]
    fn test_parse_data() {
        assert!(parse_data(None).unwrap().is_empty());
        assert_eq!(parse_data(Some(r#"{"mac":"AABBCCDDEEFF"}"#)).unwrap()["mac"], "AABBCCDDEEFF");
        assert!(parse_data(Some("[1,2]")).is_err());
        assert!(parse_data(Some("{")).is_err());
    }
}
