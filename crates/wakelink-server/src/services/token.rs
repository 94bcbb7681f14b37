// ============================================
// File: crates/wakelink-server/src/services/token.rs
// ============================================
//! # Token Store
//!
//! ## Creation Reason
//! The device token is the only long-term secret. It is either configured
//! inline, or kept in a file the daemon creates on first start and
//! rewrites on `update_token`.
//!
//! ## Main Functionality
//! - `TokenStore`: Load, save and first-start generation
//! - `TokenSource`: Where the active token came from
//!
//! ## ⚠️ Important Note for Next Developer
//! - The file is written with mode 0600 on Unix
//! - Never log the token itself, only its length and origin
//!
//! ## Last Modified
//! v0.1.0 - Initial token store

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use wakelink_core::crypto::DeviceToken;
use wakelink_core::SecureChannel;

use crate::config::DeviceConfig;
use crate::error::{Result, ServerError};

// ============================================
// TokenSource
// ============================================

/// Origin of the token a daemon started with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    /// `device.token` in the config file.
    Inline,
    /// Read from `device.token_file`.
    File,
    /// Generated because no token existed yet.
    Generated,
}

// ============================================
// TokenStore
// ============================================

/// File holding the device token.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
    inline: bool,
}

impl TokenStore {
    /// Creates a store for `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            inline: false,
        }
    }

    /// Creates the store described by the `[device]` section.
    #[must_use]
    pub fn from_config(config: &DeviceConfig) -> Self {
        Self {
            path: PathBuf::from(&config.token_file),
            inline: config.token.is_some(),
        }
    }

    /// Returns the token file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the token file, returning `None` if it does not exist.
    ///
    /// # Errors
    /// Returns `TokenFile` if the file is unreadable or the token is too short.
    pub async fn load(&self) -> Result<Option<DeviceToken>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => {
                let token = DeviceToken::new(content.trim())
                    .map_err(|e| ServerError::token_file(self.display(), e.to_string()))?;
                Ok(Some(token))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ServerError::token_file(self.display(), e.to_string())),
        }
    }

    /// Writes `token` to the file, creating parent directories.
    ///
    /// # Errors
    /// Returns `TokenFile` if the file cannot be written.
    pub async fn save(&self, token: &DeviceToken) -> Result<()> {
        if self.inline {
            warn!(
                path = %self.display(),
                "Inline device.token is configured and will override the saved token on restart"
            );
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| ServerError::token_file(self.display(), e.to_string()))?;
            }
        }

        tokio::fs::write(&self.path, format!("{}\n", token.expose()))
            .await
            .map_err(|e| ServerError::token_file(self.display(), e.to_string()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            tokio::fs::set_permissions(&self.path, perms)
                .await
                .map_err(|e| ServerError::token_file(self.display(), e.to_string()))?;
        }

        info!(path = %self.display(), len = token.len(), "Device token saved");
        Ok(())
    }

    /// Resolves the token to start with: inline config, then the file,
    /// then a freshly generated one that is saved before use.
    ///
    /// # Errors
    /// Returns `ConfigInvalid` for a short inline token, or `TokenFile`.
    pub async fn resolve(
        &self,
        config: &DeviceConfig,
        channel: &SecureChannel,
    ) -> Result<(DeviceToken, TokenSource)> {
        if let Some(inline) = &config.token {
            let token = DeviceToken::new(inline.as_str())
                .map_err(|e| ServerError::config_invalid("device.token", e.to_string()))?;
            return Ok((token, TokenSource::Inline));
        }

        if let Some(token) = self.load().await? {
            return Ok((token, TokenSource::File));
        }

        let token = channel.generate_token();
        self.save(&token).await?;
        info!(path = %self.display(), "Generated new device token");
        Ok((token, TokenSource::Generated))
    }

    fn display(&self) -> String {
        self.path.display().to_string()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use wakelink_common::ManualClock;
    use wakelink_core::{ChannelConfig, MemoryStorage, SeededRandom};

    const TOKEN: &str = "0123456789abcdef0123456789abcdef";

    fn channel() -> SecureChannel {
        SecureChannel::new(
            ChannelConfig::new("WL-TEST"),
            Box::new(MemoryStorage::default()),
            Arc::new(SeededRandom::new(7)),
            Arc::new(ManualClock::new(0)),
        )
    }

    #[tokio::test]
    async fn test_missing_file_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token"));
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("etc").join("token"));
        let token = DeviceToken::new(TOKEN).unwrap();

        store.save(&token).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(token));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[tokio::test]
    async fn test_short_file_token_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token");
        std::fs::write(&path, "tooshort\n").unwrap();

        let err = TokenStore::new(&path).load().await.unwrap_err();
        assert!(matches!(err, ServerError::TokenFile { .. }));
    }

    #[tokio::test]
    async fn test_resolve_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = DeviceConfig {
            token_file: dir.path().join("token").display().to_string(),
            ..DeviceConfig::default()
        };
        let store = TokenStore::from_config(&config);
        let channel = channel();

        let (generated, source) = store.resolve(&config, &channel).await.unwrap();
        assert_eq!(source, TokenSource::Generated);
        assert_eq!(generated.len(), 96);

        let (loaded, source) = store.resolve(&config, &channel).await.unwrap();
        assert_eq!(source, TokenSource::File);
        assert_eq!(loaded, generated);

        config.token = Some(TOKEN.to_string());
        let (inline, source) = store.resolve(&config, &channel).await.unwrap();
        assert_eq!(source, TokenSource::Inline);
        assert_eq!(inline.expose(), TOKEN);
    }
}
