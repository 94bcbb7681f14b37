// ============================================
// File: crates/wakelink-core/src/crypto/kdf.rs
// ============================================
//! # Key Derivation
//!
//! ## Creation Reason
//! Turns the device token into the cipher and MAC keys of a channel.
//!
//! ## Main Functionality
//! - `KeyMode::Shared`: one SHA-256 pass; the digest is both keys.
//!   This is what deployed firmware and clients expect.
//! - `KeyMode::Separated`: HMAC-labelled keys derived from that digest,
//!   so the cipher key and MAC key are independent
//! - `derive_keys`: Applies the selected mode
//!
//! ## Derivation
//! ```text
//! root = SHA-256(token)
//!
//! Shared:     cipher = root
//!             mac    = root
//!
//! Separated:  cipher = HMAC(root, "wakelink/v1/cipher")
//!             mac    = HMAC(root, "wakelink/v1/mac")
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Both peers must use the same mode or every signature check fails
//! - Changing the token changes both keys in lockstep
//!
//! ## Last Modified
//! v0.1.0 - Initial key derivation

use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::Zeroize;

use super::hmac::hmac_sha256;
use super::keys::{ChannelKeys, CipherKey, DeviceToken, MacKey};
use super::sha256;

// ============================================
// Constants
// ============================================

/// Label for the separated-mode cipher key.
pub const CIPHER_KEY_LABEL: &[u8] = b"wakelink/v1/cipher";

/// Label for the separated-mode MAC key.
pub const MAC_KEY_LABEL: &[u8] = b"wakelink/v1/mac";

// ============================================
// KeyMode
// ============================================

/// How the cipher and MAC keys relate to each other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyMode {
    /// One digest used as both keys (wire-compatible default).
    #[default]
    Shared,
    /// Domain-separated keys.
    Separated,
}

impl std::fmt::Display for KeyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Shared => f.write_str("shared"),
            Self::Separated => f.write_str("separated"),
        }
    }
}

// ============================================
// Derivation
// ============================================

/// Derives the channel keys for `token`.
#[must_use]
pub fn derive_keys(token: &DeviceToken, mode: KeyMode) -> ChannelKeys {
    let mut root = sha256::digest(token.as_bytes());

    let keys = match mode {
        KeyMode::Shared => ChannelKeys {
            cipher: CipherKey::from_bytes(root),
            mac: MacKey::from_bytes(root),
        },
        KeyMode::Separated => ChannelKeys {
            cipher: CipherKey::from_bytes(hmac_sha256(&root, CIPHER_KEY_LABEL)),
            mac: MacKey::from_bytes(hmac_sha256(&root, MAC_KEY_LABEL)),
        },
    };

    root.zeroize();
    debug!(mode = %mode, "Derived channel keys");
    keys
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_shared_mode_uses_digest_for_both() {
        let token = DeviceToken::new(TOKEN).unwrap();
        let keys = derive_keys(&token, KeyMode::Shared);

        assert!(keys.is_shared());
        assert_eq!(keys.cipher.as_bytes(), &sha256::digest(TOKEN.as_bytes()));
    }

    #[test]
    fn test_separated_mode_splits_keys() {
        let token = DeviceToken::new(TOKEN).unwrap();
        let keys = derive_keys(&token, KeyMode::Separated);

        assert!(!keys.is_shared());
        assert_ne!(keys.cipher.as_bytes(), &sha256::digest(TOKEN.as_bytes()));
    }

    #[test]
    fn test_token_change_changes_keys() {
        let a = derive_keys(&DeviceToken::new(TOKEN).unwrap(), KeyMode::Shared);
        let b = derive_keys(
            &DeviceToken::new("0123456789abcdef0123456789abcdeF").unwrap(),
            KeyMode::Shared,
        );
        assert_ne!(a.cipher, b.cipher);
        assert_ne!(a.mac, b.mac);
    }

    #[test]
    fn test_key_mode_serde() {
        #[derive(Deserialize)]
        struct Wrapper {
            mode: KeyMode,
        }
        let w: Wrapper = serde_json::from_str(r#"{"mode":"separated"}"#).unwrap();
        assert_eq!(w.mode, KeyMode::Separated);
        assert_eq!(KeyMode::default(), KeyMode::Shared);
    }
}
