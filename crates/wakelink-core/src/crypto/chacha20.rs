// ============================================
// File: crates/wakelink-core/src/crypto/chacha20.rs
// ============================================
//! # ChaCha20 Stream Cipher
//!
//! ## Creation Reason
//! RFC 8439 ChaCha20 (256-bit key, 96-bit nonce, 32-bit block counter)
//! for payload confidentiality. There is no Poly1305 tag: integrity comes
//! from the HMAC over the outer envelope.
//!
//! ## Main Functionality
//! - `block`: One 64-byte keystream block
//! - `apply_keystream`: XOR data in place starting at a given counter
//! - `encrypt` / `decrypt`: Same XOR, starting at counter 0
//!
//! ## State Layout
//! ```text
//! ┌──────────┬──────────┬──────────┬──────────┐
//! │ const    │ const    │ const    │ const    │
//! │ key      │ key      │ key      │ key      │
//! │ key      │ key      │ key      │ key      │
//! │ counter  │ nonce    │ nonce    │ nonce    │
//! └──────────┴──────────┴──────────┴──────────┘
//!        all words little-endian
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Reusing a (key, nonce) pair leaks the XOR of two plaintexts
//! - Callers must draw a fresh nonce per message
//!
//! ## Last Modified
//! v0.1.0 - Initial cipher implementation

use zeroize::Zeroize;

use super::{CHACHA20_KEY_SIZE, CHACHA20_NONCE_SIZE};

// ============================================
// Constants
// ============================================

/// Keystream block size in bytes.
pub const BLOCK_SIZE: usize = 64;

/// "expand 32-byte k"
const SIGMA: [u32; 4] = [0x6170_7865, 0x3320_646e, 0x7962_2d32, 0x6b20_6574];

// ============================================
// Block Function
// ============================================

#[inline]
fn quarter_round(state: &mut [u32; 16], a: usize, b: usize, c: usize, d: usize) {
    state[a] = state[a].wrapping_add(state[b]);
    state[d] = (state[d] ^ state[a]).rotate_left(16);

    state[c] = state[c].wrapping_add(state[d]);
    state[b] = (state[b] ^ state[c]).rotate_left(12);

    state[a] = state[a].wrapping_add(state[b]);
    state[d] = (state[d] ^ state[a]).rotate_left(8);

    state[c] = state[c].wrapping_add(state[d]);
    state[b] = (state[b] ^ state[c]).rotate_left(7);
}

#[inline]
fn le_word(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Produces one keystream block.
#[must_use]
pub fn block(
    key: &[u8; CHACHA20_KEY_SIZE],
    nonce: &[u8; CHACHA20_NONCE_SIZE],
    counter: u32,
) -> [u8; BLOCK_SIZE] {
    let mut state = [0u32; 16];
    state[..4].copy_from_slice(&SIGMA);
    for (word, chunk) in state[4..12].iter_mut().zip(key.chunks_exact(4)) {
        *word = le_word(chunk);
    }
    state[12] = counter;
    for (word, chunk) in state[13..].iter_mut().zip(nonce.chunks_exact(4)) {
        *word = le_word(chunk);
    }

    let mut working = state;
    for _ in 0..10 {
        // Column pass
        quarter_round(&mut working, 0, 4, 8, 12);
        quarter_round(&mut working, 1, 5, 9, 13);
        quarter_round(&mut working, 2, 6, 10, 14);
        quarter_round(&mut working, 3, 7, 11, 15);
        // Diagonal pass
        quarter_round(&mut working, 0, 5, 10, 15);
        quarter_round(&mut working, 1, 6, 11, 12);
        quarter_round(&mut working, 2, 7, 8, 13);
        quarter_round(&mut working, 3, 4, 9, 14);
    }

    let mut out = [0u8; BLOCK_SIZE];
    for ((chunk, w), s) in out.chunks_exact_mut(4).zip(working.iter()).zip(state.iter()) {
        chunk.copy_from_slice(&w.wrapping_add(*s).to_le_bytes());
    }

    state.zeroize();
    working.zeroize();
    out
}

// ============================================
// Keystream Application
// ============================================

/// XORs `data` in place with the keystream starting at block `counter`.
///
/// The final block may be partial.
pub fn apply_keystream(
    key: &[u8; CHACHA20_KEY_SIZE],
    nonce: &[u8; CHACHA20_NONCE_SIZE],
    counter: u32,
    data: &mut [u8],
) {
    let mut ctr = counter;
    for chunk in data.chunks_mut(BLOCK_SIZE) {
        let mut ks = block(key, nonce, ctr);
        for (byte, k) in chunk.iter_mut().zip(ks.iter()) {
            *byte ^= k;
        }
        ks.zeroize();
        ctr = ctr.wrapping_add(1);
    }
}

/// Encrypts `input` with the keystream starting at counter 0.
#[must_use]
pub fn encrypt(
    key: &[u8; CHACHA20_KEY_SIZE],
    nonce: &[u8; CHACHA20_NONCE_SIZE],
    input: &[u8],
) -> Vec<u8> {
    let mut out = input.to_vec();
    apply_keystream(key, nonce, 0, &mut out);
    out
}

/// Decrypts `input`. Identical to [`encrypt`].
#[must_use]
pub fn decrypt(
    key: &[u8; CHACHA20_KEY_SIZE],
    nonce: &[u8; CHACHA20_NONCE_SIZE],
    input: &[u8],
) -> Vec<u8> {
    encrypt(key, nonce, input)
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_key_block() {
        let out = block(&[0u8; 32], &[0u8; 12], 0);
        assert_eq!(
            hex::encode(out),
            "76b8e0ada0f13d90405d6ae55386bd28bdd219b8a08ded1aa836efcc8b770dc7\
             da41597c5157488d7724e03fb8d84a376a43b8f41518a11cc387b669b2ee6586"
        );
    }

    #[test]
    fn test_rfc8439_block_function() {
        let mut key = [0u8; 32];
        for (i, b) in key.iter_mut().enumerate() {
            *b = i as u8;
        }
        let nonce: [u8; 12] = [0, 0, 0, 0x09, 0, 0, 0, 0x4a, 0, 0, 0, 0];

        let out = block(&key, &nonce, 1);
        assert_eq!(
            hex::encode(out),
            "10f1e7e4d13b5915500fdd1fa32071c4c7d1f4c733c068030422aa9ac3d46c4e\
             d2826446079faa0914c2d705d98b02a2b5129cd1de164eb9cbd083e8a2503c4e"
        );
    }

    #[test]
    fn test_keystream_matches_blocks() {
        let key = [7u8; 32];
        let nonce = [3u8; 12];
        let mut data = vec![0u8; 150];
        apply_keystream(&key, &nonce, 0, &mut data);

        assert_eq!(&data[..64], &block(&key, &nonce, 0)[..]);
        assert_eq!(&data[64..128], &block(&key, &nonce, 1)[..]);
        assert_eq!(&data[128..], &block(&key, &nonce, 2)[..22]);
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = [0x42u8; 32];
        let nonce = [0x24u8; 12];
        let plaintext = b"{\"command\":\"ping\"}";

        let ciphertext = encrypt(&key, &nonce, plaintext);
        assert_ne!(&ciphertext[..], &plaintext[..]);
        assert_eq!(decrypt(&key, &nonce, &ciphertext), plaintext);
    }

    #[test]
    fn test_empty_input() {
        assert!(encrypt(&[1u8; 32], &[2u8; 12], b"").is_empty());
    }

    #[test]
    fn test_nonce_changes_output() {
        let key = [9u8; 32];
        let a = encrypt(&key, &[0u8; 12], b"same plaintext");
        let b = encrypt(&key, &[1u8; 12], b"same plaintext");
        assert_ne!(a, b);
    }
}
