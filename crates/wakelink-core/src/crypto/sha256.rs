// ============================================
// File: crates/wakelink-core/src/crypto/sha256.rs
// ============================================
//! # SHA-256 Hash Engine
//!
//! ## Creation Reason
//! Streaming SHA-256 (FIPS 180-4) used for key derivation and as the
//! compression function under HMAC. Firmware peers carry the same
//! implementation, so it lives here without external hashing crates.
//!
//! ## Main Functionality
//! - `Sha256`: Incremental hasher (`new` / `update` / `finalize`)
//! - `digest`: One-shot helper
//!
//! ## Padding
//! ```text
//! ┌──────────────┬──────┬──────────────┬──────────────────────┐
//! │ message      │ 0x80 │ 0x00 ...     │ bit length (u64 BE)  │
//! └──────────────┴──────┴──────────────┴──────────────────────┘
//!                 total is a multiple of 64 bytes
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Cross-checked against `sha2` in tests at block boundaries
//! - `finalize` consumes the hasher; call `reset` to reuse a value
//!
//! ## Last Modified
//! v0.1.0 - Initial hash engine

use zeroize::Zeroize;

use super::SHA256_DIGEST_SIZE;

// ============================================
// Constants
// ============================================

/// Block size of SHA-256 in bytes.
pub const BLOCK_SIZE: usize = 64;

/// Offset at which the 64-bit length field starts inside the last block.
const LENGTH_OFFSET: usize = 56;

const INITIAL_STATE: [u32; 8] = [
    0x6a09_e667, 0xbb67_ae85, 0x3c6e_f372, 0xa54f_f53a,
    0x510e_527f, 0x9b05_688c, 0x1f83_d9ab, 0x5be0_cd19,
];

const ROUND_CONSTANTS: [u32; 64] = [
    0x428a_2f98, 0x7137_4491, 0xb5c0_fbcf, 0xe9b5_dba5, 0x3956_c25b, 0x59f1_11f1, 0x923f_82a4, 0xab1c_5ed5,
    0xd807_aa98, 0x1283_5b01, 0x2431_85be, 0x550c_7dc3, 0x72be_5d74, 0x80de_b1fe, 0x9bdc_06a7, 0xc19b_f174,
    0xe49b_69c1, 0xefbe_4786, 0x0fc1_9dc6, 0x240c_a1cc, 0x2de9_2c6f, 0x4a74_84aa, 0x5cb0_a9dc, 0x76f9_88da,
    0x983e_5152, 0xa831_c66d, 0xb003_27c8, 0xbf59_7fc7, 0xc6e0_0bf3, 0xd5a7_9147, 0x06ca_6351, 0x1429_2967,
    0x27b7_0a85, 0x2e1b_2138, 0x4d2c_6dfc, 0x5338_0d13, 0x650a_7354, 0x766a_0abb, 0x81c2_c92e, 0x9272_2c85,
    0xa2bf_e8a1, 0xa81a_664b, 0xc24b_8b70, 0xc76c_51a3, 0xd192_e819, 0xd699_0624, 0xf40e_3585, 0x106a_a070,
    0x19a4_c116, 0x1e37_6c08, 0x2748_774c, 0x34b0_bcb5, 0x391c_0cb3, 0x4ed8_aa4a, 0x5b9c_ca4f, 0x682e_6ff3,
    0x748f_82ee, 0x78a5_636f, 0x84c8_7814, 0x8cc7_0208, 0x90be_fffa, 0xa450_6ceb, 0xbef9_a3f7, 0xc671_78f2,
];

// ============================================
// Sha256
// ============================================

/// Incremental SHA-256 hasher.
///
/// # Example
/// ```
/// use wakelink_core::crypto::sha256::Sha256;
///
/// let mut hasher = Sha256::new();
/// hasher.update(b"ab");
/// hasher.update(b"c");
/// let digest = hasher.finalize();
///
/// assert_eq!(
///     hex::encode(digest),
///     "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
/// );
/// ```
#[derive(Clone)]
pub struct Sha256 {
    state: [u32; 8],
    buffer: [u8; BLOCK_SIZE],
    buffer_len: usize,
    /// Total message length in bits, modulo 2^64.
    bit_len: u64,
}

impl Sha256 {
    /// Creates a hasher loaded with the standard initial hash words.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: INITIAL_STATE,
            buffer: [0u8; BLOCK_SIZE],
            buffer_len: 0,
            bit_len: 0,
        }
    }

    /// Returns the hasher to its initial state.
    pub fn reset(&mut self) {
        self.state = INITIAL_STATE;
        self.buffer.zeroize();
        self.buffer_len = 0;
        self.bit_len = 0;
    }

    /// Absorbs `data`. May be called any number of times.
    pub fn update(&mut self, mut data: &[u8]) {
        self.bit_len = self.bit_len.wrapping_add((data.len() as u64).wrapping_mul(8));

        // Top up a partially filled buffer first
        if self.buffer_len > 0 {
            let take = (BLOCK_SIZE - self.buffer_len).min(data.len());
            self.buffer[self.buffer_len..self.buffer_len + take].copy_from_slice(&data[..take]);
            self.buffer_len += take;
            data = &data[take..];

            if self.buffer_len < BLOCK_SIZE {
                return;
            }
            let block = self.buffer;
            compress(&mut self.state, &block);
            self.buffer_len = 0;
        }

        let mut blocks = data.chunks_exact(BLOCK_SIZE);
        for block in &mut blocks {
            let mut owned = [0u8; BLOCK_SIZE];
            owned.copy_from_slice(block);
            compress(&mut self.state, &owned);
        }

        let rest = blocks.remainder();
        self.buffer[..rest.len()].copy_from_slice(rest);
        self.buffer_len = rest.len();
    }

    /// Pads the message, runs the final compression and returns the digest.
    #[must_use]
    pub fn finalize(mut self) -> [u8; SHA256_DIGEST_SIZE] {
        let bit_len = self.bit_len;

        self.buffer[self.buffer_len] = 0x80;
        self.buffer_len += 1;

        // No room for the length field: close this block and start another
        if self.buffer_len > LENGTH_OFFSET {
            self.buffer[self.buffer_len..].fill(0);
            let block = self.buffer;
            compress(&mut self.state, &block);
            self.buffer_len = 0;
        }

        self.buffer[self.buffer_len..LENGTH_OFFSET].fill(0);
        self.buffer[LENGTH_OFFSET..].copy_from_slice(&bit_len.to_be_bytes());
        let block = self.buffer;
        compress(&mut self.state, &block);

        let mut out = [0u8; SHA256_DIGEST_SIZE];
        for (chunk, word) in out.chunks_exact_mut(4).zip(self.state.iter()) {
            chunk.copy_from_slice(&word.to_be_bytes());
        }
        out
    }
}

impl Default for Sha256 {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Sha256 {
    fn drop(&mut self) {
        // The buffer may hold secret bytes when hashing key material
        self.buffer.zeroize();
        self.state.zeroize();
    }
}

impl std::fmt::Debug for Sha256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sha256")
            .field("buffered", &self.buffer_len)
            .field("bit_len", &self.bit_len)
            .finish_non_exhaustive()
    }
}

/// Hashes `data` in one call.
#[must_use]
pub fn digest(data: &[u8]) -> [u8; SHA256_DIGEST_SIZE] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize()
}

// ============================================
// Compression Function
// ============================================

#[inline]
const fn big_sigma0(x: u32) -> u32 {
    x.rotate_right(2) ^ x.rotate_right(13) ^ x.rotate_right(22)
}

#[inline]
const fn big_sigma1(x: u32) -> u32 {
    x.rotate_right(6) ^ x.rotate_right(11) ^ x.rotate_right(25)
}

#[inline]
const fn small_sigma0(x: u32) -> u32 {
    x.rotate_right(7) ^ x.rotate_right(18) ^ (x >> 3)
}

#[inline]
const fn small_sigma1(x: u32) -> u32 {
    x.rotate_right(17) ^ x.rotate_right(19) ^ (x >> 10)
}

fn compress(state: &mut [u32; 8], block: &[u8; BLOCK_SIZE]) {
    let mut w = [0u32; 64];
    for (i, chunk) in block.chunks_exact(4).enumerate() {
        w[i] = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    for i in 16..64 {
        w[i] = small_sigma1(w[i - 2])
            .wrapping_add(w[i - 7])
            .wrapping_add(small_sigma0(w[i - 15]))
            .wrapping_add(w[i - 16]);
    }

    let [mut a, mut b, mut c, mut d, mut e, mut f, mut g, mut h] = *state;

    for i in 0..64 {
        let ch = (e & f) ^ (!e & g);
        let maj = (a & b) ^ (a & c) ^ (b & c);
        let t1 = h
            .wrapping_add(big_sigma1(e))
            .wrapping_add(ch)
            .wrapping_add(ROUND_CONSTANTS[i])
            .wrapping_add(w[i]);
        let t2 = big_sigma0(a).wrapping_add(maj);

        h = g;
        g = f;
        f = e;
        e = d.wrapping_add(t1);
        d = c;
        c = b;
        b = a;
        a = t1.wrapping_add(t2);
    }

    for (word, add) in state.iter_mut().zip([a, b, c, d, e, f, g, h]) {
        *word = word.wrapping_add(add);
    }

    w.zeroize();
}

// ============================================
// Tests
// ============================================
