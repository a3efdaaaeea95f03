//! Random tokens for sessions and CSRF. The raw token travels to the client
//! (cookie or JSON); only its SHA-256 hash is ever stored server-side.

use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

pub const TOKEN_BYTES: usize = 32;

/// Generate a URL-safe random token using the OS RNG.
/// 32 bytes -> ~43 chars of Base64 URL-safe, no padding.
pub fn generate_token() -> String {
    let mut rng = OsRng;
    generate_token_with(&mut rng, TOKEN_BYTES)
}

pub fn generate_token_with<R: RngCore>(rng: &mut R, nbytes: usize) -> String {
    let mut buf = vec![0u8; nbytes];
    rng.fill_bytes(&mut buf);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf)
}

/// Hash a raw token for storage or lookup.
pub fn hash_token(token: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    let out = hasher.finalize();
    let mut arr = [0u8; 32];
    arr.copy_from_slice(&out);
    arr
}

/// Constant-time-ish compare; used for CSRF token checks.
pub fn tokens_match(a: &str, b: &str) -> bool {
    let (ha, hb) = (hash_token(a), hash_token(b));
    let mut diff: u8 = 0;
    for (x, y) in ha.iter().zip(hb.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
