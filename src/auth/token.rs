// src/auth/token.rs
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

pub const DEFAULT_TOKEN_BYTES: usize = 32;
pub const ID_BYTES: usize = 15;

/// 32 random bytes; the raw value goes in the cookie, only its hash is stored.
pub fn generate_session_token() -> String {
    generate_token(&mut OsRng, DEFAULT_TOKEN_BYTES)
}

/// Shorter opaque id for documents (pending changes, stored uploads).
/// 15 bytes encode to exactly 20 characters.
pub fn generate_id() -> String {
    generate_token(&mut OsRng, ID_BYTES)
}

/// Generate a URL-safe token from random bytes (base64 URL-safe, no padding).
pub fn generate_token<R: RngCore>(rng: &mut R, nbytes: usize) -> String {
    let mut buf = vec![0u8; nbytes];
    rng.fill_bytes(&mut buf);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(&buf)
}

/// SHA-256 of a token. Only this is stored.
pub fn hash_token(token: &str) -> [u8; 32] {
    let out = Sha256::digest(token.as_bytes());
    let mut arr = [0u8; 32];
    arr.copy_from_slice(&out);
    arr
}
