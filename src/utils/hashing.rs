use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 digest of `bytes`, used both for content-addressed
/// blob keys and for the price signature (§4.5.1).
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
