use sha2::{Digest, Sha256};

/// SHA-256 of `data` as a lowercase hex string.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Verify that `data` hashes to `expected` (lowercase hex).
pub fn verify_sha256_hex(data: &[u8], expected: &str) -> bool {
    sha256_hex(data) == expected
}
