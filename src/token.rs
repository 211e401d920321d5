use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Generate a fresh API token. Only its hash is ever persisted.
pub fn generate_token() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Compute the SHA-256 hash of an API token
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}
