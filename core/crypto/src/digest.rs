//! Content digests.

use base64::{engine::general_purpose::STANDARD, Engine};
use sha2::{Digest, Sha256};

/// Base64 SHA-256 of `data`, the form stored in object metadata.
pub fn content_hash(data: &[u8]) -> String {
    STANDARD.encode(Sha256::digest(data))
}
