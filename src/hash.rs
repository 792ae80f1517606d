//! Content fingerprint for change detection.
//!
//! The digest is SHA-256 over `"{filename}-{filetype}-{chunk_id}-{content}"`,
//! rendered as 64 lowercase hex characters. The backend computes chunk hashes
//! with the same input layout, so hashes produced here line up with the ones
//! it stores.

use sha2::{Digest, Sha256};

/// Compute the chunk hash for the given identity and content.
pub fn chunk_hash(filename: &str, filetype: &str, chunk_id: &str, content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(filename.as_bytes());
    hasher.update(b"-");
    hasher.update(filetype.as_bytes());
    hasher.update(b"-");
    hasher.update(chunk_id.as_bytes());
    hasher.update(b"-");
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
