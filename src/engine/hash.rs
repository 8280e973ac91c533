//! Content digests used for drift detection.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Digest length in hex characters. Truncated on purpose: this is a drift
/// heuristic, not a security primitive.
pub const DIGEST_LEN: usize = 12;

/// Digest raw bytes to a fixed-length lowercase hex string.
pub fn digest_bytes(bytes: &[u8]) -> String {
    let hex = blake3::hash(bytes).to_hex();
    hex.as_str()[..DIGEST_LEN].to_string()
}

/// Digest a file's contents, or `None` if the file does not exist.
pub fn digest_file(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    let bytes =
        fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(Some(digest_bytes(&bytes)))
}

// ============================================================================
// Tests
// ============================================================================
