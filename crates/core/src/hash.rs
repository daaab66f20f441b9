//! Content hashing
//!
//! Generated files and fingerprints are identified by a hex-encoded
//! cryptographic digest. The [`ContentHasher`] trait is the seam the manifest
//! builder uses, so tests and embedders can swap the algorithm.

use sha2::{Digest, Sha256};

// ============================================================================
// ContentHasher Trait
// ============================================================================

/// Produces a stable, lowercase hex digest of some content.
pub trait ContentHasher {
    /// Digest raw bytes
    fn digest_bytes(&self, bytes: &[u8]) -> String;

    /// Digest the UTF-8 bytes of a string
    fn digest(&self, content: &str) -> String {
        self.digest_bytes(content.as_bytes())
    }
}

// ============================================================================
// Sha256Hasher
// ============================================================================

/// SHA-256 content hasher (64 hex characters).
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl ContentHasher for Sha256Hasher {
    fn digest_bytes(&self, bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        format!("{:x}", hasher.finalize())
    }
}

/// SHA-256 of a string, hex encoded.
pub fn sha256_hex(content: &str) -> String {
    Sha256Hasher.digest(content)
}

// ============================================================================
// Tests
// ============================================================================
