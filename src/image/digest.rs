//! SHA256 digest utilities for registry blobs
//!
//! A [`BlobDigest`] is the deduplication key of the blob size table. It keeps
//! the algorithm-qualified form (`sha256:<hex>`) so digests of different
//! algorithms never collide, and exposes the bare hex for display.

use crate::error::{Result, SizerError};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;

pub const SHA256_PREFIX: &str = "sha256:";

/// Algorithm-qualified content digest (e.g. `sha256:abc123...`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct BlobDigest(String);

impl BlobDigest {
    /// Parse an `algorithm:hex` digest string.
    pub fn parse(raw: &str) -> Result<Self> {
        let (algorithm, encoded) = raw.split_once(':').ok_or_else(|| {
            SizerError::DescriptorRead(format!("Digest missing algorithm prefix: '{}'", raw))
        })?;

        if algorithm.is_empty()
            || !algorithm
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "+._-".contains(c))
        {
            return Err(SizerError::DescriptorRead(format!(
                "Invalid digest algorithm in '{}'",
                raw
            )));
        }

        if encoded.is_empty() || !encoded.chars().all(|c| c.is_ascii_alphanumeric() || "=_-".contains(c)) {
            return Err(SizerError::DescriptorRead(format!(
                "Invalid digest encoding in '{}'",
                raw
            )));
        }

        if algorithm == "sha256" && !DigestUtils::is_valid_sha256_hex(encoded) {
            return Err(SizerError::DescriptorRead(format!(
                "Invalid SHA256 digest: expected 64 hex characters, got '{}'",
                encoded
            )));
        }

        Ok(Self(raw.to_string()))
    }

    /// Digest of `data` computed with SHA256.
    pub fn sha256_of(data: &[u8]) -> Self {
        Self(format!("{}{}", SHA256_PREFIX, DigestUtils::compute_sha256(data)))
    }

    pub fn algorithm(&self) -> &str {
        self.0.split_once(':').map(|(a, _)| a).unwrap_or_default()
    }

    /// Encoded part without the algorithm prefix
    pub fn hex(&self) -> &str {
        self.0.split_once(':').map(|(_, h)| h).unwrap_or(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlobDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Utilities for working with SHA256 digests in registry context
pub struct DigestUtils;

impl DigestUtils {
    /// Compute SHA256 digest from byte data
    pub fn compute_sha256(data: &[u8]) -> String {
        hex::encode(Sha256::digest(data))
    }

    /// Validate SHA256 hex string (64 characters, lowercase hex)
    pub fn is_valid_sha256_hex(digest: &str) -> bool {
        digest.len() == 64 && digest.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
    }

    /// Verify `data` hashes to `expected`. Only sha256 can be checked; other
    /// algorithms are accepted as-is.
    pub fn verify(data: &[u8], expected: &BlobDigest) -> Result<()> {
        if expected.algorithm() != "sha256" {
            return Ok(());
        }

        let computed = Self::compute_sha256(data);
        if computed != expected.hex() {
            return Err(SizerError::Registry(format!(
                "Digest mismatch: expected {}, computed {}{}",
                expected, SHA256_PREFIX, computed
            )));
        }
        Ok(())
    }
}
