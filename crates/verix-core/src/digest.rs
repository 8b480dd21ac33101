//! # Content Digest
//!
//! `ContentDigest` and `DigestAlgorithm` tag every chain digest with the
//! primitive that produced it, so a scheme upgrade never mixes silently
//! with digests computed under the previous primitive.
//!
//! `sha256_digest()` accepts only `&CanonicalBytes`, so every digest in the
//! system is computed over canonicalized content.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::canonical::CanonicalBytes;
use crate::error::{ValidationError, VerixError};

/// The hash algorithm used to produce a content digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DigestAlgorithm {
    /// SHA-256.
    Sha256,
}

impl DigestAlgorithm {
    /// Returns the algorithm identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
        }
    }
}

impl std::fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A digest value with its algorithm tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest {
    /// The hash algorithm that produced this digest.
    pub algorithm: DigestAlgorithm,
    /// The raw 32-byte digest value.
    pub bytes: [u8; 32],
}

impl ContentDigest {
    /// Create a new content digest from raw bytes and algorithm.
    pub fn new(algorithm: DigestAlgorithm, bytes: [u8; 32]) -> Self {
        Self { algorithm, bytes }
    }

    /// Render the digest as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Parse a SHA-256 digest from 64 lowercase hex characters.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidDigestHex`] for any other length or
    /// for characters outside `[0-9a-f]`.
    pub fn from_hex(hex: &str) -> Result<Self, ValidationError> {
        let valid = hex.len() == 64
            && hex
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if !valid {
            return Err(ValidationError::InvalidDigestHex(hex.to_string()));
        }
        let mut bytes = [0u8; 32];
        for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
            let pair = std::str::from_utf8(chunk)
                .map_err(|_| ValidationError::InvalidDigestHex(hex.to_string()))?;
            bytes[i] = u8::from_str_radix(pair, 16)
                .map_err(|_| ValidationError::InvalidDigestHex(hex.to_string()))?;
        }
        Ok(Self::new(DigestAlgorithm::Sha256, bytes))
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.to_hex())
    }
}

/// Compute a SHA-256 content digest from canonical bytes.
pub fn sha256_digest(data: &CanonicalBytes) -> ContentDigest {
    let hash = Sha256::digest(data.as_bytes());
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hash);
    ContentDigest::new(DigestAlgorithm::Sha256, bytes)
}

/// Compute a SHA-256 hex string from canonical bytes.
pub fn sha256_hex(data: &CanonicalBytes) -> String {
    sha256_digest(data).to_hex()
}

/// Check `data` against a stored SHA-256 hex digest.
///
/// # Errors
///
/// [`VerixError::Validation`] if `expected_hex` is malformed,
/// [`VerixError::Integrity`] if it does not match the recomputed digest.
pub fn verify_sha256_hex(data: &CanonicalBytes, expected_hex: &str) -> Result<ContentDigest, VerixError> {
    let expected = ContentDigest::from_hex(expected_hex)?;
    let actual = sha256_digest(data);
    if actual != expected {
        return Err(VerixError::Integrity(format!(
            "digest mismatch: expected {}, computed {}",
            expected.to_hex(),
            actual.to_hex()
        )));
    }
    Ok(actual)
}
