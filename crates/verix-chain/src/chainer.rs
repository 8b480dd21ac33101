//! # Hash Chainer
//!
//! Computes the integrity token of a record bound to its predecessor.
//!
//! ## Digest Derivation (`jcs-sha256/v1`)
//!
//! ```text
//! content_digest = hex(SHA256(JCS({"scheme": "jcs-sha256/v1",
//!                                  "record":   <InvoiceRecord>,
//!                                  "previous": <hex string> | null})))
//! ```
//!
//! A genesis record carries `"previous": null`; a record whose predecessor
//! is the empty string carries `"previous": ""`. The two canonical forms
//! differ, so "no predecessor" never collides with "empty predecessor".
//!
//! The authority's official fingerprint is a separate, versioned
//! standard. It plugs in as another [`DigestScheme`] without touching
//! [`HashChainer`] or its callers.

use serde::{Deserialize, Serialize};
use verix_core::{sha256_hex, verify_sha256_hex, CanonicalBytes, VerixError};

use crate::error::ChainError;
use crate::record::InvoiceRecord;

/// One link in an emitter's chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChainLink {
    /// Digest of this record bound to its predecessor.
    pub content_digest: String,
    /// Digest of the predecessor; `None` for the chain genesis.
    pub previous_digest: Option<String>,
}

impl ChainLink {
    /// True if this link starts a chain.
    pub fn is_genesis(&self) -> bool {
        self.previous_digest.is_none()
    }
}

/// A canonicalization + hash primitive for chain digests.
///
/// Implementations must be pure: the output depends only on `record` and
/// `previous`, and must change whenever either changes.
pub trait DigestScheme: Send + Sync {
    /// Versioned scheme identifier, e.g. `"jcs-sha256/v1"`.
    fn name(&self) -> &str;

    /// Compute the digest of `record` bound to `previous`.
    fn digest(&self, record: &InvoiceRecord, previous: Option<&str>) -> Result<String, ChainError>;

    /// Whether `expected` is the digest of `record` bound to `previous`.
    fn matches(
        &self,
        record: &InvoiceRecord,
        previous: Option<&str>,
        expected: &str,
    ) -> Result<bool, ChainError> {
        Ok(self.digest(record, previous)? == expected)
    }
}

/// JCS canonical form of `{scheme, record, previous}` hashed with SHA-256.
#[derive(Debug, Clone, Copy, Default)]
pub struct JcsSha256Scheme;

impl JcsSha256Scheme {
    /// Identifier embedded in every digest input.
    pub const NAME: &'static str = "jcs-sha256/v1";
}

#[derive(Serialize)]
struct DigestInput<'a> {
    scheme: &'a str,
    record: &'a InvoiceRecord,
    previous: Option<&'a str>,
}

impl DigestScheme for JcsSha256Scheme {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn digest(&self, record: &InvoiceRecord, previous: Option<&str>) -> Result<String, ChainError> {
        Ok(sha256_hex(&Self::canonical_input(record, previous)?))
    }

    /// Malformed hex never matches.
    fn matches(
        &self,
        record: &InvoiceRecord,
        previous: Option<&str>,
        expected: &str,
    ) -> Result<bool, ChainError> {
        let canonical = Self::canonical_input(record, previous)?;
        match verify_sha256_hex(&canonical, expected) {
            Ok(_) => Ok(true),
            Err(VerixError::Integrity(_) | VerixError::Validation(_)) => Ok(false),
            Err(VerixError::Canonicalization(e)) => Err(e.into()),
        }
    }
}

impl JcsSha256Scheme {
    fn canonical_input(
        record: &InvoiceRecord,
        previous: Option<&str>,
    ) -> Result<CanonicalBytes, ChainError> {
        let input = DigestInput {
            scheme: Self::NAME,
            record,
            previous,
        };
        Ok(CanonicalBytes::new(&input)?)
    }
}

/// Produces chain links for records under a fixed [`DigestScheme`].
#[derive(Debug, Clone, Default)]
pub struct HashChainer<S = JcsSha256Scheme> {
    scheme: S,
}

impl HashChainer<JcsSha256Scheme> {
    /// A chainer using the shipped `jcs-sha256/v1` scheme.
    pub fn new() -> Self {
        Self {
            scheme: JcsSha256Scheme,
        }
    }
}

impl<S: DigestScheme> HashChainer<S> {
    /// A chainer using a caller-supplied scheme.
    pub fn with_scheme(scheme: S) -> Self {
        Self { scheme }
    }

    /// The scheme in use.
    pub fn scheme(&self) -> &S {
        &self.scheme
    }

    /// Compute the digest of `record` bound to `previous_digest`.
    ///
    /// `None` denotes chain genesis and is distinct from `Some("")`.
    pub fn compute_digest(
        &self,
        record: &InvoiceRecord,
        previous_digest: Option<&str>,
    ) -> Result<String, ChainError> {
        self.scheme.digest(record, previous_digest)
    }

    /// Compute the full chain link for `record`.
    pub fn link(
        &self,
        record: &InvoiceRecord,
        previous_digest: Option<&str>,
    ) -> Result<ChainLink, ChainError> {
        let content_digest = self.compute_digest(record, previous_digest)?;
        Ok(ChainLink {
            content_digest,
            previous_digest: previous_digest.map(str::to_string),
        })
    }
}
