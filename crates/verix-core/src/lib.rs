//! # verix-core: Foundational Types
//!
//! Shared primitives for the verix submission stack. Every other crate in the
//! workspace depends on `verix-core`; it depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Validated identifier newtypes.** `Nif`, `EmitterId`, `InvoiceRef`,
//!    `SessionId`. No bare strings cross a crate boundary as identifiers.
//!
//! 2. **`CanonicalBytes` newtype.** All chain digests are computed over
//!    `CanonicalBytes`, produced by RFC 8785 (JCS) serialization with float
//!    rejection. Amounts travel as decimal strings.
//!
//! 3. **UTC-only timestamps.** `Timestamp` enforces the `Z` suffix and
//!    seconds precision so canonical bytes are stable across hosts.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `verix-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;
pub mod temporal;

pub use canonical::CanonicalBytes;
pub use digest::{sha256_digest, sha256_hex, verify_sha256_hex, ContentDigest, DigestAlgorithm};
pub use error::{CanonicalizationError, ValidationError, VerixError};
pub use identity::{EmitterId, InvoiceRef, Nif, SessionId};
pub use temporal::Timestamp;
