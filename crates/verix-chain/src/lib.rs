//! # verix-chain: Record Hash Chain
//!
//! Binds each record's integrity token to its predecessor's:
//!
//! ```text
//! content_digest = Scheme(record, previous_digest)
//! ```
//!
//! where `previous_digest` is `None` for the genesis record of an emitter's
//! chain. The scheme is pluggable ([`DigestScheme`]); the shipped
//! [`JcsSha256Scheme`] hashes the JCS canonical form of the record together
//! with its predecessor.
//!
//! ## Integrity Invariants
//!
//! - **Determinism**: identical `(record, previous)` always yield the
//!   identical digest.
//! - **Binding**: changing any canonical record field or the predecessor
//!   changes the digest. `None` and `Some("")` are distinct predecessors.
//! - **Commit after confirmation**: a digest enters the [`ChainStateStore`]
//!   only once its submission session has succeeded, and only if the stored
//!   head is still the predecessor it was built from.

pub mod chainer;
pub mod error;
pub mod record;
pub mod store;
pub mod verify;

pub use chainer::{ChainLink, DigestScheme, HashChainer, JcsSha256Scheme};
pub use error::ChainError;
pub use record::{InvoiceRecord, InvoiceType};
pub use store::{ChainStateStore, InMemoryChainStore};
pub use verify::verify_chain;
