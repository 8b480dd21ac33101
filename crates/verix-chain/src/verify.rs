//! # Chain Verification
//!
//! Re-derives every link of a chain segment and checks continuity:
//!
//! - link `i`'s `previous_digest` equals link `i-1`'s `content_digest`
//!   (the first link must equal the supplied anchor, `None` for genesis);
//! - link `i`'s `content_digest` equals the recomputed digest of record `i`.
//!
//! Verification stops at the first broken link and reports its index.

use crate::chainer::{ChainLink, DigestScheme, HashChainer};
use crate::error::ChainError;
use crate::record::InvoiceRecord;

/// Verify a chain segment of `(record, link)` pairs in submission order.
///
/// `anchor` is the digest the first link must point at; pass `None` when the
/// segment starts at the chain genesis.
pub fn verify_chain<S: DigestScheme>(
    chainer: &HashChainer<S>,
    anchor: Option<&str>,
    entries: &[(InvoiceRecord, ChainLink)],
) -> Result<(), ChainError> {
    let mut expected_previous = anchor.map(str::to_string);

    for (index, (record, link)) in entries.iter().enumerate() {
        if link.previous_digest != expected_previous {
            return Err(ChainError::LinkMismatch {
                index,
                expected: expected_previous,
                actual: link.previous_digest.clone(),
            });
        }

        let previous = link.previous_digest.as_deref();
        if !chainer.scheme().matches(record, previous, &link.content_digest)? {
            return Err(ChainError::DigestMismatch {
                index,
                expected: chainer.compute_digest(record, previous)?,
                actual: link.content_digest.clone(),
            });
        }

        expected_previous = Some(link.content_digest.clone());
    }

    Ok(())
}
