//! # Confirmed Chain Heads
//!
//! The last authority-confirmed digest per emitter. A later record's
//! `previous_digest` is only ever read from here, so a digest written here
//! before its session succeeded would fork the chain.
//!
//! Commits are compare-and-set: the caller states which head it built its
//! link from, and the commit fails with [`ChainError::StaleHead`] if another
//! writer advanced the chain in between.

use std::collections::HashMap;

use parking_lot::RwLock;
use verix_core::EmitterId;

use crate::error::ChainError;

/// Storage for the last confirmed digest of each emitter's chain.
///
/// Implementations must be `Send + Sync`; independent emitters may be
/// submitted concurrently.
pub trait ChainStateStore: Send + Sync {
    /// The last confirmed digest for `emitter`, or `None` if its chain has
    /// no confirmed record yet.
    fn last_confirmed_digest(&self, emitter: &EmitterId) -> Result<Option<String>, ChainError>;

    /// Advance `emitter`'s head from `expected_previous` to `digest`.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::StaleHead`] without writing anything if the
    /// stored head is not `expected_previous`.
    fn commit_confirmed_digest(
        &self,
        emitter: &EmitterId,
        expected_previous: Option<&str>,
        digest: &str,
    ) -> Result<(), ChainError>;
}

/// Process-local [`ChainStateStore`].
#[derive(Debug, Default)]
pub struct InMemoryChainStore {
    heads: RwLock<HashMap<EmitterId, String>>,
}

impl InMemoryChainStore {
    /// An empty store: every emitter starts at genesis.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of emitters with at least one confirmed record.
    pub fn len(&self) -> usize {
        self.heads.read().len()
    }

    /// True if no emitter has a confirmed record.
    pub fn is_empty(&self) -> bool {
        self.heads.read().is_empty()
    }
}

impl ChainStateStore for InMemoryChainStore {
    fn last_confirmed_digest(&self, emitter: &EmitterId) -> Result<Option<String>, ChainError> {
        Ok(self.heads.read().get(emitter).cloned())
    }

    fn commit_confirmed_digest(
        &self,
        emitter: &EmitterId,
        expected_previous: Option<&str>,
        digest: &str,
    ) -> Result<(), ChainError> {
        let mut heads = self.heads.write();
        let current = heads.get(emitter).map(String::as_str);
        if current != expected_previous {
            return Err(ChainError::StaleHead {
                emitter: emitter.to_string(),
                expected: expected_previous.map(str::to_string),
                actual: current.map(str::to_string),
            });
        }
        heads.insert(emitter.clone(), digest.to_string());
        tracing::debug!(%emitter, digest, "chain head advanced");
        Ok(())
    }
}
