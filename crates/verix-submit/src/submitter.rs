//! # Chained Submission
//!
//! End-to-end flow for one record of an emitter's chain:
//!
//! 1. take the emitter's single-writer lock;
//! 2. read the last confirmed digest;
//! 3. compute the [`ChainLink`] from that predecessor;
//! 4. build the wire payload ([`PayloadBuilder`]);
//! 5. run the retry session;
//! 6. compare-and-set commit the new digest only if the session succeeded.
//!
//! The lock is held from step 2 to step 6, so links for one emitter are
//! built strictly in submission order and a failed or cancelled session
//! never moves the head. Distinct emitters proceed concurrently. A lock
//! entry lives only while some submission for its emitter holds or awaits
//! it, so the lock table is bounded by the number of in-flight emitters.

use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use verix_chain::{
    ChainLink, ChainStateStore, DigestScheme, HashChainer, InvoiceRecord, JcsSha256Scheme,
};
use verix_core::EmitterId;

use crate::cancel::CancelSignal;
use crate::error::{PayloadError, SubmitError};
use crate::orchestrator::RetryOrchestrator;
use crate::profile::RetryProfile;
use crate::session::SessionResult;
use crate::transport::{Credential, SubmissionPayload, Transport};

/// Produces the wire payload for a record and its chain link.
///
/// Wire format and signing are external concerns; implementations embed
/// `link.content_digest` and `link.previous_digest` wherever the format
/// requires them.
pub trait PayloadBuilder: Send + Sync {
    fn build(&self, record: &InvoiceRecord, link: &ChainLink)
        -> Result<SubmissionPayload, PayloadError>;
}

/// Builds `{"record": ..., "link": ...}` as JSON. Suitable for dry runs and
/// JSON gateways.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonPayloadBuilder;

#[derive(Serialize)]
struct JsonEnvelope<'a> {
    record: &'a InvoiceRecord,
    link: &'a ChainLink,
}

impl PayloadBuilder for JsonPayloadBuilder {
    fn build(
        &self,
        record: &InvoiceRecord,
        link: &ChainLink,
    ) -> Result<SubmissionPayload, PayloadError> {
        let body = serde_json::to_vec(&JsonEnvelope { record, link })?;
        Ok(SubmissionPayload::json(body))
    }
}

/// Result of submitting one chained record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainedSubmission {
    pub link: ChainLink,
    pub session: SessionResult,
    /// True if the link's digest is now the emitter's confirmed head.
    pub committed: bool,
}

/// Submits records of many emitters, one writer per emitter.
pub struct ChainedSubmitter<T, B = JsonPayloadBuilder, S = JcsSha256Scheme> {
    orchestrator: RetryOrchestrator<T>,
    chainer: HashChainer<S>,
    store: Arc<dyn ChainStateStore>,
    builder: B,
    writers: DashMap<EmitterId, Arc<AsyncMutex<()>>>,
}

impl<T: Transport, B: PayloadBuilder> ChainedSubmitter<T, B, JcsSha256Scheme> {
    pub fn new(
        orchestrator: RetryOrchestrator<T>,
        store: Arc<dyn ChainStateStore>,
        builder: B,
    ) -> Self {
        Self {
            orchestrator,
            chainer: HashChainer::new(),
            store,
            builder,
            writers: DashMap::new(),
        }
    }
}

impl<T: Transport, B: PayloadBuilder, S: DigestScheme> ChainedSubmitter<T, B, S> {
    /// Replace the digest scheme.
    pub fn with_chainer<S2: DigestScheme>(self, chainer: HashChainer<S2>) -> ChainedSubmitter<T, B, S2> {
        ChainedSubmitter {
            orchestrator: self.orchestrator,
            chainer,
            store: self.store,
            builder: self.builder,
            writers: self.writers,
        }
    }

    pub fn orchestrator(&self) -> &RetryOrchestrator<T> {
        &self.orchestrator
    }

    pub fn store(&self) -> &dyn ChainStateStore {
        self.store.as_ref()
    }

    /// Submit `record` as the next link of its issuer's chain.
    ///
    /// # Errors
    ///
    /// - [`SubmitError::Chain`] / [`SubmitError::Payload`] before anything
    ///   is sent;
    /// - [`SubmitError::Cancelled`] if `cancel` fires (head unchanged);
    /// - [`SubmitError::CommitFailed`] if the authority accepted the record
    ///   but the head moved underneath this writer.
    ///
    /// A session that ends `Failed` is returned as `Ok` with
    /// `committed == false`.
    pub async fn submit(
        &self,
        record: &InvoiceRecord,
        credential: &Credential,
        profile: &RetryProfile,
        cancel: &CancelSignal,
    ) -> Result<ChainedSubmission, SubmitError> {
        let emitter = EmitterId::new(record.issuer.clone());
        let _writer = self.acquire_writer(&emitter).await;

        let previous = self.store.last_confirmed_digest(&emitter)?;
        let link = self.chainer.link(record, previous.as_deref())?;
        let payload = self.builder.build(record, &link)?;

        tracing::debug!(
            %emitter,
            invoice = %record.invoice,
            digest = %link.content_digest,
            genesis = link.is_genesis(),
            scheme = self.chainer.scheme().name(),
            "chain link computed"
        );

        let session = self
            .orchestrator
            .run(&payload, credential, profile, cancel)
            .await?;

        if !session.succeeded() {
            return Ok(ChainedSubmission {
                link,
                session,
                committed: false,
            });
        }

        if let Err(source) =
            self.store
                .commit_confirmed_digest(&emitter, previous.as_deref(), &link.content_digest)
        {
            tracing::error!(%emitter, error = %source, "confirmed head commit failed");
            return Err(SubmitError::CommitFailed {
                session: Box::new(session),
                source,
            });
        }

        Ok(ChainedSubmission {
            link,
            session,
            committed: true,
        })
    }

    fn writer_for(&self, emitter: &EmitterId) -> Arc<AsyncMutex<()>> {
        self.writers
            .entry(emitter.clone())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    async fn acquire_writer(&self, emitter: &EmitterId) -> WriterGuard<'_> {
        let guard = self.writer_for(emitter).lock_owned().await;
        WriterGuard {
            writers: &self.writers,
            emitter: emitter.clone(),
            guard: Some(guard),
        }
    }
}

/// Holds an emitter's writer lock; on drop, removes the table entry when no
/// other submission references it.
struct WriterGuard<'a> {
    writers: &'a DashMap<EmitterId, Arc<AsyncMutex<()>>>,
    emitter: EmitterId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for WriterGuard<'_> {
    fn drop(&mut self) {
        // Release our reference before checking the count; `remove_if` runs
        // under the shard lock that `writer_for` also takes.
        drop(self.guard.take());
        self.writers
            .remove_if(&self.emitter, |_, lock| Arc::strong_count(lock) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::{GlobalStatus, LineResult, RawResponse};
    use crate::transport::MockTransport;
    use chrono::NaiveDate;
    use verix_chain::{InMemoryChainStore, InvoiceType};
    use verix_core::{InvoiceRef, Nif, Timestamp};

    fn record(n: u32) -> InvoiceRecord {
        InvoiceRecord::new(
            Nif::new("B12345678").unwrap(),
            InvoiceRef::new(format!("F-2026/{n:04}")).unwrap(),
            NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            InvoiceType::F1,
            "21.00",
            "121.00",
            Timestamp::parse("2026-03-01T10:00:00Z").unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn json_builder_embeds_link() {
        let r = record(1);
        let link = HashChainer::new().link(&r, Some("abc")).unwrap();
        let payload = JsonPayloadBuilder.build(&r, &link).unwrap();
        assert_eq!(payload.content_type, "application/json");
        let v: serde_json::Value = serde_json::from_slice(&payload.body).unwrap();
        assert_eq!(v["link"]["content_digest"], link.content_digest.as_str());
        assert_eq!(v["link"]["previous_digest"], "abc");
        assert_eq!(v["record"]["invoice"], "F-2026/0001");
    }

    #[tokio::test(start_paused = true)]
    async fn writer_lock_is_shared_per_emitter() {
        let submitter = ChainedSubmitter::new(
            RetryOrchestrator::new(MockTransport::responding([RawResponse::new(
                GlobalStatus::Accepted,
                vec![LineResult::accepted("F-1")],
            )])),
            Arc::new(InMemoryChainStore::new()),
            JsonPayloadBuilder,
        );
        let e = EmitterId::parse("B12345678").unwrap();
        let a = submitter.writer_for(&e);
        let b = submitter.writer_for(&e);
        assert!(Arc::ptr_eq(&a, &b));
        let other = submitter.writer_for(&EmitterId::parse("A11111111").unwrap());
        assert!(!Arc::ptr_eq(&a, &other));
    }

    #[tokio::test(start_paused = true)]
    async fn writer_entries_are_released_after_submission() {
        let submitter = ChainedSubmitter::new(
            RetryOrchestrator::new(MockTransport::responding([
                RawResponse::new(GlobalStatus::Accepted, vec![LineResult::accepted("F-1")]),
                RawResponse::new(GlobalStatus::Accepted, vec![LineResult::accepted("F-2")]),
            ])),
            Arc::new(InMemoryChainStore::new()),
            JsonPayloadBuilder,
        );
        let cred = Credential::bearer("t");
        for n in 1..=2 {
            let out = submitter
                .submit(&record(n), &cred, &RetryProfile::default(), &CancelSignal::never())
                .await
                .unwrap();
            assert!(out.committed);
            assert!(submitter.writers.is_empty());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn writer_entry_survives_while_another_holder_waits() {
        let submitter = ChainedSubmitter::new(
            RetryOrchestrator::new(MockTransport::responding(Vec::<RawResponse>::new())),
            Arc::new(InMemoryChainStore::new()),
            JsonPayloadBuilder,
        );
        let e = EmitterId::parse("B12345678").unwrap();
        let held = submitter.acquire_writer(&e).await;
        let waiting = submitter.writer_for(&e);
        drop(held);
        assert_eq!(submitter.writers.len(), 1);
        assert!(Arc::ptr_eq(&waiting, &submitter.writer_for(&e)));
        drop(waiting);
        drop(submitter.acquire_writer(&e).await);
        assert!(submitter.writers.is_empty());
    }
}
