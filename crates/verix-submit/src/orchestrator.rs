//! # Retry Orchestrator
//!
//! Drives one submission session through a [`Transport`]:
//!
//! ```text
//! NotStarted ──> Attempting ──┬──> Succeeded
//!                  ^    │     └──> Failed
//!                  └─wait┘
//! ```
//!
//! Each attempt is fully analyzed before the next wait or call is decided.
//! The session suspends in exactly two places, the transport call and the
//! inter-attempt sleep, and both are raced against the caller's
//! [`CancelSignal`].
//!
//! ## Decision Table
//!
//! | Attempt result | Attempts left | Action |
//! |----------------|---------------|--------|
//! | fully successful response | any | `Succeeded` |
//! | response with any non-recoverable rejection | any | `Failed` (non-recoverable errors present) |
//! | response with only recoverable rejections | yes | wait (hint or exponential), retry |
//! | retryable transport error | yes | wait (jittered exponential), retry |
//! | either of the above | no | `Failed` (maximum attempts reached) |
//! | unclassified transport error | any | `Failed` immediately |
//! | cancellation | any | `Err(SessionCancelled)`, no terminal state |

use std::sync::Arc;
use std::time::Duration;

use verix_core::SessionId;

use crate::analyzer::{backoff_with_jitter, ResponseAnalyzer};
use crate::cancel::CancelSignal;
use crate::observer::{EventKind, EventLevel, SessionEvent, SessionObserver, TracingObserver};
use crate::profile::RetryProfile;
use crate::response::SubmissionOutcome;
use crate::session::{CancelPoint, FailureReason, SessionCancelled, SessionResult};
use crate::transport::{Credential, SubmissionPayload, Transport, TransportError};

/// Origin of an inter-attempt wait, reported in `Waiting` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitSource {
    /// The authority's declared wait hint.
    ServerHint,
    /// Unjittered exponential backoff after a recoverable rejection.
    Backoff,
    /// Jittered exponential backoff after a transport error.
    JitteredBackoff,
}

impl WaitSource {
    fn as_str(self) -> &'static str {
        match self {
            Self::ServerHint => "server_hint",
            Self::Backoff => "backoff",
            Self::JitteredBackoff => "jittered_backoff",
        }
    }
}

/// Runs submission sessions over a shared transport.
pub struct RetryOrchestrator<T> {
    transport: T,
    analyzer: ResponseAnalyzer,
    observer: Arc<dyn SessionObserver>,
}

impl<T: Transport> RetryOrchestrator<T> {
    /// An orchestrator using the standard catalog and `tracing` output.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            analyzer: ResponseAnalyzer::default(),
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn with_analyzer(mut self, analyzer: ResponseAnalyzer) -> Self {
        self.analyzer = analyzer;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn analyzer(&self) -> &ResponseAnalyzer {
        &self.analyzer
    }

    /// Submit `payload` until it is fully accepted, a non-retryable
    /// condition is met, or `profile.max_attempts()` attempts are used.
    ///
    /// # Errors
    ///
    /// Returns [`SessionCancelled`] if `cancel` fires during a transport call
    /// or a wait. Every other ending, including failure, is an `Ok`
    /// [`SessionResult`].
    pub async fn run(
        &self,
        payload: &SubmissionPayload,
        credential: &Credential,
        profile: &RetryProfile,
        cancel: &CancelSignal,
    ) -> Result<SessionResult, SessionCancelled> {
        let session_id = SessionId::new();
        let max_attempts = profile.max_attempts();
        let mut waits_used: Vec<Duration> = Vec::new();
        let mut last_outcome: Option<SubmissionOutcome> = None;
        let mut last_transport_error: Option<TransportError> = None;

        self.emit(
            SessionEvent::new(
                EventLevel::Info,
                EventKind::SessionStarted,
                session_id,
                None,
                "submission session started",
            )
            .field("max_attempts", max_attempts)
            .field("base_delay_secs", profile.base_delay_secs())
            .field("max_delay_secs", profile.max_delay_secs())
            .field("payload_bytes", payload.body.len()),
        );

        for attempt in 0..max_attempts {
            let number = attempt + 1;
            let is_last = number == max_attempts;

            self.emit(SessionEvent::new(
                EventLevel::Info,
                EventKind::AttemptStarted,
                session_id,
                Some(number),
                "submitting",
            ));

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(self.cancelled(
                        session_id,
                        number,
                        waits_used,
                        CancelPoint::Transport,
                        last_outcome,
                        last_transport_error,
                    ));
                }
                result = self.transport.submit(payload, credential, cancel) => result,
            };

            let (wait, source) = match result {
                Ok(response) => {
                    let outcome = self.analyzer.analyze(&response);
                    self.emit(self.analyzed_event(session_id, number, &outcome));

                    if outcome.fully_successful {
                        self.emit(
                            SessionEvent::new(
                                EventLevel::Info,
                                EventKind::Succeeded,
                                session_id,
                                Some(number),
                                "submission accepted",
                            )
                            .field("waits", waits_used.len())
                            .field(
                                "confirmation",
                                outcome.confirmation_token.as_deref().unwrap_or("-"),
                            ),
                        );
                        return Ok(SessionResult::success(
                            session_id,
                            number,
                            waits_used,
                            outcome,
                            last_transport_error,
                        ));
                    }

                    if !self.analyzer.should_retry(&outcome) {
                        return Ok(self.fail(
                            session_id,
                            FailureReason::NonRecoverableErrors,
                            number,
                            waits_used,
                            Some(outcome),
                            last_transport_error,
                        ));
                    }

                    let wait = self.analyzer.compute_wait_time(&outcome, attempt, profile);
                    let source = match outcome.server_wait_hint_seconds {
                        Some(hint) if hint > 0 => WaitSource::ServerHint,
                        _ => WaitSource::Backoff,
                    };
                    last_outcome = Some(outcome);
                    (wait, source)
                }
                Err(error) if error.is_retryable() => {
                    self.emit(
                        SessionEvent::new(
                            EventLevel::Warn,
                            EventKind::TransportFailed,
                            session_id,
                            Some(number),
                            "transport error",
                        )
                        .field("kind", error.kind())
                        .field("error", &error),
                    );
                    last_transport_error = Some(error);
                    let wait = backoff_with_jitter(attempt, profile, &mut rand::thread_rng());
                    (wait, WaitSource::JitteredBackoff)
                }
                Err(error) => {
                    let reason = FailureReason::NonRecoverableTransport(error.to_string());
                    return Ok(self.fail(
                        session_id,
                        reason,
                        number,
                        waits_used,
                        last_outcome,
                        Some(error),
                    ));
                }
            };

            if is_last {
                break;
            }

            waits_used.push(wait);
            self.emit(
                SessionEvent::new(
                    EventLevel::Info,
                    EventKind::Waiting,
                    session_id,
                    Some(number),
                    "waiting before next attempt",
                )
                .field("wait_secs", format!("{:.3}", wait.as_secs_f64()))
                .field("source", source.as_str()),
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(self.cancelled(
                        session_id,
                        number,
                        waits_used,
                        CancelPoint::Wait,
                        last_outcome,
                        last_transport_error,
                    ));
                }
                _ = tokio::time::sleep(wait) => {}
            }
        }

        Ok(self.fail(
            session_id,
            FailureReason::MaxAttemptsReached,
            max_attempts,
            waits_used,
            last_outcome,
            last_transport_error,
        ))
    }

    fn emit(&self, event: SessionEvent) {
        self.observer.on_event(&event);
    }

    fn analyzed_event(&self, session_id: SessionId, number: u32, o: &SubmissionOutcome) -> SessionEvent {
        let level = if o.fully_successful {
            EventLevel::Info
        } else {
            EventLevel::Warn
        };
        let mut event = SessionEvent::new(
            level,
            EventKind::AttemptAnalyzed,
            session_id,
            Some(number),
            o.summary(),
        )
        .field("processed", o.processed)
        .field("accepted", o.accepted)
        .field("accepted_with_errors", o.accepted_with_errors)
        .field("rejected", o.rejected)
        .field("duplicates", o.duplicates);
        let codes = o.rejection_codes();
        if !codes.is_empty() {
            event = event.field("rejected_codes", codes.join(","));
        }
        if let Some(hint) = o.server_wait_hint_seconds {
            event = event.field("server_wait_hint_secs", hint);
        }
        event
    }

    fn fail(
        &self,
        session_id: SessionId,
        reason: FailureReason,
        attempts_made: u32,
        waits_used: Vec<Duration>,
        last_outcome: Option<SubmissionOutcome>,
        last_transport_error: Option<TransportError>,
    ) -> SessionResult {
        self.emit(
            SessionEvent::new(
                EventLevel::Error,
                EventKind::Failed,
                session_id,
                Some(attempts_made),
                reason.to_string(),
            )
            .field("waits", waits_used.len()),
        );
        SessionResult::failure(
            session_id,
            reason,
            attempts_made,
            waits_used,
            last_outcome,
            last_transport_error,
        )
    }

    fn cancelled(
        &self,
        session_id: SessionId,
        attempts_made: u32,
        waits_used: Vec<Duration>,
        during: CancelPoint,
        last_outcome: Option<SubmissionOutcome>,
        last_transport_error: Option<TransportError>,
    ) -> SessionCancelled {
        self.emit(
            SessionEvent::new(
                EventLevel::Warn,
                EventKind::Cancelled,
                session_id,
                Some(attempts_made),
                "submission cancelled",
            )
            .field("during", during),
        );
        SessionCancelled {
            session_id,
            attempts_made,
            waits_used,
            during,
            last_outcome,
            last_transport_error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::RecordingObserver;
    use crate::response::{GlobalStatus, LineResult, RawResponse};
    use crate::transport::{MockReply, MockTransport};

    fn accepted() -> RawResponse {
        RawResponse::new(GlobalStatus::Accepted, vec![LineResult::accepted("F-1")])
    }

    fn rejected(code: &str) -> RawResponse {
        RawResponse::new(GlobalStatus::Rejected, vec![LineResult::rejected("F-1", code)])
    }

    fn payload() -> SubmissionPayload {
        SubmissionPayload::json(b"{\"invoice\":\"F-1\"}".to_vec())
    }

    #[tokio::test(start_paused = true)]
    async fn emits_events_for_every_stage() {
        let rec = Arc::new(RecordingObserver::new());
        let orch = RetryOrchestrator::new(MockTransport::responding([rejected("2001"), accepted()]))
            .with_observer(rec.clone());
        let result = orch
            .run(&payload(), &Credential::bearer("t"), &RetryProfile::default(), &CancelSignal::never())
            .await
            .unwrap();
        assert!(result.succeeded());

        assert_eq!(rec.of_kind(EventKind::SessionStarted).len(), 1);
        assert_eq!(rec.of_kind(EventKind::AttemptStarted).len(), 2);
        assert_eq!(rec.of_kind(EventKind::AttemptAnalyzed).len(), 2);
        let waits = rec.of_kind(EventKind::Waiting);
        assert_eq!(waits.len(), 1);
        assert_eq!(waits[0].get("source"), Some("backoff"));
        assert_eq!(rec.of_kind(EventKind::Succeeded).len(), 1);
        assert!(rec.of_kind(EventKind::Failed).is_empty());
        assert!(rec
            .events()
            .iter()
            .all(|e| e.session_id == result.session_id()));
    }

    #[tokio::test(start_paused = true)]
    async fn credential_never_reaches_events() {
        let rec = Arc::new(RecordingObserver::new());
        let orch = RetryOrchestrator::new(MockTransport::new([
            MockReply::Fail(TransportError::Timeout),
            MockReply::Respond(accepted()),
        ]))
        .with_observer(rec.clone());
        orch.run(
            &payload(),
            &Credential::bearer("top-secret-token"),
            &RetryProfile::default(),
            &CancelSignal::never(),
        )
        .await
        .unwrap();
        let dump = format!("{:?}", rec.events());
        assert!(!dump.contains("top-secret-token"));
    }

    #[tokio::test(start_paused = true)]
    async fn recoverable_rejection_waits_exponentially_without_hint() {
        let orch = RetryOrchestrator::new(MockTransport::responding([
            rejected("5001"),
            rejected("2003"),
            accepted(),
        ]))
        .with_observer(Arc::new(crate::observer::NoopObserver));
        let result = orch
            .run(&payload(), &Credential::bearer("t"), &RetryProfile::default(), &CancelSignal::never())
            .await
            .unwrap();
        assert!(result.succeeded());
        assert_eq!(result.succeeded_on_attempt(), Some(3));
        assert_eq!(
            result.waits_used(),
            &[Duration::from_secs(2), Duration::from_secs(4)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn accepted_with_errors_ends_failed_with_outcome() {
        let orch = RetryOrchestrator::new(MockTransport::responding([RawResponse::new(
            GlobalStatus::Accepted,
            vec![LineResult::accepted_with_errors("F-1", "3101")],
        )]));
        let result = orch
            .run(&payload(), &Credential::bearer("t"), &RetryProfile::default(), &CancelSignal::never())
            .await
            .unwrap();
        assert!(!result.succeeded());
        assert_eq!(result.attempts_made(), 1);
        assert_eq!(result.failure_reason(), Some(&FailureReason::NonRecoverableErrors));
        assert!(result.last_outcome().unwrap().requires_subsanacion);
        assert_eq!(orch.transport().calls(), 1);
    }
}
