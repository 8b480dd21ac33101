//! # Session Results
//!
//! A session ends exactly once, either succeeded or failed, and the result
//! is built in one piece by the constructor for that state. There is no
//! way to produce a result that is both succeeded and carries a failure
//! reason. Cancellation is not a terminal state: it surfaces as
//! [`SessionCancelled`] and leaves the decision to resume with the caller.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use verix_core::SessionId;

use crate::response::SubmissionOutcome;
use crate::transport::TransportError;

/// Why a session failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FailureReason {
    /// A response contained a rejection that may not be retried.
    NonRecoverableErrors,
    /// Every attempt was used without full acceptance.
    MaxAttemptsReached,
    /// The transport returned an error it could not classify.
    NonRecoverableTransport(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonRecoverableErrors => f.write_str("non-recoverable errors present"),
            Self::MaxAttemptsReached => f.write_str("maximum attempts reached"),
            Self::NonRecoverableTransport(detail) => {
                write!(f, "non-recoverable error: {detail}")
            }
        }
    }
}

/// Terminal record of one submission session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionResult {
    session_id: SessionId,
    succeeded: bool,
    attempts_made: u32,
    succeeded_on_attempt: Option<u32>,
    waits_used: Vec<Duration>,
    last_outcome: Option<SubmissionOutcome>,
    failure_reason: Option<FailureReason>,
    last_transport_error: Option<TransportError>,
}

impl SessionResult {
    pub(crate) fn success(
        session_id: SessionId,
        attempt: u32,
        waits_used: Vec<Duration>,
        outcome: SubmissionOutcome,
        last_transport_error: Option<TransportError>,
    ) -> Self {
        Self {
            session_id,
            succeeded: true,
            attempts_made: attempt,
            succeeded_on_attempt: Some(attempt),
            waits_used,
            last_outcome: Some(outcome),
            failure_reason: None,
            last_transport_error,
        }
    }

    pub(crate) fn failure(
        session_id: SessionId,
        reason: FailureReason,
        attempts_made: u32,
        waits_used: Vec<Duration>,
        last_outcome: Option<SubmissionOutcome>,
        last_transport_error: Option<TransportError>,
    ) -> Self {
        Self {
            session_id,
            succeeded: false,
            attempts_made,
            succeeded_on_attempt: None,
            waits_used,
            last_outcome,
            failure_reason: Some(reason),
            last_transport_error,
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn succeeded(&self) -> bool {
        self.succeeded
    }

    pub fn attempts_made(&self) -> u32 {
        self.attempts_made
    }

    /// One-based attempt that was fully accepted.
    pub fn succeeded_on_attempt(&self) -> Option<u32> {
        self.succeeded_on_attempt
    }

    /// Every inter-attempt wait, in order.
    pub fn waits_used(&self) -> &[Duration] {
        &self.waits_used
    }

    pub fn total_wait(&self) -> Duration {
        self.waits_used.iter().sum()
    }

    pub fn last_outcome(&self) -> Option<&SubmissionOutcome> {
        self.last_outcome.as_ref()
    }

    pub fn failure_reason(&self) -> Option<&FailureReason> {
        self.failure_reason.as_ref()
    }

    /// The failure reason as operator-facing text.
    pub fn failure_message(&self) -> Option<String> {
        self.failure_reason.as_ref().map(ToString::to_string)
    }

    pub fn last_transport_error(&self) -> Option<&TransportError> {
        self.last_transport_error.as_ref()
    }

    /// Authority receipt of the accepted attempt.
    pub fn confirmation_token(&self) -> Option<&str> {
        if !self.succeeded {
            return None;
        }
        self.last_outcome
            .as_ref()
            .and_then(|o| o.confirmation_token.as_deref())
    }

    /// One line for operators: state, attempts, waits and last error.
    pub fn summary(&self) -> String {
        let waits: Vec<String> = self
            .waits_used
            .iter()
            .map(|w| format!("{:.1}s", w.as_secs_f64()))
            .collect();
        let mut line = match (&self.failure_reason, self.succeeded_on_attempt) {
            (None, Some(n)) => format!(
                "{} succeeded on attempt {n}/{}",
                self.session_id, self.attempts_made
            ),
            (Some(reason), _) => format!(
                "{} failed after {} attempt(s): {reason}",
                self.session_id, self.attempts_made
            ),
            (None, None) => format!("{} attempts={}", self.session_id, self.attempts_made),
        };
        line.push_str(&format!("; waits=[{}]", waits.join(", ")));
        if let Some(outcome) = &self.last_outcome {
            let codes = outcome.rejection_codes();
            if !codes.is_empty() {
                line.push_str(&format!("; rejected codes={}", codes.join(",")));
            }
        }
        if let Some(err) = &self.last_transport_error {
            line.push_str(&format!("; last transport error: {err}"));
        }
        line
    }
}

/// Where a cancellation was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CancelPoint {
    /// While waiting for the transport.
    Transport,
    /// While sleeping between attempts.
    Wait,
}

impl fmt::Display for CancelPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport => f.write_str("transport call"),
            Self::Wait => f.write_str("inter-attempt wait"),
        }
    }
}

/// The caller cancelled a session before it reached a terminal state.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{session_id} cancelled during {during} after {attempts_made} attempt(s)")]
pub struct SessionCancelled {
    pub session_id: SessionId,
    /// Attempts started, including one interrupted mid-call.
    pub attempts_made: u32,
    pub waits_used: Vec<Duration>,
    pub during: CancelPoint,
    pub last_outcome: Option<SubmissionOutcome>,
    pub last_transport_error: Option<TransportError>,
}
