//! Errors of the end-to-end submission flow.
//!
//! Authority verdicts are not errors: a failed session is an `Ok`
//! [`SessionResult`]. These types cover what stops the flow around the
//! session: chain state, payload construction and cancellation.

use thiserror::Error;
use verix_chain::ChainError;

use crate::session::{SessionCancelled, SessionResult};

/// The external wire-format builder could not produce a payload.
#[derive(Error, Debug)]
pub enum PayloadError {
    #[error("payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("payload rejected by builder: {0}")]
    Invalid(String),
}

/// Errors from [`ChainedSubmitter`](crate::submitter::ChainedSubmitter).
#[derive(Error, Debug)]
pub enum SubmitError {
    /// Reading the head or computing the link failed. Nothing was sent.
    #[error("chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("payload error: {0}")]
    Payload(#[from] PayloadError),

    /// The caller cancelled the session. Nothing was committed.
    #[error(transparent)]
    Cancelled(#[from] SessionCancelled),

    /// The authority accepted the record but the confirmed head could not be
    /// advanced, typically because another writer moved it.
    #[error("session {} succeeded but committing the chain head failed: {source}", .session.session_id())]
    CommitFailed {
        session: Box<SessionResult>,
        #[source]
        source: ChainError,
    },
}
