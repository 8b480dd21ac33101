//! # Transport Contract
//!
//! The orchestrator reaches the authority only through [`Transport`]. A
//! transport owns its own timeout and reports failures as a typed
//! [`TransportError`]; the orchestrator decides retry versus abort from the
//! variant alone, never from message text.
//!
//! | Variant | Retried |
//! |---------|---------|
//! | `Timeout` | yes |
//! | `ConnectionError` | yes |
//! | `ServerError { status >= 500 }` | yes |
//! | `Other` | no, the session aborts |

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::cancel::CancelSignal;
use crate::response::RawResponse;

/// Classified transport failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum TransportError {
    /// The call did not complete within the transport's timeout.
    #[error("transport timed out")]
    Timeout,
    /// The authority could not be reached.
    #[error("connection error: {0}")]
    ConnectionError(String),
    /// The authority answered with a server-side HTTP status.
    #[error("authority server error: HTTP {status}")]
    ServerError {
        /// HTTP status code.
        status: u16,
    },
    /// Anything the transport does not classify. Treated as fatal.
    #[error("unclassified transport error: {0}")]
    Other(String),
}

impl TransportError {
    /// True for timeouts, connection failures and 5xx statuses.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout | Self::ConnectionError(_) => true,
            Self::ServerError { status } => *status >= 500,
            Self::Other(_) => false,
        }
    }

    /// Short machine-friendly kind, used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::ConnectionError(_) => "connection",
            Self::ServerError { .. } => "server",
            Self::Other(_) => "other",
        }
    }
}

/// Opaque, already-serialized submission body.
///
/// Wire-format construction and signing happen upstream; the core only
/// carries the bytes and their content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionPayload {
    pub content_type: String,
    pub body: Vec<u8>,
}

impl SubmissionPayload {
    pub fn new(content_type: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            content_type: content_type.into(),
            body: body.into(),
        }
    }

    pub fn json(body: impl Into<Vec<u8>>) -> Self {
        Self::new("application/json", body)
    }
}

/// Secret used to authenticate a submission. Zeroed on drop and redacted in
/// `Debug`.
#[derive(Clone)]
pub struct Credential {
    token: Zeroizing<String>,
}

impl Credential {
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            token: Zeroizing::new(token.into()),
        }
    }

    /// The raw secret. Callers must not log it.
    pub fn expose(&self) -> &str {
        &self.token
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential").field("token", &"[REDACTED]").finish()
    }
}

/// One round trip to the authority.
///
/// Implementations must surface their own timeout as
/// [`TransportError::Timeout`]. The orchestrator races every call against
/// `cancel` and drops the future when cancellation wins, so a transport only
/// needs to observe `cancel` itself if it holds resources across the call.
pub trait Transport: Send + Sync {
    fn submit(
        &self,
        payload: &SubmissionPayload,
        credential: &Credential,
        cancel: &CancelSignal,
    ) -> impl Future<Output = Result<RawResponse, TransportError>> + Send;
}

impl<T: Transport> Transport for Arc<T> {
    fn submit(
        &self,
        payload: &SubmissionPayload,
        credential: &Credential,
        cancel: &CancelSignal,
    ) -> impl Future<Output = Result<RawResponse, TransportError>> + Send {
        (**self).submit(payload, credential, cancel)
    }
}

/// One scripted reply of a [`MockTransport`].
#[derive(Debug, Clone)]
pub enum MockReply {
    Respond(RawResponse),
    Fail(TransportError),
    /// Never completes; only cancellation ends the call.
    Stall,
}

/// Transport that plays back a fixed script, for tests and dry runs.
///
/// Each call pops the next reply. Once the script is exhausted every call
/// fails with [`TransportError::Other`].
#[derive(Debug, Default)]
pub struct MockTransport {
    script: Mutex<VecDeque<MockReply>>,
    submitted: Mutex<Vec<SubmissionPayload>>,
    calls: AtomicU32,
}

impl MockTransport {
    pub fn new(script: impl IntoIterator<Item = MockReply>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            ..Self::default()
        }
    }

    /// A script of plain responses.
    pub fn responding(responses: impl IntoIterator<Item = RawResponse>) -> Self {
        Self::new(responses.into_iter().map(MockReply::Respond))
    }

    /// Append a reply to the script.
    pub fn push(&self, reply: MockReply) {
        self.script.lock().push_back(reply);
    }

    /// Number of `submit` calls so far.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Payloads received, in call order.
    pub fn submitted(&self) -> Vec<SubmissionPayload> {
        self.submitted.lock().clone()
    }

    /// Replies not yet consumed.
    pub fn remaining(&self) -> usize {
        self.script.lock().len()
    }
}

impl Transport for MockTransport {
    fn submit(
        &self,
        payload: &SubmissionPayload,
        _credential: &Credential,
        _cancel: &CancelSignal,
    ) -> impl Future<Output = Result<RawResponse, TransportError>> + Send {
        let payload = payload.clone();
        async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.submitted.lock().push(payload);
            let reply = self.script.lock().pop_front();
            match reply {
                Some(MockReply::Respond(response)) => Ok(response),
                Some(MockReply::Fail(error)) => Err(error),
                Some(MockReply::Stall) => std::future::pending().await,
                None => Err(TransportError::Other("mock transport script exhausted".into())),
            }
        }
    }
}
