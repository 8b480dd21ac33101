//! # verix-submit: Resilient Submission
//!
//! Submits chained records to the tax authority over an unreliable
//! transport and decides, attempt by attempt, whether to retry, wait or
//! stop.
//!
//! ```text
//! RetryOrchestrator ──> Transport::submit ──> ResponseAnalyzer::analyze
//!        ^                                           │
//!        └──── continue / stop <── ErrorClassifier::lookup (per line)
//! ```
//!
//! - [`catalog`]: the read-only error code catalog and prefix inference.
//! - [`analyzer`]: per-attempt aggregation, retry law and wait computation.
//! - [`orchestrator`]: the session state machine with cancelable waits.
//! - [`transport`]: the transport contract, typed errors and a scripted mock.
//! - [`http`]: a `reqwest` transport.
//! - [`submitter`]: chain link, session and confirmed-head commit for one record.
//!
//! Classification results travel in [`SubmissionOutcome`] and
//! [`SessionResult`], never as errors. Logging goes through an injected
//! [`SessionObserver`]; the library installs no `tracing` subscriber.

pub mod analyzer;
pub mod cancel;
pub mod catalog;
pub mod config;
pub mod error;
pub mod http;
pub mod observer;
pub mod orchestrator;
pub mod profile;
pub mod response;
pub mod session;
pub mod submitter;
pub mod transport;

pub use analyzer::{backoff_with_jitter, ResponseAnalyzer};
pub use cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use catalog::{ErrorCategory, ErrorClassifier, ErrorDescriptor};
pub use config::{ConfigError, SubmitConfig};
pub use error::{PayloadError, SubmitError};
pub use http::HttpTransport;
pub use observer::{
    EventKind, EventLevel, NoopObserver, RecordingObserver, SessionEvent, SessionObserver,
    TracingObserver,
};
pub use orchestrator::{RetryOrchestrator, WaitSource};
pub use profile::{ProfileError, RetryProfile};
pub use response::{
    ClassifiedError, GlobalStatus, LineResult, LineState, RawResponse, SubmissionOutcome,
};
pub use session::{CancelPoint, FailureReason, SessionCancelled, SessionResult};
pub use submitter::{ChainedSubmission, ChainedSubmitter, JsonPayloadBuilder, PayloadBuilder};
pub use transport::{
    Credential, MockReply, MockTransport, SubmissionPayload, Transport, TransportError,
};
