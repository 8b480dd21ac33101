//! # Session Events
//!
//! The orchestrator reports progress as [`SessionEvent`] values to an
//! injected [`SessionObserver`]. [`TracingObserver`] forwards them to
//! `tracing`; [`NoopObserver`] drops them; [`RecordingObserver`] keeps them
//! in memory for assertions.
//!
//! Events never carry credentials or payload bytes.

use std::fmt;

use parking_lot::Mutex;
use serde::Serialize;
use verix_core::SessionId;

/// Severity of a session event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EventLevel {
    Info,
    Warn,
    Error,
}

/// What stage of the session an event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EventKind {
    SessionStarted,
    AttemptStarted,
    AttemptAnalyzed,
    TransportFailed,
    Waiting,
    Succeeded,
    Failed,
    Cancelled,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::SessionStarted => "session_started",
            Self::AttemptStarted => "attempt_started",
            Self::AttemptAnalyzed => "attempt_analyzed",
            Self::TransportFailed => "transport_failed",
            Self::Waiting => "waiting",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// One structured log event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionEvent {
    pub level: EventLevel,
    pub kind: EventKind,
    pub session_id: SessionId,
    /// One-based attempt number, absent for session-level events.
    pub attempt: Option<u32>,
    pub message: String,
    pub fields: Vec<(&'static str, String)>,
}

impl SessionEvent {
    pub fn new(
        level: EventLevel,
        kind: EventKind,
        session_id: SessionId,
        attempt: Option<u32>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            level,
            kind,
            session_id,
            attempt,
            message: message.into(),
            fields: Vec::new(),
        }
    }

    /// Add a key/value field.
    pub fn field(mut self, key: &'static str, value: impl ToString) -> Self {
        self.fields.push((key, value.to_string()));
        self
    }

    /// Value of the first field named `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Sink for session events. Must not block.
pub trait SessionObserver: Send + Sync {
    fn on_event(&self, event: &SessionEvent);
}

/// Forwards events to `tracing` at the matching level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

struct Fields<'a>(&'a [(&'static str, String)]);

impl fmt::Display for Fields<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (k, v)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{k}={v}")?;
        }
        Ok(())
    }
}

impl SessionObserver for TracingObserver {
    fn on_event(&self, event: &SessionEvent) {
        let session = &event.session_id;
        let kind = event.kind;
        let attempt = event.attempt.unwrap_or(0);
        let fields = Fields(&event.fields);
        match event.level {
            EventLevel::Info => {
                tracing::info!(%session, %kind, attempt, %fields, "{}", event.message)
            }
            EventLevel::Warn => {
                tracing::warn!(%session, %kind, attempt, %fields, "{}", event.message)
            }
            EventLevel::Error => {
                tracing::error!(%session, %kind, attempt, %fields, "{}", event.message)
            }
        }
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl SessionObserver for NoopObserver {
    fn on_event(&self, _event: &SessionEvent) {}
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<SessionEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SessionEvent> {
        self.events.lock().clone()
    }

    /// Events of one kind, in emission order.
    pub fn of_kind(&self, kind: EventKind) -> Vec<SessionEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect()
    }
}

impl SessionObserver for RecordingObserver {
    fn on_event(&self, event: &SessionEvent) {
        self.events.lock().push(event.clone());
    }
}
