//! Debug channel for contained failures.
//!
//! Nothing here reaches the host's normal output. With `debug` off the
//! client never calls the sink at all; with it on, each contained failure
//! becomes one [`Diagnostic`]. The default sink forwards to `tracing`, so
//! diagnostics land wherever the host's subscriber sends them.

use std::fmt;

use serde::Serialize;
use uuid::Uuid;

/// Tracing target used by [`TracingSink`]
pub const DIAGNOSTICS_TARGET: &str = "provit::diagnostics";

/// Category of a contained failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing or malformed evidence fields
    Construction,

    /// Dispatch queue at capacity
    QueueFull,

    /// Client shut down or dispatcher gone
    QueueClosed,

    /// Network failure, timeout or non-2xx response
    Transport,

    /// Record could not be encoded
    Serialization,

    /// A panic was caught at a containment boundary
    Panic,

    /// The dispatcher could not start; nothing will be delivered
    Runtime,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Construction => "construction",
            Self::QueueFull => "queue_full",
            Self::QueueClosed => "queue_closed",
            Self::Transport => "transport",
            Self::Serialization => "serialization",
            Self::Panic => "panic",
            Self::Runtime => "runtime",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One contained failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: ErrorKind,

    /// Short human-readable reason
    pub reason: String,

    /// Record involved, once one exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<Uuid>,

    /// Caller's decision ID, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision_id: Option<String>,
}

impl Diagnostic {
    pub fn new(kind: ErrorKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
            event_id: None,
            decision_id: None,
        }
    }

    pub fn with_event(mut self, event_id: Uuid, decision_id: &str) -> Self {
        self.event_id = Some(event_id);
        self.decision_id = Some(decision_id.to_string());
        self
    }

    pub fn with_decision(mut self, decision_id: &str) -> Self {
        self.decision_id = Some(decision_id.to_string());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.reason)
    }
}

/// Receives diagnostics. Object-safe for use behind `Arc<dyn DiagnosticSink>`.
///
/// Called from caller threads and the dispatcher thread; implementations
/// must not block and must not panic.
pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, diagnostic: &Diagnostic);
}

/// Default sink: one `warn!` event per diagnostic
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&self, diagnostic: &Diagnostic) {
        tracing::warn!(
            target: DIAGNOSTICS_TARGET,
            kind = %diagnostic.kind,
            event_id = ?diagnostic.event_id,
            decision_id = ?diagnostic.decision_id,
            "{}",
            diagnostic.reason
        );
    }
}

/// Gate in front of a sink: forwards only when debug is on
#[derive(Clone)]
pub(crate) struct DebugChannel {
    enabled: bool,
    sink: std::sync::Arc<dyn DiagnosticSink>,
}

impl DebugChannel {
    pub(crate) fn new(enabled: bool, sink: std::sync::Arc<dyn DiagnosticSink>) -> Self {
        Self { enabled, sink }
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Build and emit lazily, so silent mode pays nothing
    pub(crate) fn report<F>(&self, build: F)
    where
        F: FnOnce() -> Diagnostic,
    {
        if self.enabled {
            self.sink.emit(&build());
        }
    }
}
