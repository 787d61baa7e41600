//! Fail-safe boundary around the capture path.
//!
//! Internally the capture path uses ordinary `Result` propagation. At the
//! public entry point [`contain`] turns every error, and every panic, into
//! "nothing happened" plus an optional diagnostic. Nothing crosses into
//! the host.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use thiserror::Error;

use crate::diagnostics::{DebugChannel, Diagnostic, ErrorKind};
use crate::dispatch::QueueError;
use crate::evidence::ConstructionError;
use crate::transport::DeliveryError;

/// Any failure along the capture and delivery path
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Invalid evidence: {0}")]
    Construction(#[from] ConstructionError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("Delivery failed: {0}")]
    Delivery(#[from] DeliveryError),
}

impl CaptureError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Construction(_) => ErrorKind::Construction,
            Self::Queue(QueueError::Full { .. }) => ErrorKind::QueueFull,
            Self::Queue(QueueError::Closed) => ErrorKind::QueueClosed,
            Self::Delivery(e) if e.is_serialization() => ErrorKind::Serialization,
            Self::Delivery(_) => ErrorKind::Transport,
        }
    }
}

/// Run `f`, swallowing its error or panic.
///
/// Failures are reported on `channel` (a no-op unless debug is enabled)
/// tagged with `decision_id`; only their [`ErrorKind`] is handed back.
pub(crate) fn contain<T, F>(channel: &DebugChannel, decision_id: &str, f: F) -> Result<T, ErrorKind>
where
    F: FnOnce() -> Result<T, CaptureError>,
{
    let diagnostic = match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => return Ok(value),
        Ok(Err(err)) => Diagnostic::new(err.kind(), err.to_string()),
        Err(payload) => Diagnostic::new(ErrorKind::Panic, panic_message(payload.as_ref())),
    };
    let kind = diagnostic.kind;

    if channel.is_enabled() {
        report(channel, diagnostic.with_decision(decision_id));
    }

    Err(kind)
}

/// Emit on the debug channel; a misbehaving sink must not break the boundary
pub(crate) fn report(channel: &DebugChannel, diagnostic: Diagnostic) {
    let _ = panic::catch_unwind(AssertUnwindSafe(|| channel.report(|| diagnostic)));
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panic: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panic: {}", s)
    } else {
        "panic: <non-string payload>".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticSink;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Default)]
    struct Collect(Mutex<Vec<Diagnostic>>);

    impl DiagnosticSink for Collect {
        fn emit(&self, diagnostic: &Diagnostic) {
            self.0.lock().unwrap().push(diagnostic.clone());
        }
    }

    struct Explodes;

    impl DiagnosticSink for Explodes {
        fn emit(&self, _: &Diagnostic) {
            panic!("sink exploded");
        }
    }

    #[test]
    fn test_success_passes_value_through() {
        let channel = DebugChannel::new(true, Arc::new(Collect::default()));
        assert_eq!(contain(&channel, "d", || Ok(42)), Ok(42));
    }

    #[test]
    fn test_error_is_swallowed_and_reported() {
        let sink = Arc::new(Collect::default());
        let channel = DebugChannel::new(true, sink.clone());

        let out: Result<(), ErrorKind> = contain(&channel, "txn-9", || {
            Err(QueueError::Full { capacity: 3 }.into())
        });
        assert_eq!(out, Err(ErrorKind::QueueFull));

        let seen = sink.0.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].kind, ErrorKind::QueueFull);
        assert_eq!(seen[0].decision_id.as_deref(), Some("txn-9"));
    }

    #[test]
    fn test_panic_is_contained() {
        let sink = Arc::new(Collect::default());
        let channel = DebugChannel::new(true, sink.clone());

        let out: Result<(), ErrorKind> = contain(&channel, "d", || panic!("label exploded"));
        assert_eq!(out, Err(ErrorKind::Panic));

        let seen = sink.0.lock().unwrap();
        assert_eq!(seen[0].kind, ErrorKind::Panic);
        assert!(seen[0].reason.contains("label exploded"));
    }

    #[test]
    fn test_silent_without_debug() {
        let sink = Arc::new(Collect::default());
        let channel = DebugChannel::new(false, sink.clone());

        let out: Result<(), ErrorKind> = contain(&channel, "d", || {
            Err(ConstructionError::EmptyField { field: "label" }.into())
        });
        assert_eq!(out, Err(ErrorKind::Construction));
        assert!(sink.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_panicking_sink_is_contained() {
        let channel = DebugChannel::new(true, Arc::new(Explodes));
        let out: Result<(), ErrorKind> = contain(&channel, "d", || Err(QueueError::Closed.into()));
        assert_eq!(out, Err(ErrorKind::QueueClosed));
    }

    #[test]
    fn test_kind_mapping() {
        let err: CaptureError = DeliveryError::Timeout(Duration::from_secs(2)).into();
        assert_eq!(err.kind(), ErrorKind::Transport);

        let err: CaptureError = DeliveryError::Status { status: 503 }.into();
        assert_eq!(err.kind(), ErrorKind::Transport);

        let bad_json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: CaptureError = DeliveryError::Serialization(bad_json).into();
        assert_eq!(err.kind(), ErrorKind::Serialization);

        let err: CaptureError = QueueError::Closed.into();
        assert_eq!(err.kind(), ErrorKind::QueueClosed);
    }
}
