//! Background dispatcher.
//!
//! A single worker drains the queue and makes exactly one delivery attempt
//! per record. It runs on its own OS thread with a current-thread tokio
//! runtime, so it works whether or not the host uses tokio, and the
//! detached thread never holds the process open.
//!
//! Every failure is absorbed here: errors and panics from the transport
//! are counted and, in debug mode, reported. Nothing is retried or
//! requeued.

use std::io;
use std::sync::Arc;
use std::thread::JoinHandle;

use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use super::queue::QueueConsumer;
use super::stats::DispatchStats;
use crate::diagnostics::{DebugChannel, Diagnostic, ErrorKind};
use crate::evidence::EvidenceRecord;
use crate::shell::{panic_message, report, CaptureError};
use crate::transport::Transport;

/// Name given to the worker thread
pub const DISPATCHER_THREAD_NAME: &str = "provit-dispatcher";

/// Everything the worker owns
pub(crate) struct Dispatcher {
    pub(crate) consumer: QueueConsumer,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) stats: Arc<DispatchStats>,
    pub(crate) channel: DebugChannel,
}

impl Dispatcher {
    /// Start the worker thread
    pub(crate) fn spawn(self) -> io::Result<DispatcherHandle> {
        self.spawn_with(build_runtime)
    }

    /// Start the worker thread on a runtime from `build`
    fn spawn_with<B>(self, build: B) -> io::Result<DispatcherHandle>
    where
        B: FnOnce() -> io::Result<Runtime> + Send + 'static,
    {
        let (stop_tx, stop_rx) = mpsc::channel::<()>(1);

        let thread = std::thread::Builder::new()
            .name(DISPATCHER_THREAD_NAME.to_string())
            .spawn(move || {
                let runtime = match build() {
                    Ok(rt) => rt,
                    Err(e) => {
                        debug!("Dispatcher runtime failed to start: {}", e);
                        report(
                            &self.channel,
                            Diagnostic::new(
                                ErrorKind::Runtime,
                                format!("dispatcher runtime failed to start: {}", e),
                            ),
                        );
                        // Dropping the consumer closes the queue; captures become no-ops
                        return;
                    }
                };
                runtime.block_on(self.run(stop_rx));
            })?;

        Ok(DispatcherHandle { stop_tx, thread })
    }

    async fn run(mut self, mut stop_rx: mpsc::Receiver<()>) {
        debug!(transport = self.transport.name(), "Dispatcher started");

        loop {
            let record = tokio::select! {
                biased;
                // Fires on stop() and when the handle is dropped
                _ = stop_rx.recv() => break,
                next = self.consumer.dequeue() => match next {
                    Some(record) => record,
                    None => break,
                },
            };

            self.deliver(record).await;
        }

        // Anything still buffered is abandoned
        self.consumer.close();
        debug!("Dispatcher stopped");
    }

    /// One attempt, outcome counted, never propagated
    async fn deliver(&self, record: EvidenceRecord) {
        let event_id = record.event_id();
        let decision_id = self
            .channel
            .is_enabled()
            .then(|| record.decision_id().to_string());

        // Spawned so a panicking transport surfaces as a JoinError
        let transport = Arc::clone(&self.transport);
        let attempt = tokio::spawn(async move { transport.send(&record).await });

        let diagnostic = match attempt.await {
            Ok(Ok(delivery)) => {
                trace!(%event_id, status = delivery.status, "Evidence delivered");
                self.stats.record_delivered();
                return;
            }
            Ok(Err(err)) => {
                let err = CaptureError::from(err);
                Diagnostic::new(err.kind(), err.to_string())
            }
            Err(join_err) => {
                let reason = if join_err.is_panic() {
                    panic_message(join_err.into_panic().as_ref())
                } else {
                    "delivery task cancelled".to_string()
                };
                Diagnostic::new(ErrorKind::Panic, reason)
            }
        };

        // Count last: once a record is settled its report has been emitted
        if let Some(decision_id) = decision_id {
            report(&self.channel, diagnostic.with_event(event_id, &decision_id));
        }
        self.stats.record_failed();
    }
}

fn build_runtime() -> io::Result<Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
}

/// Owner-side handle to the worker thread
pub struct DispatcherHandle {
    stop_tx: mpsc::Sender<()>,
    thread: JoinHandle<()>,
}

impl DispatcherHandle {
    /// Ask the worker to exit after its current attempt. Idempotent.
    pub fn stop(&self) {
        let _ = self.stop_tx.try_send(());
    }

    /// True once the worker thread has exited
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticSink;
    use crate::dispatch::queue::DispatchQueue;
    use crate::evidence::{CaptureFields, SdkMetadata};
    use crate::transport::{Delivery, DeliveryError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    /// Succeeds, fails or panics depending on the decision ID
    #[derive(Default)]
    struct ScriptedTransport {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn send(&self, record: &EvidenceRecord) -> Result<Delivery, DeliveryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match record.decision_id() {
                "fail" => Err(DeliveryError::Status { status: 500 }),
                "panic" => panic!("transport blew up"),
                _ => Ok(Delivery { status: 200 }),
            }
        }
    }

    #[derive(Default)]
    struct Collect(Mutex<Vec<Diagnostic>>);

    impl DiagnosticSink for Collect {
        fn emit(&self, diagnostic: &Diagnostic) {
            self.0.lock().unwrap().push(diagnostic.clone());
        }
    }

    fn record(decision_id: &str) -> EvidenceRecord {
        EvidenceRecord::build(
            &CaptureFields::new(decision_id, "m", "1.0", "approve", 0.5),
            true,
            &SdkMetadata::current(),
        )
        .unwrap()
    }

    fn wait_for(mut done: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !done() {
            assert!(Instant::now() < deadline, "timed out waiting for dispatcher");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_delivers_each_record_once_and_survives_failures() {
        let (producer, consumer) = DispatchQueue::bounded(16);
        let transport = Arc::new(ScriptedTransport::default());
        let stats = Arc::new(DispatchStats::new());
        let sink = Arc::new(Collect::default());

        let handle = Dispatcher {
            consumer,
            transport: transport.clone(),
            stats: stats.clone(),
            channel: DebugChannel::new(true, sink.clone()),
        }
        .spawn()
        .unwrap();

        for id in ["ok-1", "fail", "panic", "ok-2"] {
            producer.enqueue(record(id)).unwrap();
            stats.record_accepted();
        }

        wait_for(|| stats.outstanding() == 0);

        let snap = stats.snapshot();
        assert_eq!(snap.delivered, 2);
        assert_eq!(snap.failed, 2);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 4);

        let seen = sink.0.lock().unwrap();
        let kinds: Vec<ErrorKind> = seen.iter().map(|d| d.kind).collect();
        assert_eq!(kinds, vec![ErrorKind::Transport, ErrorKind::Panic]);
        assert_eq!(seen[0].decision_id.as_deref(), Some("fail"));
        assert!(seen[0].event_id.is_some());
        drop(seen);

        handle.stop();
        wait_for(|| handle.is_finished());
        assert!(producer.is_closed());
    }

    #[test]
    fn test_no_diagnostics_without_debug() {
        let (producer, consumer) = DispatchQueue::bounded(4);
        let stats = Arc::new(DispatchStats::new());
        let sink = Arc::new(Collect::default());

        let _handle = Dispatcher {
            consumer,
            transport: Arc::new(ScriptedTransport::default()),
            stats: stats.clone(),
            channel: DebugChannel::new(false, sink.clone()),
        }
        .spawn()
        .unwrap();

        producer.enqueue(record("fail")).unwrap();
        stats.record_accepted();
        wait_for(|| stats.outstanding() == 0);

        assert_eq!(stats.snapshot().failed, 1);
        assert!(sink.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_dropping_handle_stops_worker() {
        let (producer, consumer) = DispatchQueue::bounded(4);
        let handle = Dispatcher {
            consumer,
            transport: Arc::new(ScriptedTransport::default()),
            stats: Arc::new(DispatchStats::new()),
            channel: DebugChannel::new(false, Arc::new(Collect::default())),
        }
        .spawn()
        .unwrap();

        drop(handle);
        wait_for(|| producer.is_closed());
        assert!(producer.enqueue(record("late")).is_err());
    }

    #[test]
    fn test_runtime_failure_is_reported_and_closes_queue() {
        let (producer, consumer) = DispatchQueue::bounded(4);
        let sink = Arc::new(Collect::default());

        let handle = Dispatcher {
            consumer,
            transport: Arc::new(ScriptedTransport::default()),
            stats: Arc::new(DispatchStats::new()),
            channel: DebugChannel::new(true, sink.clone()),
        }
        .spawn_with(|| Err(io::Error::new(io::ErrorKind::Other, "no reactor")))
        .unwrap();

        wait_for(|| handle.is_finished());
        assert!(producer.is_closed());
        assert!(producer.enqueue(record("late")).is_err());

        let seen = sink.0.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].kind, ErrorKind::Runtime);
        assert!(seen[0].reason.contains("no reactor"));
    }

    #[test]
    fn test_runtime_failure_silent_without_debug() {
        let (_producer, consumer) = DispatchQueue::bounded(4);
        let sink = Arc::new(Collect::default());

        let handle = Dispatcher {
            consumer,
            transport: Arc::new(ScriptedTransport::default()),
            stats: Arc::new(DispatchStats::new()),
            channel: DebugChannel::new(false, sink.clone()),
        }
        .spawn_with(|| Err(io::Error::new(io::ErrorKind::Other, "no reactor")))
        .unwrap();

        wait_for(|| handle.is_finished());
        assert!(sink.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_worker_thread_is_named() {
        let (_producer, consumer) = DispatchQueue::bounded(1);
        let handle = Dispatcher {
            consumer,
            transport: Arc::new(ScriptedTransport::default()),
            stats: Arc::new(DispatchStats::new()),
            channel: DebugChannel::new(false, Arc::new(Collect::default())),
        }
        .spawn()
        .unwrap();

        assert_eq!(handle.thread.thread().name(), Some(DISPATCHER_THREAD_NAME));
    }
}
