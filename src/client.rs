//! The public evidence client.
//!
//! One client owns one dispatch queue and one dispatcher thread. The
//! capture methods build a record on the caller's thread, hand it to the
//! queue and return: they never wait on the network and never fail.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::debug;

use crate::config::{ClientConfig, ConfigError};
use crate::diagnostics::{DebugChannel, DiagnosticSink, ErrorKind, TracingSink};
use crate::dispatch::{
    DispatchQueue, DispatchSnapshot, DispatchStats, Dispatcher, DispatcherHandle, QueueError,
    QueueProducer,
};
use crate::evidence::{CaptureFields, EvidenceRecord, SdkMetadata};
use crate::shell::{self, CaptureError};
use crate::transport::{HttpTransport, Transport};

/// How often [`EvidenceClient::flush`] re-checks the counters
const FLUSH_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Errors constructing a client. Capture itself never errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to build HTTP transport: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to start dispatcher thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Fire-and-forget evidence client
pub struct EvidenceClient {
    producer: QueueProducer,
    stats: Arc<DispatchStats>,
    channel: DebugChannel,
    metadata: SdkMetadata,
    normalize_labels: bool,
    accepting: AtomicBool,
    dispatcher: DispatcherHandle,
}

impl EvidenceClient {
    /// Client with the HTTP transport and tracing diagnostics
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        Self::builder(config).build()
    }

    /// Client configured from `PROVIT_*` environment variables
    pub fn from_env() -> Result<Self, ClientError> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Start a builder for custom transport or diagnostics
    pub fn builder(config: ClientConfig) -> ClientBuilder {
        ClientBuilder {
            config,
            transport: None,
            diagnostics: None,
        }
    }

    /// Capture AI runtime recommendation evidence.
    ///
    /// Returns immediately. Invalid input, a full queue, a shut-down client
    /// and internal panics all turn this call into a no-op (reported on the
    /// debug channel when `debug` is enabled).
    pub fn capture_ai_runtime_evidence(
        &self,
        decision_id: &str,
        model_name: &str,
        model_version: &str,
        label: &str,
        confidence_score: f64,
    ) {
        self.capture(&CaptureFields::new(
            decision_id,
            model_name,
            model_version,
            label,
            confidence_score,
        ));
    }

    /// Struct form of [`capture_ai_runtime_evidence`](Self::capture_ai_runtime_evidence)
    pub fn capture(&self, fields: &CaptureFields<'_>) {
        let outcome = shell::contain(&self.channel, fields.decision_id, || {
            self.try_capture(fields)
        });

        if let Err(ErrorKind::Panic) = outcome {
            self.stats.record_rejected();
        }
    }

    fn try_capture(&self, fields: &CaptureFields<'_>) -> Result<(), CaptureError> {
        if !self.accepting.load(Ordering::Acquire) {
            self.stats.record_dropped();
            return Err(QueueError::Closed.into());
        }

        let record = EvidenceRecord::build(fields, self.normalize_labels, &self.metadata)
            .map_err(|e| {
                self.stats.record_rejected();
                e
            })?;

        if let Err(e) = self.producer.enqueue(record) {
            self.stats.record_dropped();
            return Err(e.into());
        }

        self.stats.record_accepted();
        Ok(())
    }

    /// Stop accepting captures and let the dispatcher exit.
    ///
    /// Does not wait. Records still queued are abandoned; call
    /// [`flush`](Self::flush) first to give them a chance.
    pub fn shutdown(&self) {
        if self.accepting.swap(false, Ordering::AcqRel) {
            debug!(
                pending = self.producer.depth(),
                "Shutting down evidence client"
            );
        }
        self.dispatcher.stop();
    }

    /// Block until every accepted record has had its delivery attempt, or
    /// `timeout` elapses. Returns true if everything settled.
    ///
    /// Best effort: captures racing with the flush may not be waited for.
    pub fn flush(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.stats.outstanding() == 0 {
                return true;
            }
            if self.dispatcher.is_finished() || Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(FLUSH_POLL_INTERVAL);
        }
    }

    /// Records waiting in the queue (excluding one in flight)
    pub fn queue_depth(&self) -> usize {
        self.producer.depth()
    }

    pub fn queue_capacity(&self) -> usize {
        self.producer.capacity()
    }

    /// Current counters
    pub fn stats(&self) -> DispatchSnapshot {
        self.stats.snapshot()
    }

    /// True until shutdown or until the dispatcher dies
    pub fn is_running(&self) -> bool {
        self.accepting.load(Ordering::Acquire) && !self.dispatcher.is_finished()
    }
}

impl Drop for EvidenceClient {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Builder for [`EvidenceClient`]
pub struct ClientBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn Transport>>,
    diagnostics: Option<Arc<dyn DiagnosticSink>>,
}

impl ClientBuilder {
    /// Replace the HTTP transport
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Replace the tracing diagnostics sink
    pub fn diagnostics(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = Some(sink);
        self
    }

    /// Validate config, create the queue and start the dispatcher
    pub fn build(self) -> Result<EvidenceClient, ClientError> {
        let config = self.config;
        config.validate()?;

        let transport: Arc<dyn Transport> = match self.transport {
            Some(t) => t,
            None => Arc::new(HttpTransport::new(&config)?),
        };
        let sink = self.diagnostics.unwrap_or_else(|| Arc::new(TracingSink));
        let channel = DebugChannel::new(config.debug, sink);
        let stats = Arc::new(DispatchStats::new());

        let (producer, consumer) = DispatchQueue::bounded(config.queue_capacity);

        debug!(
            endpoint = %config.events_endpoint(),
            transport = transport.name(),
            capacity = config.queue_capacity,
            "Starting evidence client"
        );

        let dispatcher = Dispatcher {
            consumer,
            transport,
            stats: Arc::clone(&stats),
            channel: channel.clone(),
        }
        .spawn()?;

        Ok(EvidenceClient {
            producer,
            stats,
            channel,
            metadata: SdkMetadata::current(),
            normalize_labels: config.normalize_labels,
            accepting: AtomicBool::new(true),
            dispatcher,
        })
    }
}
