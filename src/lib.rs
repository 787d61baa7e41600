//! provit - Fire-and-forget evidence capture for AI runtime decisions
//!
//! Embedded in a host application that runs models in production. Every
//! time the host makes an automated decision it records a structured
//! evidence record, which is shipped to the ingestion endpoint in the
//! background.
//!
//! # Architecture
//!
//! The capture call must never slow down or destabilize the host:
//! - Records are built on the caller's thread and pushed onto a bounded queue
//! - A single background dispatcher performs all network I/O
//! - Every failure (bad input, full queue, network, panics) is contained
//!   and, only in debug mode, reported on a diagnostics channel
//! - Delivery is best effort: one attempt per record, no retry, no persistence
//!
//! # Modules
//!
//! - `evidence`: Record construction and label normalization
//! - `dispatch`: Queue, dispatcher thread and counters
//! - `transport`: Wire delivery (HTTP)
//! - `shell`: Fail-safe boundary
//! - `diagnostics`: Debug channel
//! - `config`: Client configuration
//! - `client`: Public API
//!
//! # Usage
//!
//! ```no_run
//! use provit::{ClientConfig, EvidenceClient};
//!
//! let client = EvidenceClient::new(ClientConfig::new("prod-key")).unwrap();
//!
//! // Returns immediately, whatever the network is doing
//! client.capture_ai_runtime_evidence("txn-1", "fraud-model", "2.3.1", "Approve", 0.95);
//! ```

pub mod client;
pub mod config;
pub mod diagnostics;
pub mod dispatch;
pub mod evidence;
pub mod shell;
pub mod transport;

/// Version reported in every record's metadata
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

// Re-export main types at crate root for convenience
pub use client::{ClientBuilder, ClientError, EvidenceClient};
pub use config::{ClientConfig, ConfigError};
pub use diagnostics::{Diagnostic, DiagnosticSink, ErrorKind, TracingSink};
pub use dispatch::{DispatchSnapshot, QueueError};
pub use evidence::{normalize_label, CaptureFields, ConstructionError, EvidenceRecord};
pub use shell::CaptureError;
pub use transport::{Delivery, DeliveryError, HttpTransport, Transport};
