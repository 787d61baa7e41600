//! Asynchronous dispatch engine.
//!
//! # Architecture
//!
//! ```text
//! caller threads ──enqueue (non-blocking)──▶ DispatchQueue ──▶ Dispatcher ──▶ Transport
//!                                            (bounded, lossy)   (1 thread)     (1 attempt)
//! ```

pub mod queue;
pub mod stats;
pub mod worker;

pub use queue::{DispatchQueue, QueueConsumer, QueueError, QueueProducer, DEFAULT_QUEUE_CAPACITY};
pub use stats::{DispatchSnapshot, DispatchStats};
pub use worker::{DispatcherHandle, DISPATCHER_THREAD_NAME};

pub(crate) use worker::Dispatcher;
