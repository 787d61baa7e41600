//! Bounded in-memory dispatch queue.
//!
//! Decouples caller threads from network I/O. Producers never wait: when
//! the queue is at capacity the new record is dropped and the caller is
//! told so through [`QueueError::Full`]. Losing evidence under overload is
//! preferred to blocking the host or growing memory without bound.
//!
//! Any number of [`QueueProducer`] clones may enqueue concurrently; exactly
//! one [`QueueConsumer`] exists per queue.

use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::evidence::EvidenceRecord;

/// Default queue bound
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

/// Errors that can occur when enqueueing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("Dispatch queue full (capacity {capacity}), record dropped")]
    Full { capacity: usize },

    #[error("Dispatch queue closed, record dropped")]
    Closed,
}

/// Constructor namespace for a producer/consumer pair
pub struct DispatchQueue;

impl DispatchQueue {
    /// Create a queue holding at most `capacity` records (minimum 1)
    pub fn bounded(capacity: usize) -> (QueueProducer, QueueConsumer) {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        (QueueProducer { tx, capacity }, QueueConsumer { rx })
    }
}

/// Caller-side handle. Cheap to clone.
#[derive(Debug, Clone)]
pub struct QueueProducer {
    tx: mpsc::Sender<EvidenceRecord>,
    capacity: usize,
}

impl QueueProducer {
    /// Push a record without waiting.
    ///
    /// On error the record has already been dropped.
    pub fn enqueue(&self, record: EvidenceRecord) -> Result<(), QueueError> {
        match self.tx.try_send(record) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(QueueError::Full {
                capacity: self.capacity,
            }),
            Err(TrySendError::Closed(_)) => Err(QueueError::Closed),
        }
    }

    /// Records currently waiting for the consumer
    pub fn depth(&self) -> usize {
        self.capacity.saturating_sub(self.tx.capacity())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// True once the consumer has closed or been dropped
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Dispatcher-side handle. Not cloneable: one consumer per queue.
#[derive(Debug)]
pub struct QueueConsumer {
    rx: mpsc::Receiver<EvidenceRecord>,
}

impl QueueConsumer {
    /// Wait for the next record.
    ///
    /// Returns `None` once every producer is gone and the buffer is empty,
    /// or after [`close`](Self::close) once the buffer is empty.
    pub async fn dequeue(&mut self) -> Option<EvidenceRecord> {
        self.rx.recv().await
    }

    /// Blocking variant of [`dequeue`](Self::dequeue) for non-async threads.
    ///
    /// Panics if called from within an async runtime.
    pub fn dequeue_blocking(&mut self) -> Option<EvidenceRecord> {
        self.rx.blocking_recv()
    }

    /// Stop accepting new records. Already-buffered records stay readable.
    pub fn close(&mut self) {
        self.rx.close();
    }
}
