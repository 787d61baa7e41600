//! Dispatch counters.
//!
//! Shared between caller threads and the dispatcher. Relaxed atomics are
//! enough: counters are monotonic and read only for reporting.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Live counters for one client
#[derive(Debug, Default)]
pub struct DispatchStats {
    accepted: AtomicU64,
    dropped: AtomicU64,
    rejected: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
}

impl DispatchStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record made it into the queue
    pub fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record lost to a full or closed queue
    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Capture skipped before a record existed (bad input, panic)
    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Endpoint answered 2xx
    pub fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    /// Delivery attempt failed; record discarded
    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Accepted records whose single delivery attempt has not finished
    pub fn outstanding(&self) -> u64 {
        let settled = self.delivered.load(Ordering::Relaxed) + self.failed.load(Ordering::Relaxed);
        self.accepted.load(Ordering::Relaxed).saturating_sub(settled)
    }

    pub fn snapshot(&self) -> DispatchSnapshot {
        DispatchSnapshot {
            accepted: self.accepted.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`DispatchStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSnapshot {
    pub accepted: u64,
    pub dropped: u64,
    pub rejected: u64,
    pub delivered: u64,
    pub failed: u64,
}

impl DispatchSnapshot {
    /// Total capture calls observed
    pub fn captures(&self) -> u64 {
        self.accepted + self.dropped + self.rejected
    }

    /// Accepted records with a finished delivery attempt
    pub fn settled(&self) -> u64 {
        self.delivered + self.failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outstanding_tracks_settlement() {
        let stats = DispatchStats::new();
        stats.record_accepted();
        stats.record_accepted();
        stats.record_accepted();
        assert_eq!(stats.outstanding(), 3);

        stats.record_delivered();
        stats.record_failed();
        assert_eq!(stats.outstanding(), 1);

        let snap = stats.snapshot();
        assert_eq!(snap.settled(), 2);
    }

    #[test]
    fn test_captures_counts_every_outcome() {
        let stats = DispatchStats::new();
        stats.record_accepted();
        stats.record_dropped();
        stats.record_rejected();

        let snap = stats.snapshot();
        assert_eq!(snap.captures(), 3);
        assert_eq!(snap.dropped, 1);
        assert_eq!(snap.rejected, 1);
    }
}
