//! Shared helpers for integration tests

#![allow(dead_code)]

use std::sync::Mutex;
use std::time::{Duration, Instant};

use provit::{Diagnostic, DiagnosticSink, ErrorKind, EvidenceClient};

/// Keeps every diagnostic it receives
#[derive(Default)]
pub struct RecordingSink {
    seen: Mutex<Vec<Diagnostic>>,
}

impl RecordingSink {
    pub fn all(&self) -> Vec<Diagnostic> {
        self.seen.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<ErrorKind> {
        self.all().iter().map(|d| d.kind).collect()
    }
}

impl DiagnosticSink for RecordingSink {
    fn emit(&self, diagnostic: &Diagnostic) {
        self.seen.lock().unwrap().push(diagnostic.clone());
    }
}

/// A localhost port with nothing listening on it
pub fn refused_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// Wait (without blocking the runtime) until every accepted record settled
pub async fn settle(client: &EvidenceClient, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    loop {
        let stats = client.stats();
        if stats.settled() >= stats.accepted {
            return;
        }
        assert!(
            Instant::now() < deadline,
            "dispatcher did not settle: {:?}",
            stats
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
