//! Delivery of evidence records to the ingestion endpoint.
//!
//! The dispatcher only sees the [`Transport`] trait, so tests and hosts
//! with unusual network setups can plug in their own implementation.
//! [`HttpTransport`] is the production one.

pub mod http;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::evidence::EvidenceRecord;

pub use http::HttpTransport;

/// A successful delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    /// HTTP status returned by the endpoint (always 2xx)
    pub status: u16,
}

/// Why a delivery attempt failed.
///
/// All variants are terminal for the record: there is no retry.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Ingestion endpoint returned HTTP {status}")]
    Status { status: u16 },

    #[error("Request failed: {0}")]
    Request(String),
}

impl DeliveryError {
    /// True when the record could not be encoded at all
    pub fn is_serialization(&self) -> bool {
        matches!(self, Self::Serialization(_))
    }
}

/// Sends one record, once.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Human-readable transport name
    fn name(&self) -> &str;

    /// Perform a single delivery attempt
    async fn send(&self, record: &EvidenceRecord) -> Result<Delivery, DeliveryError>;
}
