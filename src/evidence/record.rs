//! The evidence record and its wire layout.
//!
//! A record is built once, on the caller's thread, and never mutated
//! afterwards. Its fields are private so `event_id` and `timestamp` stay
//! exactly as assigned at capture time, whatever happens during delivery.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;
use uuid::Uuid;

use super::normalize::prepare_label;

/// Record category for model recommendations
pub const EVENT_TYPE_AI_RUNTIME: &str = "ai.runtime";

/// Errors raised while building a record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstructionError {
    #[error("Required field is empty: {field}")]
    EmptyField { field: &'static str },
}

/// Caller-supplied values for one capture.
#[derive(Debug, Clone, Copy)]
pub struct CaptureFields<'a> {
    /// Business decision this evidence belongs to (opaque)
    pub decision_id: &'a str,

    /// Model that produced the recommendation
    pub model_name: &'a str,

    /// Version of that model
    pub model_version: &'a str,

    /// The model's output (e.g. "approve", "fraud")
    pub label: &'a str,

    /// Model confidence, nominally 0.0 - 1.0 but forwarded as-is
    pub confidence_score: f64,
}

impl<'a> CaptureFields<'a> {
    pub fn new(
        decision_id: &'a str,
        model_name: &'a str,
        model_version: &'a str,
        label: &'a str,
        confidence_score: f64,
    ) -> Self {
        Self {
            decision_id,
            model_name,
            model_version,
            label,
            confidence_score,
        }
    }
}

/// Model identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRef {
    pub name: String,
    pub version: String,
}

/// What the model recommended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub label: String,
    pub confidence_score: f64,
}

/// Decision payload nested under `payload`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidencePayload {
    pub model: ModelRef,
    pub recommendation: Recommendation,
}

/// SDK-populated metadata attached to every record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdkMetadata {
    /// Version of this crate
    pub sdk_version: String,

    /// Always "rust"
    pub language: String,

    /// rustc version the crate was built with
    pub runtime_version: String,
}

impl SdkMetadata {
    /// Metadata describing the running build
    pub fn current() -> Self {
        Self {
            sdk_version: crate::SDK_VERSION.to_string(),
            language: "rust".to_string(),
            runtime_version: option_env!("PROVIT_RUSTC_VERSION")
                .unwrap_or("unknown")
                .to_string(),
        }
    }
}

impl Default for SdkMetadata {
    fn default() -> Self {
        Self::current()
    }
}

/// One auditable AI decision event.
///
/// Serializes directly to the ingestion wire format; field order here is
/// the order on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceRecord {
    event_type: String,
    event_id: Uuid,
    decision_id: String,
    #[serde(serialize_with = "serialize_timestamp")]
    timestamp: DateTime<Utc>,
    payload: EvidencePayload,
    metadata: SdkMetadata,
}

impl EvidenceRecord {
    /// Build a record from caller input.
    ///
    /// Assigns a fresh `event_id` and the capture timestamp. Performs no I/O.
    /// Blank required fields are rejected; the confidence score is not
    /// range-checked.
    pub fn build(
        fields: &CaptureFields<'_>,
        normalize_labels: bool,
        metadata: &SdkMetadata,
    ) -> Result<Self, ConstructionError> {
        require("decision_id", fields.decision_id)?;
        require("model_name", fields.model_name)?;
        require("model_version", fields.model_version)?;
        require("label", fields.label)?;

        Ok(Self {
            event_type: EVENT_TYPE_AI_RUNTIME.to_string(),
            event_id: Uuid::new_v4(),
            decision_id: fields.decision_id.to_string(),
            timestamp: Utc::now(),
            payload: EvidencePayload {
                model: ModelRef {
                    name: fields.model_name.to_string(),
                    version: fields.model_version.to_string(),
                },
                recommendation: Recommendation {
                    label: prepare_label(fields.label, normalize_labels),
                    confidence_score: fields.confidence_score,
                },
            },
            metadata: metadata.clone(),
        })
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn decision_id(&self) -> &str {
        &self.decision_id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn payload(&self) -> &EvidencePayload {
        &self.payload
    }

    pub fn metadata(&self) -> &SdkMetadata {
        &self.metadata
    }

    /// Encode to the JSON wire format
    pub fn to_wire(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

fn require(field: &'static str, value: &str) -> Result<(), ConstructionError> {
    if value.trim().is_empty() {
        return Err(ConstructionError::EmptyField { field });
    }
    Ok(())
}

/// ISO-8601 UTC with microseconds and a `Z` suffix
fn serialize_timestamp<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Micros, true))
}
