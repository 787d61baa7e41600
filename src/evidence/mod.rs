//! Evidence records for AI runtime decisions.
//!
//! Each call to the capture API produces one [`EvidenceRecord`]:
//!
//! - **Identified**: a fresh UUID v4 `event_id` per record, never reused.
//! - **Timestamped at capture**: the UTC instant of the call, not of delivery.
//! - **Normalized**: labels are trimmed and lowercased unless disabled.
//! - **Tolerant**: confidence scores are forwarded without range checks.

pub mod normalize;
pub mod record;

pub use normalize::{normalize_label, prepare_label};
pub use record::{
    CaptureFields, ConstructionError, EvidencePayload, EvidenceRecord, ModelRef, Recommendation,
    SdkMetadata, EVENT_TYPE_AI_RUNTIME,
};
