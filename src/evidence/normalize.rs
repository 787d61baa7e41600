//! Label normalization.
//!
//! Models emit labels with inconsistent casing and stray whitespace
//! ("Approve", " approve ", "APPROVE\n"). Normalizing before transmission
//! lets the ingestion side group decisions by label without guessing.

/// Trim surrounding whitespace and lowercase.
///
/// Pure and idempotent: `normalize_label(&normalize_label(s)) == normalize_label(s)`.
pub fn normalize_label(label: &str) -> String {
    label.trim().to_lowercase()
}

/// Apply normalization only when enabled, otherwise pass the label verbatim.
pub fn prepare_label(label: &str, normalize: bool) -> String {
    if normalize {
        normalize_label(label)
    } else {
        label.to_string()
    }
}
