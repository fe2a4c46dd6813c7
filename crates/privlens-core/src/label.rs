//! Label normalisation for taxonomy lookups.
//!
//! Classifier output and the two taxonomy source files disagree on casing
//! and spacing for the same label ("Data Retention", "data  retention").
//! Every lookup key on every side goes through [`normalize_label`] first,
//! so the join key is canonical by construction.

/// Normalise a raw label into its canonical lookup key.
///
/// Input: raw label like "  Data   Retention " or "THIRD PARTY SHARING"
/// Output: "data retention", "third party sharing"
///
/// Trims the ends, collapses internal whitespace runs to single spaces,
/// and lowercases. Total and idempotent; `normalize_label("")` yields `""`.
pub fn normalize_label(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
