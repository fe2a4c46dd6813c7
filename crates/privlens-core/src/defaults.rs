//! Pipeline defaults shared by the service layer and the CLI.

/// Predictions below this confidence are gated to `Unknown`.
pub const CONFIDENCE_THRESHOLD: f32 = 0.75;

/// Ranked candidates returned per sentence.
pub const TOP_K: usize = 5;

/// Token truncation length for the classifier (BERT position limit).
pub const MAX_SEQ_LEN: usize = 512;

/// Free annotation runs per `(user_id, feature)` pair.
pub const FREE_RUN_LIMIT: u32 = 2;

/// Feature name the annotation pipeline meters under.
pub const ANNOTATE_FEATURE: &str = "annotate";
