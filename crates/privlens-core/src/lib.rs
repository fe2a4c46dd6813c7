pub mod defaults;
pub mod label;
pub mod report;
pub mod segment;
pub mod taxonomy;
pub mod usage;

pub use label::normalize_label;
pub use report::{AnnotatedSentence, AnnotationReport, LabelScore, Prediction, UNKNOWN_LABEL};
pub use segment::segment;
pub use taxonomy::{Rating, TaxonomyEntry};
pub use usage::{QuotaDecision, UsageRecord};
