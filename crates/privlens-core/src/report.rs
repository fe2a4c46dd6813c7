//! Wire types for classifier output and the per-sentence annotation report.

use serde::{Deserialize, Serialize};

use crate::taxonomy::Rating;

/// Sentinel label for text the classifier cannot or should not label:
/// empty input and predictions suppressed by the confidence gate.
///
/// Deliberately absent from the taxonomy sources, so it resolves to the
/// unmapped entry.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// One ranked label with its probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelScore {
    pub label: String,
    pub prob: f32,
}

/// Classifier output for a single text unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Top-ranked label.
    pub label: String,
    /// Probability of the top label, in `[0, 1]`.
    pub confidence: f32,
    /// Ranked candidates, descending by probability, at most `top_k` long.
    pub top_k: Vec<LabelScore>,
}

impl Prediction {
    /// The prediction for text that carries no signal (empty input, or a
    /// prediction suppressed by the confidence gate).
    pub fn unknown() -> Prediction {
        Prediction {
            label: UNKNOWN_LABEL.to_string(),
            confidence: 0.0,
            top_k: Vec::new(),
        }
    }
}

/// One annotated sentence in the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedSentence {
    /// 1-based position of the sentence in the segmented text.
    pub id: u32,
    pub text: String,
    pub label: String,
    pub confidence: f32,
    pub category: String,
    pub sub_category: String,
    pub fine_grained: String,
    pub rating: Rating,
    pub action: Option<String>,
    pub top_k: Vec<LabelScore>,
}

/// Full annotation report for one input text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationReport {
    /// Reserved for a future document summary; currently always empty.
    pub summary: String,
    /// Placeholder verdict; a real grading pass has not been wired up yet.
    pub overall_grade: String,
    /// Number of segmented sentences; equals `rows.len()` since gated
    /// sentences still produce a row.
    pub num_sentences: usize,
    pub rows: Vec<AnnotatedSentence>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_prediction_shape() {
        let p = Prediction::unknown();
        assert_eq!(p.label, "Unknown");
        assert_eq!(p.confidence, 0.0);
        assert!(p.top_k.is_empty());
    }

    #[test]
    fn report_serde_round_trip() {
        let report = AnnotationReport {
            summary: String::new(),
            overall_grade: "A".to_string(),
            num_sentences: 1,
            rows: vec![AnnotatedSentence {
                id: 1,
                text: "We sell your data.".to_string(),
                label: "Third Party Sharing".to_string(),
                confidence: 0.93,
                category: "Data Sharing".to_string(),
                sub_category: "Third Parties".to_string(),
                fine_grained: "Sale".to_string(),
                rating: Rating::Blocker,
                action: Some("Opt out if possible.".to_string()),
                top_k: vec![LabelScore {
                    label: "Third Party Sharing".to_string(),
                    prob: 0.93,
                }],
            }],
        };

        let json = serde_json::to_string(&report).unwrap();
        let back: AnnotationReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn rating_field_serializes_lowercase_in_rows() {
        let row = AnnotatedSentence {
            id: 1,
            text: "x".to_string(),
            label: "Unknown".to_string(),
            confidence: 0.0,
            category: "Other".to_string(),
            sub_category: "Unmapped".to_string(),
            fine_grained: "Unmapped".to_string(),
            rating: Rating::Neutral,
            action: None,
            top_k: vec![],
        };
        let json = serde_json::to_string(&row).unwrap();
        assert!(json.contains("\"rating\":\"neutral\""));
        assert!(json.contains("\"action\":null"));
    }
}
