//! Annotation pipeline: segment, classify, gate, enrich, assemble.

use anyhow::Result;
use tracing::{debug, info};

use privlens_ai::TaxonomyMap;
use privlens_ai::classify::TextClassifier;
use privlens_core::report::{AnnotatedSentence, AnnotationReport, Prediction};
use privlens_core::{normalize_label, segment};

/// Fixed grade carried by every report. Per-report grading is a stub.
pub const OVERALL_GRADE: &str = "A";

/// Annotation service state: the merged taxonomy plus a classifier.
///
/// Built once at startup and reused across requests. `annotate` takes
/// `&mut self` only because the classifier session is stateful; the
/// taxonomy is read-only after construction.
pub struct ServiceContext<C: TextClassifier> {
    taxonomy: TaxonomyMap,
    classifier: C,
}

impl<C: TextClassifier> ServiceContext<C> {
    pub fn new(taxonomy: TaxonomyMap, classifier: C) -> Self {
        Self {
            taxonomy,
            classifier,
        }
    }

    pub fn taxonomy(&self) -> &TaxonomyMap {
        &self.taxonomy
    }

    /// Annotate a policy text sentence by sentence.
    ///
    /// Input: raw policy text, the confidence gate and the ranked-candidate
    /// depth. Output: one row per segmented sentence, in text order,
    /// 1-indexed. Predictions strictly under the threshold are demoted to
    /// the unknown label (confidence zeroed, candidates dropped) before
    /// taxonomy lookup, so reports never assert a category the model was
    /// not confident about. Classifier failures propagate unmodified.
    pub fn annotate(
        &mut self,
        text: &str,
        threshold: f32,
        top_k: usize,
    ) -> Result<AnnotationReport> {
        let sentences = segment(text);
        let mut rows = Vec::with_capacity(sentences.len());

        for (idx, sentence) in sentences.into_iter().enumerate() {
            let mut prediction = self.classifier.predict(&sentence, top_k)?;
            if prediction.confidence < threshold {
                debug!(
                    id = idx + 1,
                    confidence = prediction.confidence,
                    "prediction under threshold; demoted to unknown"
                );
                prediction = Prediction::unknown();
            }

            let entry = self.taxonomy.resolve(&normalize_label(&prediction.label));
            rows.push(AnnotatedSentence {
                id: (idx + 1) as u32,
                text: sentence,
                label: prediction.label,
                confidence: prediction.confidence,
                category: entry.category.clone(),
                sub_category: entry.sub_category.clone(),
                fine_grained: entry.fine_grained.clone(),
                rating: entry.rating,
                action: entry.action.clone(),
                top_k: prediction.top_k,
            });
        }

        info!(sentences = rows.len(), "annotated policy text");
        Ok(AnnotationReport {
            summary: String::new(),
            overall_grade: OVERALL_GRADE.to_string(),
            num_sentences: rows.len(),
            rows,
        })
    }
}
