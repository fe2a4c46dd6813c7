//! Classifier seam and logit post-processing.
//!
//! The orchestrator talks to any sentence classifier through
//! [`TextClassifier`]; the ONNX-backed implementation lives behind the
//! `onnx` feature. Softmax and top-k ranking live here so scripted test
//! classifiers share the exact arithmetic of the real one.

use privlens_core::report::{LabelScore, Prediction};

/// A sentence-level text classifier.
///
/// Input: one sentence and the number of ranked candidates wanted.
/// Output: the winning label with its probability and the ranked top-k
/// list. Implementations return [`Prediction::unknown`] for text that is
/// empty after trimming. Takes `&mut self` because inference sessions
/// mutate internal state on each run.
pub trait TextClassifier {
    fn predict(&mut self, text: &str, top_k: usize) -> anyhow::Result<Prediction>;
}

/// Numerically stable softmax over raw logits.
///
/// The running maximum is subtracted before exponentiation so large
/// logits cannot overflow to infinity. An empty slice yields an empty
/// vector.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if !max.is_finite() {
        return vec![0.0; logits.len()];
    }
    let exps: Vec<f32> = logits.iter().map(|&l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Build a prediction from per-label probabilities.
///
/// Labels are ranked by descending probability; `top_k` is clamped to at
/// least one and at most the label count, so any requested depth is
/// honored as far as the label set allows. No labels yields the unknown
/// prediction.
pub fn rank(labels: &[String], probs: &[f32], top_k: usize) -> Prediction {
    let mut ranked: Vec<LabelScore> = labels
        .iter()
        .zip(probs.iter())
        .map(|(label, &prob)| LabelScore {
            label: label.clone(),
            prob,
        })
        .collect();
    if ranked.is_empty() {
        return Prediction::unknown();
    }
    ranked.sort_by(|a, b| b.prob.total_cmp(&a.prob));

    let k = top_k.max(1).min(ranked.len());
    ranked.truncate(k);
    Prediction {
        label: ranked[0].label.clone(),
        confidence: ranked[0].prob,
        top_k: ranked,
    }
}
