//! ONNX Runtime classification pipeline for fine-tuned BERT-family models.
//!
//! Runs single-label sequence classification over privacy-policy sentences.
//! The model directory must contain `model.onnx` and `tokenizer.json`;
//! an optional `config.json` supplies human-readable label names via its
//! `id2label` table.

use std::collections::BTreeMap;
use std::path::Path;

use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;
use tracing::info;

use privlens_core::defaults::MAX_SEQ_LEN;
use privlens_core::report::Prediction;

use crate::classify::{TextClassifier, rank, softmax};

/// Sentence classifier backed by ONNX Runtime.
///
/// Loads a fine-tuned sequence-classification checkpoint and scores each
/// sentence against the model's label set.
pub struct OnnxClassifier {
    session: Session,
    tokenizer: Tokenizer,
    labels: Vec<String>,
    needs_token_types: bool,
}

impl OnnxClassifier {
    /// Load a classifier from a directory containing `model.onnx`,
    /// `tokenizer.json` and optionally `config.json`.
    ///
    /// Without a usable `id2label` table the labels fall back to the
    /// indices `"0"`, `"1"`, ... inferred from the model's output shape.
    pub fn load(model_dir: &Path) -> anyhow::Result<Self> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let config_path = model_dir.join("config.json");

        anyhow::ensure!(model_path.exists(), "model.onnx not found in {model_dir:?}");
        anyhow::ensure!(
            tokenizer_path.exists(),
            "tokenizer.json not found in {model_dir:?}"
        );

        let session = Session::builder()?.commit_from_file(&model_path)?;

        let labels = match read_labels(&config_path)? {
            Some(labels) => labels,
            None => {
                let count = infer_label_count(session.outputs()[0].dtype());
                let Some(count) = count else {
                    anyhow::bail!(
                        "cannot determine label set: no id2label in {config_path:?} \
                         and the model output shape is dynamic"
                    );
                };
                (0..count).map(|i| i.to_string()).collect()
            }
        };

        // BERT graphs declare token_type_ids; RoBERTa-family exports do not.
        let needs_token_types = session
            .inputs()
            .iter()
            .any(|input| input.name() == "token_type_ids");

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("load tokenizer: {e}"))?;

        // Truncate to the encoder's positional limit.
        tokenizer
            .with_truncation(Some(tokenizers::TruncationParams {
                max_length: MAX_SEQ_LEN,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("set truncation: {e}"))?;

        info!(
            labels = labels.len(),
            model = %model_path.display(),
            "loaded classifier model"
        );
        Ok(Self {
            session,
            tokenizer,
            labels,
            needs_token_types,
        })
    }

    /// The label set, in model output order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    fn run_logits(&mut self, text: &str) -> anyhow::Result<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow::anyhow!("tokenize: {e}"))?;

        let seq_len = encoding.get_ids().len();
        let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        let attention_mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|&m| m as i64)
            .collect();

        let shape = [1i64, seq_len as i64];
        let ids_tensor = Tensor::from_array((shape, input_ids.into_boxed_slice()))?;
        let mask_tensor = Tensor::from_array((shape, attention_mask.into_boxed_slice()))?;

        let outputs = if self.needs_token_types {
            let token_type_ids: Vec<i64> = encoding
                .get_type_ids()
                .iter()
                .map(|&tid| tid as i64)
                .collect();
            let type_tensor = Tensor::from_array((shape, token_type_ids.into_boxed_slice()))?;
            self.session.run(ort::inputs![
                "input_ids" => ids_tensor,
                "attention_mask" => mask_tensor,
                "token_type_ids" => type_tensor,
            ])?
        } else {
            self.session.run(ort::inputs![
                "input_ids" => ids_tensor,
                "attention_mask" => mask_tensor,
            ])?
        };

        // Logits: [1, num_labels].
        let (output_shape, output_data) = outputs[0].try_extract_tensor::<f32>()?;
        let dims: &[i64] = output_shape;
        anyhow::ensure!(
            dims.len() == 2 && dims[0] == 1 && dims[1] as usize == self.labels.len(),
            "unexpected output shape: {dims:?}, expected [1, {}]",
            self.labels.len()
        );

        Ok(output_data.to_vec())
    }
}

impl TextClassifier for OnnxClassifier {
    fn predict(&mut self, text: &str, top_k: usize) -> anyhow::Result<Prediction> {
        if text.trim().is_empty() {
            return Ok(Prediction::unknown());
        }
        let logits = self.run_logits(text)?;
        let probs = softmax(&logits);
        Ok(rank(&self.labels, &probs, top_k))
    }
}

/// Read the `id2label` table from a transformers-style `config.json`.
///
/// Returns `Ok(None)` when the file or the table is absent; a present but
/// malformed table is an error.
fn read_labels(config_path: &Path) -> anyhow::Result<Option<Vec<String>>> {
    if !config_path.exists() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(config_path)?;
    let config: serde_json::Value = serde_json::from_str(&raw)?;
    let Some(table) = config.get("id2label").and_then(|v| v.as_object()) else {
        return Ok(None);
    };

    let mut by_id = BTreeMap::new();
    for (key, value) in table {
        let id: usize = key
            .parse()
            .map_err(|_| anyhow::anyhow!("non-numeric label id {key:?} in {config_path:?}"))?;
        let Some(name) = value.as_str() else {
            anyhow::bail!("non-string label for id {key} in {config_path:?}");
        };
        by_id.insert(id, name.to_string());
    }
    Ok(Some(by_id.into_values().collect()))
}

/// Try to infer the label count from the ONNX model output type.
fn infer_label_count(output_type: &ort::value::ValueType) -> Option<usize> {
    match output_type {
        ort::value::ValueType::Tensor { shape, .. } => {
            // Last dimension is the class count.
            shape
                .last()
                .and_then(|&d| if d > 0 { Some(d as usize) } else { None })
        }
        _ => None,
    }
}
