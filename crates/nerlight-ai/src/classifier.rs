//! ONNX Runtime token classifier for BERT-style NER models.
//!
//! The model directory must contain `model.onnx` and `tokenizer.json`, and
//! may contain `config.json` with an `id2label` table.

use std::path::Path;

use anyhow::Context;
use nerlight_core::{Infer, RawPrediction};
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;
use tracing::{info, warn};

use crate::config::ModelConfig;
use crate::decode::{DEFAULT_IGNORE_LABELS, TokenInfo, decode_tokens};

/// BERT's maximum sequence length.
const MAX_LENGTH: usize = 512;

/// Per-token named-entity classifier using ONNX Runtime.
pub struct TokenClassifier {
    session: Session,
    tokenizer: Tokenizer,
    labels: Vec<String>,
    ignore_labels: Vec<String>,
    token_type_ids: bool,
}

impl TokenClassifier {
    /// Load a classifier from a directory containing `model.onnx` and `tokenizer.json`.
    pub fn load(model_dir: &Path) -> anyhow::Result<Self> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let config_path = model_dir.join("config.json");

        anyhow::ensure!(model_path.exists(), "model.onnx not found in {model_dir:?}");
        anyhow::ensure!(
            tokenizer_path.exists(),
            "tokenizer.json not found in {model_dir:?}"
        );

        let config = if config_path.exists() {
            ModelConfig::load(&config_path)?
        } else {
            ModelConfig::default()
        };

        let session = Session::builder()?.commit_from_file(&model_path)?;

        let logits = session.outputs().first().map(|output| output.dtype());
        let num_labels = resolve_num_labels(logits, &config)
            .with_context(|| format!("reading {}", model_path.display()))?;
        let labels = config.label_names(num_labels);

        // DistilBERT-style exports take no segment ids.
        let token_type_ids = session
            .inputs()
            .iter()
            .any(|input| input.name() == "token_type_ids");

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("load tokenizer: {e}"))?;
        tokenizer
            .with_truncation(Some(tokenizers::TruncationParams {
                max_length: MAX_LENGTH,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("set truncation: {e}"))?;
        tokenizer.with_padding(None);

        info!(
            num_labels,
            token_type_ids,
            model = %model_path.display(),
            "loaded token classification model"
        );
        Ok(Self {
            session,
            tokenizer,
            labels,
            ignore_labels: DEFAULT_IGNORE_LABELS.iter().map(|s| s.to_string()).collect(),
            token_type_ids,
        })
    }

    /// Replace the set of labels dropped from the output.
    pub fn with_ignore_labels(mut self, labels: Vec<String>) -> Self {
        self.ignore_labels = labels;
        self
    }

    /// Label name per class id.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Tag every token of `text`, in document order.
    pub fn classify(&mut self, text: &str) -> anyhow::Result<Vec<RawPrediction>> {
        let encoding = self
            .tokenizer
            .encode_char_offsets(text, true)
            .map_err(|e| anyhow::anyhow!("tokenize: {e}"))?;

        if !encoding.get_overflowing().is_empty() {
            warn!(max_length = MAX_LENGTH, "input truncated; trailing text is not tagged");
        }

        let seq_len = encoding.get_ids().len();
        if seq_len == 0 {
            return Ok(vec![]);
        }

        let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        let attention_mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|&m| m as i64)
            .collect();
        let type_ids: Vec<i64> = encoding.get_type_ids().iter().map(|&t| t as i64).collect();

        let shape = [1i64, seq_len as i64];
        let ids_tensor = Tensor::from_array((shape, input_ids.into_boxed_slice()))?;
        let mask_tensor = Tensor::from_array((shape, attention_mask.into_boxed_slice()))?;

        let outputs = if self.token_type_ids {
            let type_tensor = Tensor::from_array((shape, type_ids.into_boxed_slice()))?;
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

        // Logits: [1, seq_len, num_labels].
        let (output_shape, logits) = outputs[0].try_extract_tensor::<f32>()?;
        let dims: &[i64] = output_shape;
        let num_labels = self.labels.len();
        anyhow::ensure!(
            dims.len() == 3
                && dims[0] == 1
                && dims[1] as usize == seq_len
                && dims[2] as usize == num_labels,
            "unexpected output shape: {dims:?}, expected [1, {seq_len}, {num_labels}]"
        );

        let tokens: Vec<TokenInfo> = encoding
            .get_tokens()
            .iter()
            .zip(encoding.get_offsets())
            .zip(encoding.get_special_tokens_mask())
            .map(|((word, &(start, end)), &special)| TokenInfo {
                word: word.clone(),
                start,
                end,
                special: special == 1,
            })
            .collect();

        Ok(decode_tokens(
            logits,
            num_labels,
            &tokens,
            &self.labels,
            &self.ignore_labels,
        ))
    }
}

impl Infer for TokenClassifier {
    fn infer(&mut self, text: &str) -> anyhow::Result<Vec<RawPrediction>> {
        self.classify(text)
    }
}

/// Class count from the logits output, falling back to `id2label`.
fn resolve_num_labels(
    logits: Option<&ort::value::ValueType>,
    config: &ModelConfig,
) -> anyhow::Result<usize> {
    let logits = logits.ok_or_else(|| anyhow::anyhow!("model has no outputs"))?;
    infer_num_labels(logits)
        .or_else(|| (!config.id2label.is_empty()).then_some(config.id2label.len()))
        .ok_or_else(|| anyhow::anyhow!("cannot determine label count"))
}

/// Try to read the class count from the logits output type.
fn infer_num_labels(output_type: &ort::value::ValueType) -> Option<usize> {
    match output_type {
        ort::value::ValueType::Tensor { shape, .. } => shape
            .last()
            .and_then(|&d| if d > 0 { Some(d as usize) } else { None }),
        _ => None,
    }
}
