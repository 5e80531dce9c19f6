//! Logits to per-token predictions, without aggregation.
//!
//! Mirrors the token-classification pipeline with no aggregation strategy:
//! every non-special token gets a softmax over its logits, the argmax class
//! becomes the label, and tokens whose label is ignored (by default `O`) are
//! dropped.

use nerlight_core::RawPrediction;

/// Labels dropped from the output unless overridden.
pub const DEFAULT_IGNORE_LABELS: &[&str] = &["O"];

/// Tokenizer view of one token. Offsets are in characters.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenInfo {
    pub word: String,
    pub start: usize,
    pub end: usize,
    pub special: bool,
}

/// Decode a `[tokens.len(), num_labels]` row-major logits buffer.
pub fn decode_tokens(
    logits: &[f32],
    num_labels: usize,
    tokens: &[TokenInfo],
    labels: &[String],
    ignore_labels: &[String],
) -> Vec<RawPrediction> {
    if num_labels == 0 {
        return vec![];
    }

    tokens
        .iter()
        .zip(logits.chunks_exact(num_labels))
        .filter(|(tok, _)| !tok.special && tok.start < tok.end)
        .filter_map(|(tok, row)| {
            let probs = softmax(row);
            let (class, score) = argmax(&probs)?;
            let label = labels
                .get(class)
                .cloned()
                .unwrap_or_else(|| format!("LABEL_{class}"));
            if ignore_labels.contains(&label) {
                return None;
            }
            Some(
                RawPrediction::new(tok.start, tok.end, label, f64::from(score))
                    .with_word(tok.word.clone()),
            )
        })
        .collect()
}

/// Numerically stable softmax.
fn softmax(row: &[f32]) -> Vec<f32> {
    let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = row.iter().map(|x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum > 0.0 {
        exps.into_iter().map(|e| e / sum).collect()
    } else {
        exps
    }
}

/// Index and value of the largest element; first wins on ties.
fn argmax(v: &[f32]) -> Option<(usize, f32)> {
    v.iter()
        .copied()
        .enumerate()
        .fold(None, |best, (i, x)| match best {
            Some((_, b)) if b >= x => best,
            _ => Some((i, x)),
        })
}
