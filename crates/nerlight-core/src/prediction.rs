//! Per-token predictions as produced by the inference engine.

use serde::{Deserialize, Serialize};

/// One token-level prediction from the token-classification model.
///
/// Offsets are half-open and counted in characters (Unicode scalar values),
/// not bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPrediction {
    pub start: usize,
    pub end: usize,
    /// Opaque class identifier, e.g. `"LABEL_3"`.
    pub raw_label: String,
    pub score: f64,
    /// Token text as the tokenizer saw it (`"##soft"`). Never used for slicing.
    #[serde(default)]
    pub word: String,
}

impl RawPrediction {
    pub fn new(start: usize, end: usize, raw_label: impl Into<String>, score: f64) -> Self {
        Self {
            start,
            end,
            raw_label: raw_label.into(),
            score,
            word: String::new(),
        }
    }

    pub fn with_word(mut self, word: impl Into<String>) -> Self {
        self.word = word.into();
        self
    }
}

/// Loosely-typed prediction as it appears in pipeline JSON output.
///
/// Every field is optional so that one incomplete item can be rejected
/// without failing the whole array. Extra keys (`index`, ...) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub entity: Option<String>,
    pub score: Option<f64>,
    pub start: Option<usize>,
    pub end: Option<usize>,
    pub word: Option<String>,
}

/// Name of the first required field missing from a [`PredictionRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingField(pub &'static str);

impl TryFrom<PredictionRecord> for RawPrediction {
    type Error = MissingField;

    fn try_from(record: PredictionRecord) -> Result<Self, Self::Error> {
        let start = record.start.ok_or(MissingField("start"))?;
        let end = record.end.ok_or(MissingField("end"))?;
        let raw_label = record.entity.ok_or(MissingField("entity"))?;
        let score = record.score.ok_or(MissingField("score"))?;
        Ok(Self {
            start,
            end,
            raw_label,
            score,
            word: record.word.unwrap_or_default(),
        })
    }
}
