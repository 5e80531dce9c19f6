//! Request pipeline: validate text, run the injected engine, resolve spans.

use serde::Serialize;
use tracing::info;

use crate::error::NerError;
use crate::prediction::RawPrediction;
use crate::resolver::{Resolution, SpanResolver};

/// Text used when the caller supplies none.
pub const DEFAULT_TEXT: &str = "Bill Gates is the founder of Microsoft.";

/// Token-classification capability.
///
/// Implementations are synchronous and may take seconds per call. They must
/// return predictions in ascending `start` order with character offsets.
pub trait Infer {
    fn infer(&mut self, text: &str) -> anyhow::Result<Vec<RawPrediction>>;
}

impl<F> Infer for F
where
    F: FnMut(&str) -> anyhow::Result<Vec<RawPrediction>>,
{
    fn infer(&mut self, text: &str) -> anyhow::Result<Vec<RawPrediction>> {
        self(text)
    }
}

/// Result of analysing one submitted text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub text: String,
    #[serde(flatten)]
    pub resolution: Resolution,
}

/// Runs an [`Infer`] engine and resolves its output.
///
/// The engine is owned by the caller's composition root and handed in here;
/// the analyzer never loads models itself.
pub struct Analyzer<I> {
    engine: I,
    resolver: SpanResolver,
}

impl<I: Infer> Analyzer<I> {
    pub fn new(engine: I) -> Self {
        Self {
            engine,
            resolver: SpanResolver::default(),
        }
    }

    /// Analyse `text`.
    ///
    /// Blank or whitespace-only text is rejected with
    /// [`NerError::EmptyInput`] before the engine is called.
    pub fn analyze(&mut self, text: &str) -> Result<Analysis, NerError> {
        if text.trim().is_empty() {
            return Err(NerError::EmptyInput);
        }

        let predictions = self.engine.infer(text).map_err(NerError::Inference)?;
        let resolution = self.resolver.resolve(text, &predictions);

        info!(
            chars = text.chars().count(),
            predictions = predictions.len(),
            rendered = resolution.rows.len(),
            skipped = resolution.skipped(),
            "analysed text"
        );

        Ok(Analysis {
            text: text.to_string(),
            resolution,
        })
    }
}
