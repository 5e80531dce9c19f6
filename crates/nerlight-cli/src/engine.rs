//! Lazily-loaded classifier owned by the CLI.

use std::path::PathBuf;

use anyhow::Context;
use nerlight_ai::TokenClassifier;
use nerlight_core::{Infer, RawPrediction};
use tracing::info;

/// Loads the ONNX model on the first inference call and keeps it for the
/// rest of the process. A failed load is retried on the next call.
pub struct LazyClassifier {
    model_dir: PathBuf,
    /// Labels dropped from the output; the classifier's default when empty.
    ignore_labels: Vec<String>,
    classifier: Option<TokenClassifier>,
}

impl LazyClassifier {
    pub fn new(model_dir: PathBuf) -> Self {
        Self {
            model_dir,
            ignore_labels: Vec::new(),
            classifier: None,
        }
    }

    pub fn with_ignore_labels(mut self, labels: Vec<String>) -> Self {
        self.ignore_labels = labels;
        self
    }

    fn classifier(&mut self) -> anyhow::Result<&mut TokenClassifier> {
        let classifier = match self.classifier.take() {
            Some(c) => c,
            None => {
                eprintln!("  Loading model from {}...", self.model_dir.display());
                let mut classifier = TokenClassifier::load(&self.model_dir).with_context(|| {
                    format!("loading model from {}", self.model_dir.display())
                })?;
                if !self.ignore_labels.is_empty() {
                    classifier = classifier.with_ignore_labels(self.ignore_labels.clone());
                }
                classifier
            }
        };
        Ok(self.classifier.insert(classifier))
    }
}

impl Infer for LazyClassifier {
    fn infer(&mut self, text: &str) -> anyhow::Result<Vec<RawPrediction>> {
        let classifier = self.classifier()?;
        eprintln!("  Analyzing...");
        let predictions = classifier.classify(text)?;
        info!(tokens = predictions.len(), "inference complete");
        Ok(predictions)
    }
}
