//! Hugging Face `config.json` subset: class id to label name.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

/// The parts of a model's `config.json` the classifier needs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelConfig {
    /// Keys are class ids as strings (`"0"`, `"1"`, ...).
    #[serde(default)]
    pub id2label: HashMap<String, String>,
}

impl ModelConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Label name for every class `0..num_labels`, falling back to `LABEL_{id}`.
    pub fn label_names(&self, num_labels: usize) -> Vec<String> {
        (0..num_labels)
            .map(|id| {
                self.id2label
                    .get(&id.to_string())
                    .cloned()
                    .unwrap_or_else(|| format!("LABEL_{id}"))
            })
            .collect()
    }
}
