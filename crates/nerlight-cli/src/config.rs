//! Model directory discovery.
//!
//! Search order:
//! 1. `--model-dir` / `$NERLIGHT_MODEL_DIR` (must contain the model)
//! 2. Workspace `models/ner-bert/` (development)
//! 3. `models/ner-bert/` next to the executable (distribution)

use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};

pub const MODEL_DIR_ENV: &str = "NERLIGHT_MODEL_DIR";

const MODEL_FILENAME: &str = "model.onnx";
const MODEL_SUBDIR: &str = "models/ner-bert";

fn has_model(dir: &Path) -> bool {
    dir.join(MODEL_FILENAME).exists()
}

/// Resolve the model directory, preferring an explicit one.
pub fn find_model_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        if has_model(dir) {
            return Ok(dir.to_path_buf());
        }
        return Err(anyhow!(
            "{MODEL_FILENAME} not found in {} (from --model-dir or ${MODEL_DIR_ENV})",
            dir.display()
        ));
    }

    let candidates = default_candidates();
    if let Some(dir) = candidates.iter().find(|d| has_model(d)) {
        return Ok(dir.clone());
    }

    let searched: Vec<String> = candidates
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect();
    Err(anyhow!(
        "Model files not found. Export a token-classification model to {MODEL_SUBDIR}/ \
         or set ${MODEL_DIR_ENV}.\nSearched locations:\n{}",
        searched.join("\n")
    ))
}

fn default_candidates() -> Vec<PathBuf> {
    let mut out = Vec::new();

    // CARGO_MANIFEST_DIR points to crates/nerlight-cli.
    if let Some(root) = Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .and_then(Path::parent)
    {
        out.push(root.join(MODEL_SUBDIR));
    }

    if let Ok(exe) = std::env::current_exe()
        && let Some(exe_dir) = exe.parent()
    {
        out.push(exe_dir.join(MODEL_SUBDIR));
    }

    out
}
