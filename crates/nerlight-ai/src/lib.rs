//! AI inference layer: ONNX Runtime token classification for named entities.

pub mod config;
pub mod decode;

#[cfg(feature = "onnx")]
mod classifier;
#[cfg(feature = "onnx")]
pub use classifier::TokenClassifier;

pub use config::ModelConfig;
pub use decode::{DEFAULT_IGNORE_LABELS, TokenInfo, decode_tokens};
