use thiserror::Error;

#[derive(Debug, Error)]
pub enum NerError {
    #[error("input text is empty")]
    EmptyInput,

    /// The inference engine failed; fatal for this request, not retried.
    #[error("inference failed: {0:#}")]
    Inference(anyhow::Error),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}
