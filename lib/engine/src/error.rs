use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Embedder output does not match the configured index dimension. This is
    /// a wiring mistake, not a per-request condition.
    #[error("Invalid vector dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Retrieval error: {0}")]
    Retrieval(#[from] identx_index::Error),

    #[error("Classifier error: {0}")]
    Classifier(#[from] identx_core::Error),

    #[error("Check cancelled")]
    Cancelled,
}
