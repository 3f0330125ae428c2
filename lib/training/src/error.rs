use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unsupported data format for '{}': expected a .csv file", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("Dataset error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Index error: {0}")]
    Index(#[from] identx_index::Error),

    #[error("Model error: {0}")]
    Model(#[from] identx_core::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}
