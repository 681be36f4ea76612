use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Device already exists: {0}")]
    DeviceExists(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Device store {path} is not valid JSON: {source}")]
    CorruptStore {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, RelayError>;
