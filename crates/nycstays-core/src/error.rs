// crates/nycstays-core/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML configuration error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("required column '{0}' is missing from the input table")]
    MissingColumn(String),

    #[error("artifact '{0}' not found in the registry")]
    ArtifactNotFound(String),

    #[error("invalid artifact reference '{reference}': {reason}")]
    InvalidReference { reference: String, reason: String },

    #[error("artifact registry error: {0}")]
    Registry(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
