use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("unknown business category: {0}")]
    UnknownCategory(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EnrichmentError>;
