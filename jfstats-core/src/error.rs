use thiserror::Error;

use crate::mapping::MappingError;
use crate::providers::ProviderError;

#[derive(Error, Debug)]
pub enum StatsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Jellyfin API error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Mapping error: {0}")]
    Mapping(#[from] MappingError),

    #[error("Import failed: {0}")]
    Import(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid sync transition: {0}")]
    InvalidTransition(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<jfstats_model::ModelError> for StatsError {
    fn from(err: jfstats_model::ModelError) -> Self {
        StatsError::Internal(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StatsError>;
