use thiserror::Error;

use crate::person::PersonId;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invalid person id `{0}`")]
    InvalidId(String),

    #[error("person `{0}` not found")]
    NotFound(PersonId),

    #[error("person `{0}` was modified concurrently")]
    Conflict(PersonId),

    #[error(transparent)]
    Store(#[from] anyhow::Error),

    #[error("failed to serialize person: {0}")]
    Serialization(#[from] serde_json::Error),
}
