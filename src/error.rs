use thiserror::Error;

use crate::validate::ValidationError;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("invalid request body: {0}")]
    InvalidBody(String),

    #[error("queue item {0} not found")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] surrealdb::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
