use thiserror::Error;

use crate::models::ActId;

#[derive(Error, Debug)]
pub enum ActHistoryError {
    #[error("Invalid depth {0}: expected -1 (unbounded) or a depth of at least 1")]
    InvalidDepth(i64),

    #[error("Root act not found: {0}")]
    RootNotFound(ActId),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

pub type Result<T> = std::result::Result<T, ActHistoryError>;
