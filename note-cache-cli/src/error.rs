use note_cache::CacheError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Initialization failed: {0}")]
    Initialization(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{failed} asset(s) could not be downloaded")]
    Incomplete { failed: usize },
}
