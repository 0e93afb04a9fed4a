use std::path::PathBuf;
use std::time::Duration;

use reqwest::StatusCode;

use crate::integrity::IntegrityError;

/// Structural failures that abort a cache operation.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cannot prepare cache directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed catalog: {0}")]
    Catalog(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Failure of a single fetch attempt.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server returned status code {0}")]
    Status(StatusCode),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Integrity check failed: {0}")]
    Integrity(#[from] IntegrityError),

    #[error("Cannot create directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Write failed for {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Terminal failure of one asset after all retries were spent.
#[derive(Debug, thiserror::Error)]
#[error("Download of {key} from {url} failed after {attempts} attempt(s): {source}")]
pub struct DownloadError {
    pub key: String,
    pub url: String,
    pub attempts: u32,
    #[source]
    pub source: FetchError,
}
