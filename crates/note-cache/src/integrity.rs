//! # Integrity checks
//!
//! Size-based validation of payloads and files on disk. An asset is usable
//! only if it exists and holds at least the configured minimum of bytes.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;

#[derive(Debug, thiserror::Error)]
pub enum IntegrityError {
    #[error("{path} does not exist")]
    Missing { path: PathBuf },

    #[error("{path} holds {size} bytes, expected at least {min}")]
    Undersized { path: PathBuf, size: u64, min: u64 },

    #[error("Payload holds {size} bytes, expected at least {min}")]
    UndersizedPayload { size: u64, min: u64 },

    #[error("Cannot inspect {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Validate a downloaded payload before it is written.
pub fn check_payload(len: usize, min_size: u64) -> Result<u64, IntegrityError> {
    let size = len as u64;
    if size < min_size {
        return Err(IntegrityError::UndersizedPayload {
            size,
            min: min_size,
        });
    }
    Ok(size)
}

/// Validate a file on disk, returning its size.
pub async fn check_file(path: &Path, min_size: u64) -> Result<u64, IntegrityError> {
    let result = fs::metadata(path).await;
    evaluate(path, result, min_size)
}

/// Blocking variant for synchronous lookups.
pub fn check_file_blocking(path: &Path, min_size: u64) -> Result<u64, IntegrityError> {
    let result = std::fs::metadata(path);
    evaluate(path, result, min_size)
}

fn evaluate(
    path: &Path,
    metadata: io::Result<std::fs::Metadata>,
    min_size: u64,
) -> Result<u64, IntegrityError> {
    let metadata = match metadata {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(IntegrityError::Missing {
                path: path.to_path_buf(),
            });
        }
        Err(e) => {
            return Err(IntegrityError::Unreadable {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };

    if !metadata.is_file() {
        return Err(IntegrityError::Unreadable {
            path: path.to_path_buf(),
            source: io::Error::other("not a regular file"),
        });
    }

    let size = metadata.len();
    if size < min_size {
        return Err(IntegrityError::Undersized {
            path: path.to_path_buf(),
            size,
            min: min_size,
        });
    }
    Ok(size)
}
