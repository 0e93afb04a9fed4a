use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use tokio::fs;
use tracing::{debug, warn};

use super::source::AssetSource;
use super::writer::{AtomicRename, StagedCopy, WriteStrategy};
use crate::catalog::AssetConfig;
use crate::config::FetchConfig;
use crate::error::{DownloadError, FetchError};
use crate::integrity;

/// Result of a successful fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedAsset {
    pub path: PathBuf,
    pub bytes: u64,
    /// The file was already valid on disk; nothing was downloaded
    pub reused: bool,
}

#[derive(Clone)]
pub struct DownloadWorker {
    source: Arc<dyn AssetSource>,
    primary: Arc<dyn WriteStrategy>,
    fallback: Arc<dyn WriteStrategy>,
    config: Arc<FetchConfig>,
}

impl DownloadWorker {
    /// Create a worker writing through [`AtomicRename`] with a
    /// [`StagedCopy`] fallback.
    pub fn new(source: Arc<dyn AssetSource>, config: FetchConfig) -> Self {
        Self {
            source,
            primary: Arc::new(AtomicRename),
            fallback: Arc::new(StagedCopy::default()),
            config: Arc::new(config),
        }
    }

    pub fn with_write_strategies(
        mut self,
        primary: Arc<dyn WriteStrategy>,
        fallback: Arc<dyn WriteStrategy>,
    ) -> Self {
        self.primary = primary;
        self.fallback = fallback;
        self
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Fetch one asset and persist it at its local path.
    ///
    /// A file already on disk with at least `min_valid_size` bytes is
    /// accepted without touching the network. Otherwise every failed
    /// attempt is retried after `retry_delay_base * 2^attempt`, up to
    /// `max_retries` times.
    pub async fn fetch_asset(&self, asset: &AssetConfig) -> Result<FetchedAsset, DownloadError> {
        if let Ok(bytes) = integrity::check_file(&asset.local_path, self.config.min_valid_size).await
        {
            debug!(key = %asset.key, bytes, "Asset already cached");
            return Ok(FetchedAsset {
                path: asset.local_path.clone(),
                bytes,
                reused: true,
            });
        }

        let mut attempt: u32 = 0;
        loop {
            match self.attempt(asset).await {
                Ok(bytes) => {
                    debug!(key = %asset.key, bytes, attempt, "Asset downloaded");
                    return Ok(FetchedAsset {
                        path: asset.local_path.clone(),
                        bytes,
                        reused: false,
                    });
                }
                Err(e) if attempt >= self.config.max_retries => {
                    warn!(
                        key = %asset.key,
                        url = %asset.remote_url,
                        attempts = attempt + 1,
                        error = %e,
                        "Giving up on asset"
                    );
                    return Err(DownloadError {
                        key: asset.key.clone(),
                        url: asset.remote_url.to_string(),
                        attempts: attempt + 1,
                        source: e,
                    });
                }
                Err(e) => {
                    let delay = self.config.backoff_delay(attempt);
                    warn!(
                        key = %asset.key,
                        attempt = attempt + 1,
                        max_retries = self.config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Asset fetch failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn attempt(&self, asset: &AssetConfig) -> Result<u64, FetchError> {
        let payload = if self.config.timeout.is_zero() {
            self.source.fetch(&asset.remote_url).await?
        } else {
            match tokio::time::timeout(self.config.timeout, self.source.fetch(&asset.remote_url))
                .await
            {
                Ok(result) => result?,
                Err(_) => return Err(FetchError::Timeout(self.config.timeout)),
            }
        };

        let size = integrity::check_payload(payload.len(), self.config.min_valid_size)?;

        if let Some(parent) = asset.local_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| FetchError::Directory {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        self.persist(&asset.local_path, &payload).await?;
        integrity::check_file(&asset.local_path, self.config.min_valid_size).await?;
        Ok(size)
    }

    async fn persist(&self, path: &Path, data: &Bytes) -> Result<(), FetchError> {
        let primary_error = match self.primary.write(path, data).await {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };

        warn!(
            path = %path.display(),
            strategy = self.primary.name(),
            fallback = self.fallback.name(),
            error = %primary_error,
            "Primary write failed, trying fallback"
        );

        self.fallback
            .write(path, data)
            .await
            .map_err(|source| FetchError::Write {
                path: path.to_path_buf(),
                source,
            })
    }
}
