//! Periodic integrity sweep with self-repair.

use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{AssetCache, DownloadStatus, ProgressSnapshot};
use crate::integrity;

/// Coarse health of a cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    /// Usable share fell below the configured threshold
    Degraded,
}

impl HealthStatus {
    fn classify(progress: &ProgressSnapshot, threshold_percent: u8) -> Self {
        if progress.percentage < threshold_percent {
            Self::Degraded
        } else {
            Self::Healthy
        }
    }
}

/// Result of [`AssetCache::perform_health_check`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    /// False when the check was skipped because the last one is too recent
    pub checked: bool,
    pub status: HealthStatus,
    pub progress: ProgressSnapshot,
    /// Assets marked failed because their file was missing or too small
    pub demoted: usize,
    /// Assets found valid on disk that were not marked usable
    pub restored: usize,
    /// Assets handed to a background repair
    pub repair_scheduled: usize,
}

impl AssetCache {
    /// Re-validate every asset against the disk.
    ///
    /// Rate limited to one sweep per `health_check_interval`; a call inside
    /// the window returns the current progress with `checked == false`. When
    /// the usable share drops below `health_threshold_percent`, up to
    /// `max_repair_batch` unusable assets are re-downloaded in the
    /// background, highest priority first. Never fails.
    pub async fn perform_health_check(&self) -> HealthReport {
        let config = &self.inner.config;

        let due = {
            let mut state = self.inner.state.lock();
            let now = Instant::now();
            match state.last_health_check {
                Some(last) if now.duration_since(last) < config.health_check_interval => false,
                _ => {
                    state.last_health_check = Some(now);
                    true
                }
            }
        };

        if !due {
            let progress = self.progress();
            debug!(cache = %self.inner.name, "Health check skipped, last one is recent");
            return HealthReport {
                checked: false,
                status: HealthStatus::classify(&progress, config.health_threshold_percent),
                progress,
                demoted: 0,
                restored: 0,
                repair_scheduled: 0,
            };
        }

        let min_size = config.fetch.min_valid_size;
        let mut demoted = 0;
        let mut restored = 0;

        for asset in self.inner.catalog.iter() {
            let on_disk = integrity::check_file(&asset.local_path, min_size).await;
            let mut state = self.inner.state.lock();
            if state.is_in_flight(&asset.key) {
                continue;
            }
            match (state.status(&asset.key), on_disk) {
                (Some(DownloadStatus::Success), Err(e)) => {
                    warn!(cache = %self.inner.name, key = %asset.key, error = %e, "Health check found a broken asset");
                    state.set_status(&asset.key, DownloadStatus::Failed);
                    demoted += 1;
                }
                (Some(DownloadStatus::Unset | DownloadStatus::Failed), Ok(_)) => {
                    state.set_status(&asset.key, DownloadStatus::Success);
                    restored += 1;
                }
                _ => {}
            }
        }

        let progress = self.progress();
        let status = HealthStatus::classify(&progress, config.health_threshold_percent);

        let mut repair_scheduled = 0;
        if status == HealthStatus::Degraded {
            let keys: Vec<String> = {
                let state = self.inner.state.lock();
                self.inner
                    .catalog
                    .iter()
                    .filter(|a| {
                        state.status(&a.key) != Some(DownloadStatus::Success)
                            && !state.is_in_flight(&a.key)
                    })
                    .take(config.max_repair_batch)
                    .map(|a| a.key.clone())
                    .collect()
            };
            repair_scheduled = self.schedule_repair(keys);
            warn!(
                cache = %self.inner.name,
                percentage = progress.percentage,
                threshold = config.health_threshold_percent,
                repair_scheduled,
                "Asset cache degraded"
            );
        }

        info!(
            cache = %self.inner.name,
            ?status,
            demoted,
            restored,
            percentage = progress.percentage,
            "Health check finished"
        );

        HealthReport {
            checked: true,
            status,
            progress,
            demoted,
            restored,
            repair_scheduled,
        }
    }
}
