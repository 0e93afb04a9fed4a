//! # Cache Manager
//!
//! [`AssetCache`] owns one domain's catalog and status map. It drives the
//! download worker band by band, answers path lookups and keeps the on-disk
//! copy healthy over the lifetime of the app.

mod builder;
mod health;
mod state;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::fs;
use tokio::runtime::Handle;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::catalog::{AssetConfig, Catalog, priority_bands};
use crate::config::CacheConfig;
use crate::error::CacheError;
use crate::events::{AssetOutcome, CacheEvent, EventHandler};
use crate::fetch::DownloadWorker;
use crate::integrity;

pub use builder::AssetCacheBuilder;
pub use health::{HealthReport, HealthStatus};
pub use state::{CacheStats, DownloadStatus, ProgressSnapshot};

use state::{CacheState, Claim};

/// Cache of one asset domain. Cloning yields another handle to the same
/// cache.
#[derive(Clone)]
pub struct AssetCache {
    inner: Arc<Inner>,
}

struct Inner {
    name: String,
    catalog: Catalog,
    config: CacheConfig,
    worker: DownloadWorker,
    state: Mutex<CacheState>,
    /// Serializes passes that rebuild the whole cache
    init_lock: tokio::sync::Mutex<()>,
    background: TaskTracker,
    on_event: Option<EventHandler>,
}

impl AssetCache {
    pub fn builder(catalog: Catalog, config: CacheConfig) -> AssetCacheBuilder {
        AssetCacheBuilder::new(catalog, config)
    }

    fn from_parts(
        name: String,
        catalog: Catalog,
        config: CacheConfig,
        worker: DownloadWorker,
        on_event: Option<EventHandler>,
    ) -> Self {
        let state = CacheState::new(catalog.keys());
        Self {
            inner: Arc::new(Inner {
                name,
                catalog,
                config,
                worker,
                state: Mutex::new(state),
                init_lock: tokio::sync::Mutex::new(()),
                background: TaskTracker::new(),
                on_event,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    pub fn cache_dir(&self) -> &Path {
        &self.inner.config.cache_dir
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.state.lock().initialized
    }

    /// Status of `key`, `None` if the catalog does not know it
    pub fn status(&self, key: &str) -> Option<DownloadStatus> {
        self.inner.state.lock().status(key)
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.state.lock().stats
    }

    pub fn progress(&self) -> ProgressSnapshot {
        self.inner.state.lock().progress()
    }

    /// Bring the whole catalog onto disk.
    ///
    /// Valid files already present are adopted; the rest is downloaded one
    /// priority band at a time, highest first. Individual failures only show
    /// up in the returned progress. Calling again after a completed pass
    /// returns the current progress without doing any work.
    pub async fn initialize(&self) -> Result<ProgressSnapshot, CacheError> {
        let _guard = self.inner.init_lock.lock().await;
        if self.is_initialized() {
            debug!(cache = %self.inner.name, "Asset cache already initialized");
            return Ok(self.progress());
        }

        info!(
            cache = %self.inner.name,
            dir = %self.inner.config.cache_dir.display(),
            assets = self.inner.catalog.len(),
            "Initializing asset cache"
        );

        self.ensure_root_dir().await?;
        let missing = self.scan_existing().await;
        info!(
            cache = %self.inner.name,
            cached = self.inner.catalog.len() - missing.len(),
            missing = missing.len(),
            "Scanned local assets"
        );

        self.download_banded(missing).await;
        self.inner.state.lock().initialized = true;

        let progress = self.progress();
        if progress.failed > 0 {
            warn!(
                cache = %self.inner.name,
                success = progress.success,
                failed = progress.failed,
                percentage = progress.percentage,
                "Asset cache initialized with failures"
            );
        } else {
            info!(
                cache = %self.inner.name,
                success = progress.success,
                percentage = progress.percentage,
                "Asset cache initialized"
            );
        }
        Ok(progress)
    }

    /// Local path of a usable asset.
    ///
    /// The file is re-checked on every call. If it vanished or shrank below
    /// the size threshold the asset is marked failed, a background
    /// re-download is scheduled and `None` is returned right away.
    pub fn get_local_path(&self, key: &str) -> Option<PathBuf> {
        let Some(asset) = self.inner.catalog.get(key) else {
            warn!(cache = %self.inner.name, key, "Unknown asset key");
            return None;
        };

        let status = self.status(key);
        if status != Some(DownloadStatus::Success) {
            debug!(cache = %self.inner.name, key, ?status, "Asset not available locally");
            return None;
        }

        match integrity::check_file_blocking(&asset.local_path, self.inner.config.fetch.min_valid_size)
        {
            Ok(_) => Some(asset.local_path.clone()),
            Err(e) => {
                warn!(
                    cache = %self.inner.name,
                    key,
                    error = %e,
                    "Cached asset is gone or corrupt, scheduling re-download"
                );
                self.inner
                    .state
                    .lock()
                    .set_status(key, DownloadStatus::Failed);
                self.schedule_repair(vec![asset.key.clone()]);
                None
            }
        }
    }

    /// Remove the cache directory and forget all state. A missing directory
    /// is not an error. Waits for a running initialization and for pending
    /// background repairs to finish first.
    pub async fn clear_cache(&self) -> Result<(), CacheError> {
        let _guard = self.inner.init_lock.lock().await;
        self.wait_for_background().await;
        let dir = &self.inner.config.cache_dir;

        match fs::remove_dir_all(dir).await {
            Ok(()) => info!(cache = %self.inner.name, dir = %dir.display(), "Cache directory removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(cache = %self.inner.name, dir = %dir.display(), "Cache directory already absent");
            }
            Err(source) => {
                error!(cache = %self.inner.name, dir = %dir.display(), error = %source, "Failed to clear cache");
                return Err(CacheError::Directory {
                    path: dir.clone(),
                    source,
                });
            }
        }

        self.inner.state.lock().reset();
        self.emit(CacheEvent::Cleared);
        Ok(())
    }

    /// Drop all state (files stay) and run [`initialize`](Self::initialize)
    /// again once pending background repairs have settled.
    pub async fn force_reinitialize(&self) -> Result<ProgressSnapshot, CacheError> {
        {
            let _guard = self.inner.init_lock.lock().await;
            self.wait_for_background().await;
            self.inner.state.lock().reset();
        }
        info!(cache = %self.inner.name, "Forcing asset cache re-initialization");
        self.initialize().await
    }

    /// Download the assets with `priority >= min_priority` that are not yet
    /// usable. Gives callers a usable core set before a full pass.
    pub async fn preload_by_priority(
        &self,
        min_priority: u8,
    ) -> Result<ProgressSnapshot, CacheError> {
        self.ensure_root_dir().await?;

        let selected: Vec<&AssetConfig> = {
            let state = self.inner.state.lock();
            self.inner
                .catalog
                .iter()
                .filter(|a| {
                    a.priority >= min_priority
                        && state.status(&a.key) != Some(DownloadStatus::Success)
                })
                .collect()
        };

        info!(
            cache = %self.inner.name,
            min_priority,
            assets = selected.len(),
            "Preloading high-priority assets"
        );
        self.download_banded(selected).await;
        Ok(self.progress())
    }

    /// Run the download pipeline again over every failed asset.
    pub async fn retry_failed(&self) -> ProgressSnapshot {
        let failed: Vec<&AssetConfig> = {
            let state = self.inner.state.lock();
            self.inner
                .catalog
                .iter()
                .filter(|a| state.status(&a.key) == Some(DownloadStatus::Failed))
                .collect()
        };

        if !failed.is_empty() {
            info!(cache = %self.inner.name, assets = failed.len(), "Retrying failed assets");
            self.download_banded(failed).await;
        }
        self.progress()
    }

    /// Wait until every scheduled background repair has settled.
    pub async fn wait_for_background(&self) {
        let tracker = &self.inner.background;
        tracker.close();
        tracker.wait().await;
        tracker.reopen();
    }

    async fn ensure_root_dir(&self) -> Result<(), CacheError> {
        let dir = &self.inner.config.cache_dir;
        fs::create_dir_all(dir).await.map_err(|source| {
            error!(cache = %self.inner.name, dir = %dir.display(), error = %source, "Cannot create cache directory");
            CacheError::Directory {
                path: dir.clone(),
                source,
            }
        })
    }

    /// Adopt valid files already on disk; return what still needs a fetch.
    async fn scan_existing(&self) -> Vec<&AssetConfig> {
        let min_size = self.inner.config.fetch.min_valid_size;
        let mut missing = Vec::new();

        for asset in self.inner.catalog.iter() {
            let valid = integrity::check_file(&asset.local_path, min_size)
                .await
                .is_ok();
            {
                let mut state = self.inner.state.lock();
                if valid {
                    state.set_status(&asset.key, DownloadStatus::Success);
                    continue;
                }
                if state.status(&asset.key) == Some(DownloadStatus::Success) {
                    state.set_status(&asset.key, DownloadStatus::Unset);
                }
            }
            missing.push(asset);
        }
        missing
    }

    /// Download `assets` band by band. Within a band, groups of
    /// `max_concurrent_downloads` run together and every group settles
    /// before the next one starts.
    async fn download_banded(&self, assets: Vec<&AssetConfig>) {
        let limit = self.inner.config.max_concurrent_downloads.max(1);

        for (index, (priority, band)) in priority_bands(assets).into_iter().enumerate() {
            if index > 0 && !self.inner.config.band_pause.is_zero() {
                tokio::time::sleep(self.inner.config.band_pause).await;
            }

            debug!(cache = %self.inner.name, priority, assets = band.len(), "Starting priority band");
            self.emit(CacheEvent::BandStarted {
                priority,
                assets: band.len(),
            });

            let mut succeeded = 0;
            let mut failed = 0;
            for group in band.chunks(limit) {
                let outcomes = join_all(group.iter().map(|asset| self.download_one(asset))).await;
                for outcome in outcomes {
                    if outcome.is_success() {
                        succeeded += 1;
                    } else if matches!(outcome, AssetOutcome::Failed { .. }) {
                        failed += 1;
                    }
                }
            }

            debug!(cache = %self.inner.name, priority, succeeded, failed, "Priority band settled");
            self.emit(CacheEvent::BandFinished {
                priority,
                succeeded,
                failed,
            });
        }
    }

    /// Download one asset, or join a download of the same key already
    /// running elsewhere. Settles only once the asset has.
    async fn download_one(&self, asset: &AssetConfig) -> AssetOutcome {
        let claim = {
            let mut state = self.inner.state.lock();
            let claim = state.begin(&asset.key);
            if matches!(claim, Claim::Owner) {
                state.stats.attempted += 1;
            }
            claim
        };

        let outcome = match claim {
            Claim::Owner => self.fetch_claimed(asset).await,
            Claim::Busy(mut pending) => {
                debug!(cache = %self.inner.name, key = %asset.key, "Asset already downloading, waiting for it");
                match pending.wait_for(Option::is_some).await {
                    Ok(settled) => settled.clone().unwrap_or(AssetOutcome::Skipped),
                    Err(_) => AssetOutcome::Skipped,
                }
            }
        };

        self.emit(CacheEvent::AssetSettled {
            key: asset.key.clone(),
            outcome: outcome.clone(),
        });
        outcome
    }

    async fn fetch_claimed(&self, asset: &AssetConfig) -> AssetOutcome {
        let result = self.inner.worker.fetch_asset(asset).await;

        let mut state = self.inner.state.lock();
        let outcome = match result {
            Ok(fetched) => {
                state.set_status(&asset.key, DownloadStatus::Success);
                state.stats.succeeded += 1;
                if fetched.reused {
                    state.stats.reused += 1;
                    AssetOutcome::Reused {
                        bytes: fetched.bytes,
                    }
                } else {
                    state.stats.total_bytes += fetched.bytes;
                    AssetOutcome::Downloaded {
                        bytes: fetched.bytes,
                    }
                }
            }
            Err(e) => {
                state.set_status(&asset.key, DownloadStatus::Failed);
                state.stats.failed += 1;
                AssetOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };
        state.finish(&asset.key, &outcome);
        outcome
    }

    /// Re-download `keys` on a background task. Returns how many assets were
    /// scheduled; zero outside a tokio runtime.
    fn schedule_repair(&self, keys: Vec<String>) -> usize {
        if keys.is_empty() {
            return 0;
        }
        let Ok(handle) = Handle::try_current() else {
            debug!(cache = %self.inner.name, "No async runtime, repair left to the next explicit retry");
            return 0;
        };

        let count = keys.len();
        let cache = self.clone();
        self.inner.background.spawn_on(
            async move {
                cache.repair(keys).await;
            },
            &handle,
        );
        count
    }

    async fn repair(&self, keys: Vec<String>) {
        let assets: Vec<&AssetConfig> = keys
            .iter()
            .filter_map(|key| self.inner.catalog.get(key))
            .collect();

        info!(cache = %self.inner.name, assets = assets.len(), "Starting background repair");
        self.download_banded(assets).await;

        let progress = self.progress();
        info!(
            cache = %self.inner.name,
            success = progress.success,
            failed = progress.failed,
            percentage = progress.percentage,
            "Background repair finished"
        );
    }

    fn emit(&self, event: CacheEvent) {
        if let Some(handler) = &self.inner.on_event {
            handler(event);
        }
    }
}

impl std::fmt::Debug for AssetCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetCache")
            .field("name", &self.inner.name)
            .field("cache_dir", &self.inner.config.cache_dir)
            .field("assets", &self.inner.catalog.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use reqwest::StatusCode;

    use super::*;
    use crate::test_utils::{FetchLog, MockSource, Reply, init_tracing, payload, test_asset};

    fn config(dir: &Path) -> CacheConfig {
        CacheConfig::builder()
            .with_cache_dir(dir)
            .with_max_concurrent_downloads(2)
            .with_band_pause(Duration::ZERO)
            .with_health_check_interval(Duration::ZERO)
            .with_max_retries(1)
            .with_retry_delay_base(Duration::from_millis(1))
            .with_min_valid_size(16)
            .build()
    }

    /// `a` and `b` at priority 10, `c` at 4; every asset is served.
    fn setup(dir: &Path) -> (Catalog, Arc<MockSource>) {
        let catalog = Catalog::new(vec![
            test_asset(dir, "a", 10),
            test_asset(dir, "b", 10),
            test_asset(dir, "c", 4),
        ])
        .unwrap();
        let source = MockSource::new();
        for asset in &catalog {
            source.respond(&asset.remote_url, Reply::Payload(payload(64)));
        }
        (catalog, source)
    }

    fn cache(catalog: Catalog, source: Arc<MockSource>, config: CacheConfig) -> AssetCache {
        AssetCache::builder(catalog, config)
            .name("test")
            .source(source)
            .build()
            .unwrap()
    }

    fn url(cache: &AssetCache, key: &str) -> url::Url {
        cache.catalog().get(key).unwrap().remote_url.clone()
    }

    #[tokio::test]
    async fn test_initialize_reports_partial_failure() {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let (catalog, source) = setup(dir.path());
        let c_url = catalog.get("c").unwrap().remote_url.clone();
        source.respond(&c_url, Reply::Status(StatusCode::NOT_FOUND));
        let cache = cache(catalog, source.clone(), config(dir.path()));

        let progress = cache.initialize().await.unwrap();

        assert_eq!(progress, ProgressSnapshot::new(3, 2, 1));
        assert_eq!(progress.pending, 0);
        assert_eq!(progress.percentage, 67);
        assert!(cache.is_initialized());
        assert_eq!(cache.status("a"), Some(DownloadStatus::Success));
        assert_eq!(cache.status("c"), Some(DownloadStatus::Failed));
        // One retry for the failing asset
        assert_eq!(source.calls_for(&c_url), 2);

        let stats = cache.stats();
        assert_eq!(stats.attempted, 3);
        assert_eq!(stats.succeeded, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.total_bytes, 128);
    }

    #[tokio::test]
    async fn test_higher_band_settles_before_lower_band_starts() {
        let dir = tempfile::tempdir().unwrap();
        let (catalog, source) = setup(dir.path());
        source.set_delay(Duration::from_millis(10));
        let cache = cache(catalog, source.clone(), config(dir.path()));

        cache.initialize().await.unwrap();

        let c = url(&cache, "c").to_string();
        let log = source.log();
        let c_start = log
            .iter()
            .position(|entry| *entry == FetchLog::Started(c.clone()))
            .unwrap();
        let high_band_done = log
            .iter()
            .filter(|entry| matches!(entry, FetchLog::Finished(u) if *u != c))
            .count();
        assert_eq!(high_band_done, 2);
        assert!(
            log[..c_start]
                .iter()
                .filter(|entry| matches!(entry, FetchLog::Finished(_)))
                .count()
                == 2,
            "priority 4 started before priority 10 settled: {log:?}"
        );
    }

    #[tokio::test]
    async fn test_concurrency_is_capped() {
        let dir = tempfile::tempdir().unwrap();
        let assets: Vec<_> = (0..6)
            .map(|i| test_asset(dir.path(), &format!("k{i}"), 7))
            .collect();
        let source = MockSource::new();
        for asset in &assets {
            source.respond(&asset.remote_url, Reply::Payload(payload(32)));
        }
        source.set_delay(Duration::from_millis(20));
        let cache = cache(
            Catalog::new(assets).unwrap(),
            source.clone(),
            config(dir.path()),
        );

        let progress = cache.initialize().await.unwrap();

        assert!(progress.is_complete());
        assert_eq!(source.total_calls(), 6);
        assert!(source.peak_concurrency() <= 2);
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let (catalog, source) = setup(dir.path());
        let cache = cache(catalog, source.clone(), config(dir.path()));

        let first = cache.initialize().await.unwrap();
        let second = cache.initialize().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(source.total_calls(), 3);
    }

    #[tokio::test]
    async fn test_valid_files_on_disk_are_adopted() {
        let dir = tempfile::tempdir().unwrap();
        let (catalog, source) = setup(dir.path());
        let a = catalog.get("a").unwrap().clone();
        std::fs::write(&a.local_path, payload(64)).unwrap();
        let cache = cache(catalog, source.clone(), config(dir.path()));

        cache.initialize().await.unwrap();

        assert_eq!(source.calls_for(&a.remote_url), 0);
        assert_eq!(source.total_calls(), 2);
        assert_eq!(cache.status("a"), Some(DownloadStatus::Success));
    }

    #[tokio::test]
    async fn test_get_local_path() {
        let dir = tempfile::tempdir().unwrap();
        let (catalog, source) = setup(dir.path());
        let cache = cache(catalog, source, config(dir.path()));

        assert!(cache.get_local_path("a").is_none());
        cache.initialize().await.unwrap();

        let path = cache.get_local_path("a").unwrap();
        assert_eq!(path, dir.path().join("a.bin"));
        assert!(path.exists());
        assert!(cache.get_local_path("missing_key").is_none());
        assert_eq!(cache.status("missing_key"), None);
    }

    #[tokio::test]
    async fn test_evicted_file_is_downloaded_again_in_background() {
        let dir = tempfile::tempdir().unwrap();
        let (catalog, source) = setup(dir.path());
        let cache = cache(catalog, source.clone(), config(dir.path()));
        cache.initialize().await.unwrap();

        let path = cache.get_local_path("b").unwrap();
        std::fs::remove_file(&path).unwrap();

        assert!(cache.get_local_path("b").is_none());
        assert_ne!(cache.status("b"), Some(DownloadStatus::Success));

        cache.wait_for_background().await;

        assert_eq!(cache.status("b"), Some(DownloadStatus::Success));
        assert_eq!(cache.get_local_path("b"), Some(path));
        assert_eq!(source.calls_for(&url(&cache, "b")), 2);
    }

    #[tokio::test]
    async fn test_health_check_repairs_truncated_asset() {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let (catalog, source) = setup(dir.path());
        let cache = cache(catalog, source.clone(), config(dir.path()));
        cache.initialize().await.unwrap();

        std::fs::write(dir.path().join("a.bin"), b"tiny").unwrap();

        let report = cache.perform_health_check().await;
        assert!(report.checked);
        assert_eq!(report.demoted, 1);
        assert_eq!(report.status, HealthStatus::Degraded);
        assert_eq!(report.progress.percentage, 67);
        assert_eq!(report.repair_scheduled, 1);

        cache.wait_for_background().await;

        assert_eq!(cache.status("a"), Some(DownloadStatus::Success));
        assert_eq!(std::fs::metadata(dir.path().join("a.bin")).unwrap().len(), 64);
        let report = cache.perform_health_check().await;
        assert_eq!(report.status, HealthStatus::Healthy);
        assert_eq!(report.demoted, 0);
    }

    #[tokio::test]
    async fn test_health_check_repair_batch_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let (catalog, source) = setup(dir.path());
        let config = CacheConfig {
            max_repair_batch: 1,
            ..config(dir.path())
        };
        let cache = cache(catalog, source.clone(), config);

        // Nothing downloaded yet: everything is unusable
        let report = cache.perform_health_check().await;
        assert_eq!(report.status, HealthStatus::Degraded);
        assert_eq!(report.repair_scheduled, 1);

        cache.wait_for_background().await;

        // Highest priority first
        assert_eq!(cache.status("a"), Some(DownloadStatus::Success));
        assert_eq!(cache.status("c"), Some(DownloadStatus::Unset));
        assert_eq!(source.total_calls(), 1);
    }

    #[tokio::test]
    async fn test_health_check_is_rate_limited() {
        let dir = tempfile::tempdir().unwrap();
        let (catalog, source) = setup(dir.path());
        let config = CacheConfig {
            health_check_interval: Duration::from_secs(60),
            ..config(dir.path())
        };
        let cache = cache(catalog, source, config);
        cache.initialize().await.unwrap();

        let first = cache.perform_health_check().await;
        let second = cache.perform_health_check().await;

        assert!(first.checked);
        assert!(!second.checked);
        assert_eq!(second.status, HealthStatus::Healthy);
        assert_eq!(second.progress, first.progress);
    }

    #[tokio::test]
    async fn test_health_check_restores_files_found_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let (catalog, source) = setup(dir.path());
        for asset in &catalog {
            std::fs::write(&asset.local_path, payload(64)).unwrap();
        }
        let cache = cache(catalog, source.clone(), config(dir.path()));

        let report = cache.perform_health_check().await;

        assert_eq!(report.restored, 3);
        assert_eq!(report.status, HealthStatus::Healthy);
        assert_eq!(report.repair_scheduled, 0);
        assert_eq!(source.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_clear_cache() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("cache");
        let (catalog, source) = setup(&root);
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let cache = AssetCache::builder(catalog, config(&root))
            .source(source)
            .on_event(Arc::new(move |event: CacheEvent| sink.lock().push(event)))
            .build()
            .unwrap();

        cache.initialize().await.unwrap();
        cache.clear_cache().await.unwrap();

        assert!(!root.exists());
        assert!(!cache.is_initialized());
        assert_eq!(cache.progress(), ProgressSnapshot::new(3, 0, 0));
        assert_eq!(cache.stats(), CacheStats::default());
        assert!(cache.get_local_path("a").is_none());
        assert!(matches!(events.lock().last(), Some(CacheEvent::Cleared)));

        // Clearing an absent directory is fine
        cache.clear_cache().await.unwrap();
    }

    #[tokio::test]
    async fn test_force_reinitialize_recovers_failures() {
        let dir = tempfile::tempdir().unwrap();
        let (catalog, source) = setup(dir.path());
        let c_url = catalog.get("c").unwrap().remote_url.clone();
        source.respond(&c_url, Reply::Status(StatusCode::SERVICE_UNAVAILABLE));
        let cache = cache(catalog, source.clone(), config(dir.path()));

        assert_eq!(cache.initialize().await.unwrap().failed, 1);

        source.respond(&c_url, Reply::Payload(payload(64)));
        let progress = cache.force_reinitialize().await.unwrap();

        assert_eq!(progress.percentage, 100);
        assert!(progress.is_complete());
        // a and b were adopted from disk
        assert_eq!(source.calls_for(&url(&cache, "a")), 1);
    }

    #[tokio::test]
    async fn test_preload_by_priority() {
        let dir = tempfile::tempdir().unwrap();
        let (catalog, source) = setup(dir.path());
        let cache = cache(catalog, source.clone(), config(dir.path()));

        let progress = cache.preload_by_priority(10).await.unwrap();

        assert_eq!(progress.success, 2);
        assert_eq!(progress.pending, 1);
        assert_eq!(cache.status("c"), Some(DownloadStatus::Unset));
        assert_eq!(source.calls_for(&url(&cache, "c")), 0);
        assert!(!cache.is_initialized());

        cache.initialize().await.unwrap();
        assert_eq!(source.total_calls(), 3);
    }

    /// Yield until a background task has claimed `key`.
    async fn until_in_flight(cache: &AssetCache, key: &str) {
        while !cache.inner.state.lock().is_in_flight(key) {
            tokio::task::yield_now().await;
        }
    }

    /// Delete `a.bin`, slow the store down and let a background repair of
    /// `a` start.
    async fn start_slow_repair(cache: &AssetCache, source: &MockSource, dir: &Path) {
        std::fs::remove_file(dir.join("a.bin")).unwrap();
        source.set_delay(Duration::from_millis(100));
        assert!(cache.get_local_path("a").is_none());
        until_in_flight(cache, "a").await;
    }

    #[tokio::test]
    async fn test_band_waits_for_key_downloading_elsewhere() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::new(vec![
            test_asset(dir.path(), "a", 10),
            test_asset(dir.path(), "c", 4),
        ])
        .unwrap();
        let a_url = catalog.get("a").unwrap().remote_url.clone();
        let c_url = catalog.get("c").unwrap().remote_url.clone();
        let source = MockSource::new();
        source.respond(&a_url, Reply::Payload(payload(64)));
        source.respond(&c_url, Reply::Status(StatusCode::NOT_FOUND));
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let cache = AssetCache::builder(catalog, config(dir.path()))
            .source(source.clone())
            .on_event(Arc::new(move |event: CacheEvent| sink.lock().push(event)))
            .build()
            .unwrap();
        cache.initialize().await.unwrap();
        let seen = source.log().len();

        source.respond(&c_url, Reply::Payload(payload(64)));
        start_slow_repair(&cache, &source, dir.path()).await;
        let progress = cache.retry_failed().await;

        assert!(progress.is_complete());
        let log = source.log().split_off(seen);
        let a_done = log
            .iter()
            .position(|entry| *entry == FetchLog::Finished(a_url.to_string()))
            .unwrap();
        let c_start = log
            .iter()
            .position(|entry| *entry == FetchLog::Started(c_url.to_string()))
            .unwrap();
        assert!(a_done < c_start, "priority 4 started while a was in flight: {log:?}");
        // The retry pass joined the repair instead of fetching again
        assert_eq!(source.calls_for(&a_url), 2);

        let a_settled = events
            .lock()
            .iter()
            .filter(|event| {
                matches!(
                    event,
                    CacheEvent::AssetSettled { key, outcome: AssetOutcome::Downloaded { .. } }
                        if key == "a"
                )
            })
            .count();
        // initialize, the repair and the joined retry
        assert_eq!(a_settled, 3);
    }

    #[tokio::test]
    async fn test_clear_cache_settles_pending_repairs_first() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("cache");
        let (catalog, source) = setup(&root);
        let cache = cache(catalog, source.clone(), config(&root));
        cache.initialize().await.unwrap();

        start_slow_repair(&cache, &source, &root).await;
        cache.clear_cache().await.unwrap();
        cache.wait_for_background().await;

        assert!(!root.exists());
        assert_eq!(cache.status("a"), Some(DownloadStatus::Unset));
        assert_eq!(cache.stats(), CacheStats::default());
        assert_eq!(cache.progress(), ProgressSnapshot::new(3, 0, 0));
    }

    #[tokio::test]
    async fn test_force_reinitialize_settles_pending_repairs_first() {
        let dir = tempfile::tempdir().unwrap();
        let (catalog, source) = setup(dir.path());
        let cache = cache(catalog, source.clone(), config(dir.path()));
        cache.initialize().await.unwrap();

        start_slow_repair(&cache, &source, dir.path()).await;
        let progress = cache.force_reinitialize().await.unwrap();

        assert!(progress.is_complete());
        // Everything was on disk again by the time the pass scanned
        assert_eq!(cache.stats(), CacheStats::default());
        assert_eq!(source.calls_for(&url(&cache, "a")), 2);
    }

    #[tokio::test]
    async fn test_retry_failed() {
        let dir = tempfile::tempdir().unwrap();
        let (catalog, source) = setup(dir.path());
        let c_url = catalog.get("c").unwrap().remote_url.clone();
        source.respond(&c_url, Reply::Status(StatusCode::BAD_GATEWAY));
        let cache = cache(catalog, source.clone(), config(dir.path()));
        cache.initialize().await.unwrap();

        source.respond(&c_url, Reply::Payload(payload(64)));
        let progress = cache.retry_failed().await;

        assert!(progress.is_complete());
        assert_eq!(source.calls_for(&url(&cache, "a")), 1);
    }

    #[tokio::test]
    async fn test_events_follow_band_order() {
        let dir = tempfile::tempdir().unwrap();
        let (catalog, source) = setup(dir.path());
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let cache = AssetCache::builder(catalog, config(dir.path()))
            .source(source)
            .on_event(Arc::new(move |event: CacheEvent| sink.lock().push(event)))
            .build()
            .unwrap();

        cache.initialize().await.unwrap();

        let bands: Vec<(u8, usize)> = events
            .lock()
            .iter()
            .filter_map(|event| match event {
                CacheEvent::BandFinished {
                    priority,
                    succeeded,
                    ..
                } => Some((*priority, *succeeded)),
                _ => None,
            })
            .collect();
        assert_eq!(bands, [(10, 2), (4, 1)]);
    }

    #[tokio::test]
    async fn test_unusable_cache_dir_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let root = blocker.join("cache");
        let (catalog, source) = setup(&root);
        let cache = cache(catalog, source.clone(), config(&root));

        let err = cache.initialize().await.unwrap_err();

        assert!(matches!(err, CacheError::Directory { .. }));
        assert!(!cache.is_initialized());
        assert_eq!(source.total_calls(), 0);
    }

    #[test]
    fn test_builder_rejects_assets_outside_cache_dir() {
        let dir = tempfile::tempdir().unwrap();
        let (catalog, source) = setup(&dir.path().join("one"));
        let result = AssetCache::builder(catalog, config(&dir.path().join("two")))
            .source(source)
            .build();
        assert!(matches!(result, Err(CacheError::Catalog(_))));
    }
}
