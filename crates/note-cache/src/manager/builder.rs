use std::sync::Arc;

use crate::catalog::Catalog;
use crate::config::CacheConfig;
use crate::error::CacheError;
use crate::events::EventHandler;
use crate::fetch::{AssetSource, DownloadWorker, HttpSource, WriteStrategy};

use super::AssetCache;

/// Assembles an [`AssetCache`]. Without an explicit source the cache talks
/// HTTP through a client built from the fetch configuration.
pub struct AssetCacheBuilder {
    catalog: Catalog,
    config: CacheConfig,
    name: Option<String>,
    source: Option<Arc<dyn AssetSource>>,
    writers: Option<(Arc<dyn WriteStrategy>, Arc<dyn WriteStrategy>)>,
    on_event: Option<EventHandler>,
}

impl AssetCacheBuilder {
    pub fn new(catalog: Catalog, config: CacheConfig) -> Self {
        Self {
            catalog,
            config,
            name: None,
            source: None,
            writers: None,
            on_event: None,
        }
    }

    /// Name used in log lines, defaults to the cache directory
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn source(mut self, source: Arc<dyn AssetSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn write_strategies(
        mut self,
        primary: Arc<dyn WriteStrategy>,
        fallback: Arc<dyn WriteStrategy>,
    ) -> Self {
        self.writers = Some((primary, fallback));
        self
    }

    pub fn on_event(mut self, handler: EventHandler) -> Self {
        self.on_event = Some(handler);
        self
    }

    pub fn build(self) -> Result<AssetCache, CacheError> {
        self.catalog.ensure_within(&self.config.cache_dir)?;

        let source = match self.source {
            Some(source) => source,
            None => Arc::new(HttpSource::from_config(&self.config.fetch)?),
        };

        let mut worker = DownloadWorker::new(source, self.config.fetch.clone());
        if let Some((primary, fallback)) = self.writers {
            worker = worker.with_write_strategies(primary, fallback);
        }

        let name = self
            .name
            .unwrap_or_else(|| self.config.cache_dir.display().to_string());

        Ok(AssetCache::from_parts(
            name,
            self.catalog,
            self.config,
            worker,
            self.on_event,
        ))
    }
}
