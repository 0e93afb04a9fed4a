//! # Builder for CacheConfig
//!
//! Fluent construction of [`CacheConfig`] instances.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use note_cache::CacheConfig;
//!
//! let config = CacheConfig::builder()
//!     .with_cache_dir("/tmp/note-cache/audio/piano")
//!     .with_max_concurrent_downloads(8)
//!     .with_max_retries(5)
//!     .with_timeout(Duration::from_secs(10))
//!     .build();
//!
//! assert_eq!(config.max_concurrent_downloads, 8);
//! assert_eq!(config.fetch.max_retries, 5);
//! ```

use std::path::PathBuf;
use std::time::Duration;

use crate::config::{CacheConfig, FetchConfig};

/// Builder for creating CacheConfig instances with a fluent API
#[derive(Debug, Clone)]
pub struct CacheConfigBuilder {
    config: CacheConfig,
}

impl CacheConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: CacheConfig::default(),
        }
    }

    /// Set the directory owned by the cache
    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.config.cache_dir = cache_dir.into();
        self
    }

    /// Set the number of concurrent fetches per band (at least one)
    pub fn with_max_concurrent_downloads(mut self, limit: usize) -> Self {
        self.config.max_concurrent_downloads = limit.max(1);
        self
    }

    /// Set the pause between priority bands
    pub fn with_band_pause(mut self, pause: Duration) -> Self {
        self.config.band_pause = pause;
        self
    }

    /// Set the minimum interval between health checks
    pub fn with_health_check_interval(mut self, interval: Duration) -> Self {
        self.config.health_check_interval = interval;
        self
    }

    /// Set the success percentage that triggers a repair pass (capped at 100)
    pub fn with_health_threshold_percent(mut self, percent: u8) -> Self {
        self.config.health_threshold_percent = percent.min(100);
        self
    }

    /// Set the max number of assets re-downloaded per repair pass
    pub fn with_max_repair_batch(mut self, batch: usize) -> Self {
        self.config.max_repair_batch = batch;
        self
    }

    /// Replace the whole fetch configuration
    pub fn with_fetch_config(mut self, fetch: FetchConfig) -> Self {
        self.config.fetch = fetch;
        self
    }

    /// Set the per-attempt timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.fetch.timeout = timeout;
        self
    }

    /// Set the connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.fetch.connect_timeout = timeout;
        self
    }

    /// Set the user agent string
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.fetch.user_agent = user_agent.into();
        self
    }

    /// Set the number of retries after the first attempt
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.config.fetch.max_retries = retries;
        self
    }

    /// Set the backoff base delay
    pub fn with_retry_delay_base(mut self, base: Duration) -> Self {
        self.config.fetch.retry_delay_base = base;
        self
    }

    /// Set the minimum size of a valid asset in bytes
    pub fn with_min_valid_size(mut self, bytes: u64) -> Self {
        self.config.fetch.min_valid_size = bytes;
        self
    }

    /// Build the final CacheConfig
    pub fn build(self) -> CacheConfig {
        self.config
    }
}

impl Default for CacheConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
