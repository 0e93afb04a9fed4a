use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_USER_AGENT: &str = concat!("note-cache/", env!("CARGO_PKG_VERSION"));

/// Smallest payload accepted as a real asset. Error pages and truncated
/// transfers from the asset store fall below this.
pub const DEFAULT_MIN_VALID_SIZE: u64 = 1024;

/// Options for a single asset fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    /// Upper bound for one fetch attempt, enforced by the worker
    pub timeout: Duration,

    /// Connection timeout (time to establish initial connection)
    pub connect_timeout: Duration,

    /// User agent string
    pub user_agent: String,

    /// Retries after the first attempt
    pub max_retries: u32,

    /// Base for exponential backoff between attempts
    pub retry_delay_base: Duration,

    /// Payloads and files smaller than this are treated as corrupt
    pub min_valid_size: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            max_retries: 3,
            retry_delay_base: Duration::from_millis(500),
            min_valid_size: DEFAULT_MIN_VALID_SIZE,
        }
    }
}

impl FetchConfig {
    /// Delay before the retry following `attempt` (counted from 0).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.retry_delay_base
            .saturating_mul(2_u32.saturating_pow(attempt))
    }
}

/// Configuration of one cache domain
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Directory owned by this cache; every catalog path lives below it
    pub cache_dir: PathBuf,

    /// Max concurrent fetches within a priority band
    pub max_concurrent_downloads: usize,

    /// Pause between two priority bands
    pub band_pause: Duration,

    /// Minimum time between two health checks
    pub health_check_interval: Duration,

    /// Success percentage below which a health check schedules a repair
    pub health_threshold_percent: u8,

    /// Max assets re-downloaded by one repair pass
    pub max_repair_batch: usize,

    /// Per-asset fetch options
    pub fetch: FetchConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: std::env::temp_dir().join("note-cache"),
            max_concurrent_downloads: 5,
            band_pause: Duration::from_millis(100),
            health_check_interval: Duration::from_secs(60),
            health_threshold_percent: 80,
            max_repair_batch: 10,
            fetch: FetchConfig::default(),
        }
    }
}

impl CacheConfig {
    pub fn builder() -> crate::builder::CacheConfigBuilder {
        crate::builder::CacheConfigBuilder::new()
    }

    /// Create a default configuration rooted at `cache_dir`
    pub fn for_dir(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            ..Self::default()
        }
    }
}
