//! Notifications emitted while a cache works through its catalog.

use std::sync::Arc;

/// How a single asset settled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetOutcome {
    /// Fetched and written in this pass
    Downloaded { bytes: u64 },
    /// A valid file was already on disk
    Reused { bytes: u64 },
    /// Retries exhausted
    Failed { error: String },
    /// Joined a download running elsewhere that ended without a result
    Skipped,
}

impl AssetOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Downloaded { .. } | Self::Reused { .. })
    }
}

#[derive(Debug, Clone)]
pub enum CacheEvent {
    BandStarted {
        priority: u8,
        assets: usize,
    },
    AssetSettled {
        key: String,
        outcome: AssetOutcome,
    },
    BandFinished {
        priority: u8,
        succeeded: usize,
        failed: usize,
    },
    Cleared,
}

/// Callback receiving cache events; must not block.
pub type EventHandler = Arc<dyn Fn(CacheEvent) + Send + Sync>;
