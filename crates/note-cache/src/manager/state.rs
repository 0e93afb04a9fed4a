//! Mutable bookkeeping of one cache: per-asset status, in-flight set and
//! counters. Lives behind the manager's mutex and is never held across an
//! await point.

use std::collections::HashMap;

use serde::Serialize;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::events::AssetOutcome;

/// Download state of one asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadStatus {
    #[default]
    Unset,
    Success,
    Failed,
}

/// Counters since the last reset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CacheStats {
    /// Worker invocations
    pub attempted: u64,
    /// Assets downloaded or found valid on disk by the worker
    pub succeeded: u64,
    /// Assets that exhausted their retries
    pub failed: u64,
    /// Successes served from an existing file
    pub reused: u64,
    /// Bytes downloaded and written
    pub total_bytes: u64,
}

/// Point-in-time download progress.
///
/// `success + failed + pending == total` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub pending: usize,
    pub percentage: u8,
}

impl ProgressSnapshot {
    pub fn new(total: usize, success: usize, failed: usize) -> Self {
        let pending = total.saturating_sub(success + failed);
        Self {
            total,
            success,
            failed,
            pending,
            percentage: percentage(success, total),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.pending == 0 && self.failed == 0
    }
}

/// `round(part / total * 100)`, half rounding up. An empty catalog counts
/// as complete.
fn percentage(part: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let part = part.min(total) as u64;
    let total = total as u64;
    ((part * 200 + total) / (total * 2)) as u8
}

/// Answer to a download claim on a key
#[derive(Debug)]
pub(crate) enum Claim {
    /// Caller downloads the asset and reports through `finish`
    Owner,
    /// Another task holds the key; yields its outcome once settled
    Busy(watch::Receiver<Option<AssetOutcome>>),
}

#[derive(Debug, Default)]
pub(crate) struct CacheState {
    statuses: HashMap<String, DownloadStatus>,
    in_flight: HashMap<String, watch::Sender<Option<AssetOutcome>>>,
    pub(crate) stats: CacheStats,
    pub(crate) initialized: bool,
    pub(crate) last_health_check: Option<Instant>,
}

impl CacheState {
    pub(crate) fn new<'a>(keys: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            statuses: keys
                .into_iter()
                .map(|k| (k.to_owned(), DownloadStatus::Unset))
                .collect(),
            ..Self::default()
        }
    }

    pub(crate) fn status(&self, key: &str) -> Option<DownloadStatus> {
        self.statuses.get(key).copied()
    }

    /// Update a known key; unknown keys are ignored.
    pub(crate) fn set_status(&mut self, key: &str, status: DownloadStatus) {
        if let Some(slot) = self.statuses.get_mut(key) {
            *slot = status;
        }
    }

    pub(crate) fn is_in_flight(&self, key: &str) -> bool {
        self.in_flight.contains_key(key)
    }

    /// Claim a key for downloading. A key held elsewhere hands back a
    /// receiver for that download's outcome instead.
    pub(crate) fn begin(&mut self, key: &str) -> Claim {
        if let Some(sender) = self.in_flight.get(key) {
            return Claim::Busy(sender.subscribe());
        }
        let (sender, _) = watch::channel(None);
        self.in_flight.insert(key.to_owned(), sender);
        Claim::Owner
    }

    /// Release the claim on `key` and wake everyone waiting on it.
    pub(crate) fn finish(&mut self, key: &str, outcome: &AssetOutcome) {
        if let Some(sender) = self.in_flight.remove(key) {
            sender.send_replace(Some(outcome.clone()));
        }
    }

    /// Forget every status, counter and the initialized flag. In-flight
    /// claims survive so a running download still releases its own key.
    pub(crate) fn reset(&mut self) {
        for status in self.statuses.values_mut() {
            *status = DownloadStatus::Unset;
        }
        self.stats = CacheStats::default();
        self.initialized = false;
        self.last_health_check = None;
    }

    /// Keys still downloading count as pending whatever their last status.
    pub(crate) fn progress(&self) -> ProgressSnapshot {
        let (success, failed) = self
            .statuses
            .iter()
            .filter(|(key, _)| !self.in_flight.contains_key(*key))
            .fold((0, 0), |(success, failed), (_, status)| match status {
                DownloadStatus::Success => (success + 1, failed),
                DownloadStatus::Failed => (success, failed + 1),
                DownloadStatus::Unset => (success, failed),
            });
        ProgressSnapshot::new(self.statuses.len(), success, failed)
    }
}
