//! # Note Cache
//!
//! Asset acquisition and local cache layer for the staff-notation quiz app.
//! Fetches staff images and piano samples from a remote asset store, keeps
//! them on local storage and reports what is usable.
//!
//! ## Features
//!
//! - Deterministic asset catalogs with pluggable priority policies
//! - Stateless download worker with retry/backoff and integrity checks
//! - Priority-banded downloads with bounded concurrency
//! - Health checks with background self-repair
//! - Degraded-mode adapters for image display and sound playback

pub mod adapter;
pub mod builder;
pub mod catalog;
pub mod config;
pub mod error;
pub mod events;
pub mod fetch;
pub mod integrity;
pub mod manager;

#[cfg(test)]
mod test_utils;

pub use builder::CacheConfigBuilder;
pub use catalog::{AssetConfig, AssetDomain, Catalog, NoteProximityPolicy, Pitch, PriorityPolicy};
pub use config::{CacheConfig, FetchConfig};
pub use error::{CacheError, DownloadError, FetchError};
pub use events::{AssetOutcome, CacheEvent, EventHandler};
pub use integrity::IntegrityError;

// Re-export the download worker surface
pub use fetch::{AssetSource, DownloadWorker, FetchedAsset, HttpSource, WriteStrategy, create_client};

// Re-export manager types
pub use manager::{
    AssetCache, AssetCacheBuilder, CacheStats, DownloadStatus, HealthReport, HealthStatus,
    ProgressSnapshot,
};

// Re-export adapters
pub use adapter::{ImageSource, PianoSoundResolver, SoundCue, StaffImageResolver};
