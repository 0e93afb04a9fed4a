//! # Download Worker
//!
//! Fetches one asset and persists it, or fails after a bounded number of
//! retries. The worker holds no per-asset state; status bookkeeping belongs
//! to the cache manager.

mod source;
mod worker;
mod writer;

pub use source::{AssetSource, HttpSource, create_client};
pub use worker::{DownloadWorker, FetchedAsset};
pub use writer::{AtomicRename, StagedCopy, WriteStrategy};
