//! Shared fixtures for unit tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use reqwest::StatusCode;
use url::Url;

use crate::catalog::AssetConfig;
use crate::error::FetchError;
use crate::fetch::AssetSource;

#[inline]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer() // Write to test output
        .try_init();
}

pub fn payload(len: usize) -> Bytes {
    Bytes::from(vec![0x5a; len])
}

/// Asset stored at `<dir>/<key>.bin`, served from `https://assets.test/<key>.bin`
pub fn test_asset(dir: &Path, key: &str, priority: u8) -> AssetConfig {
    let base = Url::parse("https://assets.test/").unwrap();
    let name = format!("{key}.bin");
    AssetConfig::from_names(
        key,
        name.clone(),
        crate::catalog::safe_file_name(&name),
        &base,
        dir,
        priority,
    )
    .unwrap()
}

#[derive(Debug, Clone)]
pub enum Reply {
    Payload(Bytes),
    Status(StatusCode),
    /// Never completes
    Hang,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchLog {
    Started(String),
    Finished(String),
}

/// Scripted asset store. Unknown URLs answer 404.
#[derive(Default)]
pub struct MockSource {
    replies: Mutex<HashMap<String, Reply>>,
    calls: Mutex<Vec<String>>,
    log: Mutex<Vec<FetchLog>>,
    delay: Mutex<Duration>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl MockSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, url: &Url, reply: Reply) {
        self.replies.lock().insert(url.to_string(), reply);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = delay;
    }

    pub fn calls_for(&self, url: &Url) -> usize {
        let url = url.as_str();
        self.calls.lock().iter().filter(|c| c.as_str() == url).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn log(&self) -> Vec<FetchLog> {
        self.log.lock().clone()
    }

    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AssetSource for MockSource {
    async fn fetch(&self, url: &Url) -> Result<Bytes, FetchError> {
        let url = url.to_string();
        self.calls.lock().push(url.clone());
        self.log.lock().push(FetchLog::Started(url.clone()));
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let delay = *self.delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let reply = self
            .replies
            .lock()
            .get(&url)
            .cloned()
            .unwrap_or(Reply::Status(StatusCode::NOT_FOUND));

        let result = match reply {
            Reply::Payload(bytes) => Ok(bytes),
            Reply::Status(status) => Err(FetchError::Status(status)),
            Reply::Hang => std::future::pending::<Result<Bytes, FetchError>>().await,
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.log.lock().push(FetchLog::Finished(url));
        result
    }
}
