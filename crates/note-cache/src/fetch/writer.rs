use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tracing::debug;

/// A way of putting a payload at its final path.
#[async_trait]
pub trait WriteStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn write(&self, path: &Path, data: &Bytes) -> io::Result<()>;
}

/// Write next to the destination, then rename into place. Readers never
/// observe a half-written asset.
#[derive(Debug, Clone, Copy, Default)]
pub struct AtomicRename;

#[async_trait]
impl WriteStrategy for AtomicRename {
    fn name(&self) -> &'static str {
        "atomic-rename"
    }

    async fn write(&self, path: &Path, data: &Bytes) -> io::Result<()> {
        let temp_path = temp_sibling(path);

        if let Err(e) = fs::write(&temp_path, data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e);
        }

        if let Err(e) = fs::rename(&temp_path, path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e);
        }

        Ok(())
    }
}

/// Write into a staging directory first and copy the result over.
#[derive(Debug, Clone)]
pub struct StagedCopy {
    staging_dir: PathBuf,
}

static STAGING_SEQ: AtomicU64 = AtomicU64::new(0);

impl StagedCopy {
    pub fn new(staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            staging_dir: staging_dir.into(),
        }
    }
}

impl Default for StagedCopy {
    fn default() -> Self {
        Self::new(std::env::temp_dir().join("note-cache-staging"))
    }
}

#[async_trait]
impl WriteStrategy for StagedCopy {
    fn name(&self) -> &'static str {
        "staged-copy"
    }

    async fn write(&self, path: &Path, data: &Bytes) -> io::Result<()> {
        fs::create_dir_all(&self.staging_dir).await?;

        let staged = self.staging_dir.join(format!(
            "{}-{}.part",
            std::process::id(),
            STAGING_SEQ.fetch_add(1, Ordering::Relaxed)
        ));

        let result = async {
            fs::write(&staged, data).await?;
            fs::copy(&staged, path).await?;
            Ok::<(), io::Error>(())
        }
        .await;

        let _ = fs::remove_file(&staged).await;
        if result.is_ok() {
            debug!(path = %path.display(), "Asset written through staging copy");
        }
        result
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
