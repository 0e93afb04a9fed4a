use std::fmt;
use std::path::{Path, PathBuf};

use url::Url;

use super::piano::piano_catalog;
use super::priority::PriorityPolicy;
use super::staff::staff_catalog;
use super::types::Catalog;
use crate::error::CacheError;

const STAFF_IMAGES_BASE_URL: &str = "https://music-1253799806.cos.ap-guangzhou.myqcloud.com/pic/";
const PIANO_AUDIO_BASE_URL: &str =
    "https://music-1253799806.cos.ap-guangzhou.myqcloud.com/audio/piano/";

/// The asset families the app caches. Each domain owns a disjoint
/// directory below the cache root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetDomain {
    StaffImages,
    PianoAudio,
}

impl AssetDomain {
    pub const ALL: [AssetDomain; 2] = [AssetDomain::StaffImages, AssetDomain::PianoAudio];

    pub fn name(&self) -> &'static str {
        match self {
            AssetDomain::StaffImages => "staff-images",
            AssetDomain::PianoAudio => "piano-audio",
        }
    }

    pub fn subdir(&self) -> PathBuf {
        match self {
            AssetDomain::StaffImages => PathBuf::from("staff_images"),
            AssetDomain::PianoAudio => Path::new("audio").join("piano"),
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            AssetDomain::StaffImages => STAFF_IMAGES_BASE_URL,
            AssetDomain::PianoAudio => PIANO_AUDIO_BASE_URL,
        }
    }

    /// Directory owned by this domain's cache
    pub fn cache_dir(&self, root: &Path) -> PathBuf {
        root.join(self.subdir())
    }

    /// Build the domain catalog with files placed under `cache_dir(root)`.
    pub fn catalog(
        &self,
        base_url: &Url,
        root: &Path,
        policy: &dyn PriorityPolicy,
    ) -> Result<Catalog, CacheError> {
        let dir = self.cache_dir(root);
        match self {
            AssetDomain::StaffImages => staff_catalog(base_url, &dir, policy),
            AssetDomain::PianoAudio => piano_catalog(base_url, &dir, policy),
        }
    }

    /// Same as [`catalog`](Self::catalog) against the built-in asset store.
    pub fn default_catalog(
        &self,
        root: &Path,
        policy: &dyn PriorityPolicy,
    ) -> Result<Catalog, CacheError> {
        let base_url = Url::parse(self.default_base_url())
            .map_err(|e| CacheError::InvalidUrl(format!("{}: {e}", self.default_base_url())))?;
        self.catalog(&base_url, root, policy)
    }
}

impl fmt::Display for AssetDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
