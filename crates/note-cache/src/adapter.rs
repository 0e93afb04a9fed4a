//! Read-only consumers of an [`AssetCache`] for the UI layer.
//!
//! Both resolvers fall back to a degraded answer instead of failing: a staff
//! image can always be shown from the remote store, a sound can always be
//! replaced by a haptic cue.

use std::path::PathBuf;

use tracing::debug;
use url::Url;

use crate::catalog::{Clef, Pitch};
use crate::manager::AssetCache;

/// Where a staff image should be loaded from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Local(PathBuf),
    /// Not cached yet, load straight from the asset store
    Remote(Url),
}

impl ImageSource {
    pub fn is_local(&self) -> bool {
        matches!(self, ImageSource::Local(_))
    }
}

/// How a key press should be rendered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoundCue {
    Sample(PathBuf),
    /// Sample unavailable, vibrate instead
    Haptic,
}

#[derive(Debug, Clone)]
pub struct StaffImageResolver {
    cache: AssetCache,
}

impl StaffImageResolver {
    pub fn new(cache: AssetCache) -> Self {
        Self { cache }
    }

    /// Image for `note` (e.g. `C4`) on `clef`. `None` only when the catalog
    /// has no such image.
    pub fn resolve(&self, clef: Clef, note: &str) -> Option<ImageSource> {
        let key = clef.key(note);
        let asset = self.cache.catalog().get(&key)?;

        match self.cache.get_local_path(&key) {
            Some(path) => Some(ImageSource::Local(path)),
            None => {
                debug!(key = %key, "Staff image not cached, using remote URL");
                Some(ImageSource::Remote(asset.remote_url.clone()))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct PianoSoundResolver {
    cache: AssetCache,
}

impl PianoSoundResolver {
    pub fn new(cache: AssetCache) -> Self {
        Self { cache }
    }

    /// Sound for a piano key. Accepts `c#4` as well as `C#4`.
    pub fn resolve(&self, note_key: &str) -> SoundCue {
        let key = match note_key.parse::<Pitch>() {
            Ok(pitch) => pitch.key(),
            Err(_) => note_key.to_string(),
        };

        match self.cache.get_local_path(&key) {
            Some(path) => SoundCue::Sample(path),
            None => {
                debug!(key = %key, "Piano sample unavailable, falling back to haptics");
                SoundCue::Haptic
            }
        }
    }
}
