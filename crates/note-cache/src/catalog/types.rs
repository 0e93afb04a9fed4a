use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use url::Url;

use crate::error::CacheError;

/// One downloadable asset. Immutable once the catalog is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetConfig {
    /// Unique logical key, e.g. `treble_C4` or `c#4`
    pub key: String,
    /// File name on the remote store, unencoded
    pub remote_name: String,
    /// Filesystem-safe file name used locally
    pub local_name: String,
    /// Fully qualified, percent-encoded fetch address
    pub remote_url: Url,
    /// Destination path inside the domain cache directory
    pub local_path: PathBuf,
    /// Higher is fetched sooner
    pub priority: u8,
}

impl AssetConfig {
    /// Build an entry from its remote and local file names.
    pub fn from_names(
        key: impl Into<String>,
        remote_name: impl Into<String>,
        local_name: impl Into<String>,
        base_url: &Url,
        cache_dir: &Path,
        priority: u8,
    ) -> Result<Self, CacheError> {
        let remote_name = remote_name.into();
        let local_name = local_name.into();
        Ok(Self {
            key: key.into(),
            remote_url: remote_url_for(base_url, &remote_name)?,
            local_path: cache_dir.join(&local_name),
            remote_name,
            local_name,
            priority,
        })
    }
}

/// Append `file_name` to `base` as a single percent-encoded path segment.
pub fn remote_url_for(base: &Url, file_name: &str) -> Result<Url, CacheError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| CacheError::InvalidUrl(format!("{base} cannot be used as a base URL")))?
        .pop_if_empty()
        .push(file_name);
    Ok(url)
}

/// Transliterate a file name into characters every target filesystem
/// accepts. `#` becomes `s` (`c#4.mp3` -> `cs4.mp3`), anything else
/// outside `[A-Za-z0-9._-]` becomes `_`.
pub fn safe_file_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '#' => 's',
            c if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') => c,
            _ => '_',
        })
        .collect()
}

/// Group assets by priority, highest band first. Order inside a band
/// follows the input order.
pub fn priority_bands<'a, I>(assets: I) -> Vec<(u8, Vec<&'a AssetConfig>)>
where
    I: IntoIterator<Item = &'a AssetConfig>,
{
    let mut bands: BTreeMap<u8, Vec<&'a AssetConfig>> = BTreeMap::new();
    for asset in assets {
        bands.entry(asset.priority).or_default().push(asset);
    }
    bands.into_iter().rev().collect()
}

/// Ordered, key-unique set of assets for one domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    entries: Vec<AssetConfig>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// Validate and order entries: descending priority, ties keep their
    /// enumeration order.
    pub fn new(mut entries: Vec<AssetConfig>) -> Result<Self, CacheError> {
        entries.sort_by(|a, b| b.priority.cmp(&a.priority));

        let mut index = HashMap::with_capacity(entries.len());
        for (position, entry) in entries.iter().enumerate() {
            if entry.key.is_empty() {
                return Err(CacheError::Catalog("empty asset key".to_string()));
            }
            if index.insert(entry.key.clone(), position).is_some() {
                return Err(CacheError::Catalog(format!(
                    "duplicate asset key '{}'",
                    entry.key
                )));
            }
        }

        Ok(Self { entries, index })
    }

    pub fn get(&self, key: &str) -> Option<&AssetConfig> {
        self.index.get(key).map(|&i| &self.entries[i])
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AssetConfig> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.key.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn bands(&self) -> Vec<(u8, Vec<&AssetConfig>)> {
        priority_bands(&self.entries)
    }

    /// Fail if any local path escapes `cache_dir`.
    pub fn ensure_within(&self, cache_dir: &Path) -> Result<(), CacheError> {
        match self
            .entries
            .iter()
            .find(|e| !e.local_path.starts_with(cache_dir))
        {
            Some(entry) => Err(CacheError::Catalog(format!(
                "asset '{}' is stored outside {}: {}",
                entry.key,
                cache_dir.display(),
                entry.local_path.display()
            ))),
            None => Ok(()),
        }
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a AssetConfig;
    type IntoIter = std::slice::Iter<'a, AssetConfig>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
