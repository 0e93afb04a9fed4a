use std::path::Path;

use tracing::debug;
use url::Url;

use super::pitch::Pitch;
use super::priority::PriorityPolicy;
use super::types::{AssetConfig, Catalog, safe_file_name};
use crate::error::CacheError;

/// Catalog of the 88 piano samples, A0 to C8.
///
/// Keys are lowercase note names (`a#0`). The remote file keeps the `#`
/// (`a%230.mp3` on the wire), the local copy is `as0.mp3`.
pub fn piano_catalog(
    base_url: &Url,
    cache_dir: &Path,
    policy: &dyn PriorityPolicy,
) -> Result<Catalog, CacheError> {
    let entries = Pitch::piano_keys()
        .map(|pitch| {
            let key = pitch.key();
            let remote_name = format!("{key}.mp3");
            let local_name = safe_file_name(&remote_name);
            AssetConfig::from_names(
                key,
                remote_name,
                local_name,
                base_url,
                cache_dir,
                policy.priority(&pitch),
            )
        })
        .collect::<Result<Vec<_>, _>>()?;

    let catalog = Catalog::new(entries)?;
    debug!(assets = catalog.len(), "Generated piano audio catalog");
    Ok(catalog)
}
