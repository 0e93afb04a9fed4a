use std::path::Path;
use std::time::Duration;

use note_cache::catalog::Clef;
use note_cache::{
    AssetCache, AssetDomain, CacheConfig, FetchConfig, HealthStatus, ImageSource,
    NoteProximityPolicy, PianoSoundResolver, Pitch, ProgressSnapshot, SoundCue,
    StaffImageResolver,
};
use serde::Serialize;
use tracing::{info, warn};
use url::Url;

use crate::cli::{CliArgs, Command};
use crate::error::AppError;
use crate::progress::ProgressManager;

/// One cache per selected domain, each in its own directory below `root`.
pub fn build_caches(
    args: &CliArgs,
    root: &Path,
    progress: &ProgressManager,
) -> Result<Vec<(AssetDomain, AssetCache)>, AppError> {
    // Only `health` is allowed to start repairs; other commands use the
    // health check as a plain disk scan.
    let repair = matches!(args.command, Command::Health);

    args.domain
        .domains()
        .into_iter()
        .map(|domain| -> Result<_, AppError> {
            let base_url = base_url_for(args, domain)?;
            let catalog = domain.catalog(&base_url, root, &NoteProximityPolicy)?;

            let fetch = FetchConfig {
                timeout: Duration::from_secs(args.timeout),
                max_retries: args.retries,
                min_valid_size: args.min_size,
                ..FetchConfig::default()
            };
            let mut config = CacheConfig::builder()
                .with_cache_dir(domain.cache_dir(root))
                .with_max_concurrent_downloads(args.concurrency)
                .with_fetch_config(fetch);
            if !repair {
                config = config.with_health_threshold_percent(0);
            }

            let mut builder = AssetCache::builder(catalog, config.build()).name(domain.name());
            if let Some(handler) = progress.handler(domain.name()) {
                builder = builder.on_event(handler);
            }
            Ok((domain, builder.build()?))
        })
        .collect()
}

fn base_url_for(args: &CliArgs, domain: AssetDomain) -> Result<Url, AppError> {
    let custom = match domain {
        AssetDomain::StaffImages => args.image_base_url.as_deref(),
        AssetDomain::PianoAudio => args.audio_base_url.as_deref(),
    };
    let raw = custom.unwrap_or(domain.default_base_url());
    Url::parse(raw).map_err(|e| AppError::InvalidInput(format!("invalid base URL '{raw}': {e}")))
}

#[derive(Debug, Serialize)]
struct DomainStatus {
    domain: &'static str,
    dir: String,
    status: HealthStatus,
    progress: ProgressSnapshot,
}

pub async fn run(command: &Command, caches: &[(AssetDomain, AssetCache)]) -> Result<(), AppError> {
    match command {
        Command::Sync => {
            let mut failed = 0;
            for (domain, cache) in caches {
                let progress = cache.initialize().await?;
                print_progress(domain.name(), &progress);
                failed += progress.failed;
            }
            ensure_complete(failed)
        }
        Command::Preload { min_priority } => {
            for (domain, cache) in caches {
                let progress = cache.preload_by_priority(*min_priority).await?;
                print_progress(domain.name(), &progress);
            }
            Ok(())
        }
        Command::Status { json } => {
            let mut statuses = Vec::with_capacity(caches.len());
            for (domain, cache) in caches {
                let report = cache.perform_health_check().await;
                statuses.push(DomainStatus {
                    domain: domain.name(),
                    dir: cache.cache_dir().display().to_string(),
                    status: report.status,
                    progress: report.progress,
                });
            }

            if *json {
                println!("{}", serde_json::to_string_pretty(&statuses)?);
            } else {
                for status in &statuses {
                    print_progress(status.domain, &status.progress);
                    println!("  directory: {}", status.dir);
                }
            }
            Ok(())
        }
        Command::Health => {
            for (domain, cache) in caches {
                let report = cache.perform_health_check().await;
                if report.repair_scheduled > 0 {
                    info!(domain = domain.name(), assets = report.repair_scheduled, "Waiting for repairs");
                    cache.wait_for_background().await;
                }
                println!(
                    "{}: {:?} (demoted {}, restored {}, repaired {})",
                    domain.name(),
                    report.status,
                    report.demoted,
                    report.restored,
                    report.repair_scheduled
                );
                print_progress(domain.name(), &cache.progress());
            }
            Ok(())
        }
        Command::Retry => {
            let mut failed = 0;
            for (domain, cache) in caches {
                let mut progress = cache.initialize().await?;
                if progress.failed > 0 {
                    warn!(domain = domain.name(), failed = progress.failed, "Retrying failed assets");
                    progress = cache.retry_failed().await;
                }
                print_progress(domain.name(), &progress);
                failed += progress.failed;
            }
            ensure_complete(failed)
        }
        Command::Clear => {
            for (domain, cache) in caches {
                cache.clear_cache().await?;
                println!("{}: cleared {}", domain.name(), cache.cache_dir().display());
            }
            Ok(())
        }
        Command::Resolve { key } => resolve(caches, key).await,
    }
}

async fn resolve(caches: &[(AssetDomain, AssetCache)], key: &str) -> Result<(), AppError> {
    for (domain, cache) in caches {
        match domain {
            AssetDomain::StaffImages => {
                let Some((clef, note)) = key.split_once('_') else {
                    continue;
                };
                let clef = match clef {
                    "treble" => Clef::Treble,
                    "bass" => Clef::Bass,
                    _ => continue,
                };
                cache.perform_health_check().await;
                let resolver = StaffImageResolver::new(cache.clone());
                match resolver.resolve(clef, note) {
                    Some(ImageSource::Local(path)) => println!("local {}", path.display()),
                    Some(ImageSource::Remote(url)) => println!("remote {url}"),
                    None => continue,
                }
                return Ok(());
            }
            AssetDomain::PianoAudio => {
                let normalized = key
                    .parse::<Pitch>()
                    .map(|pitch| pitch.key())
                    .unwrap_or_else(|_| key.to_string());
                if !cache.catalog().contains(&normalized) {
                    continue;
                }
                cache.perform_health_check().await;
                match PianoSoundResolver::new(cache.clone()).resolve(key) {
                    SoundCue::Sample(path) => println!("sample {}", path.display()),
                    SoundCue::Haptic => println!("haptic (sample not cached)"),
                }
                return Ok(());
            }
        }
    }

    Err(AppError::InvalidInput(format!("unknown asset key '{key}'")))
}

fn print_progress(name: &str, progress: &ProgressSnapshot) {
    println!(
        "{name}: {}/{} usable, {} failed, {} pending ({}%)",
        progress.success, progress.total, progress.failed, progress.pending, progress.percentage
    );
}

fn ensure_complete(failed: usize) -> Result<(), AppError> {
    if failed > 0 {
        Err(AppError::Incomplete { failed })
    } else {
        Ok(())
    }
}
