use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use note_cache::AssetDomain;

/// Define CLI arguments
#[derive(Parser)]
#[command(
    name = "note-cache",
    version,
    about = "Download and maintain the staff image and piano sample cache",
    long_about = "Fetches the staff-notation images and piano samples used by the quiz app\n\
                  into a local cache directory, reports what is usable and repairs\n\
                  missing or truncated files."
)]
pub struct CliArgs {
    /// Root directory of the cache
    #[arg(
        long,
        global = true,
        help = "Cache root directory (default: <system temp>/note-cache)"
    )]
    pub cache_dir: Option<PathBuf>,

    /// Asset domain to operate on
    #[arg(long, global = true, value_enum, default_value = "all")]
    pub domain: DomainArg,

    #[arg(long, global = true, help = "Override the staff image base URL")]
    pub image_base_url: Option<String>,

    #[arg(long, global = true, help = "Override the piano sample base URL")]
    pub audio_base_url: Option<String>,

    /// Concurrent downloads per priority band
    #[arg(long, global = true, default_value = "5")]
    pub concurrency: usize,

    /// Retries after the first failed attempt
    #[arg(long, global = true, default_value = "3")]
    pub retries: u32,

    /// Per-request timeout in seconds
    #[arg(
        long,
        global = true,
        default_value = "30",
        help = "Timeout in seconds for a single asset request (0 disables)"
    )]
    pub timeout: u64,

    /// Smallest file size in bytes accepted as a valid asset
    #[arg(long, global = true, default_value = "1024")]
    pub min_size: u64,

    /// Disable progress bars
    #[arg(long, global = true)]
    pub no_progress: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true, help = "Enable detailed debug logging")]
    pub verbose: bool,

    /// Also write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Download every missing asset
    Sync,
    /// Download only assets at or above a priority
    Preload {
        #[arg(long, default_value_t = 10)]
        min_priority: u8,
    },
    /// Report what is usable on disk
    Status {
        #[arg(long, help = "Print machine-readable JSON")]
        json: bool,
    },
    /// Validate files on disk and repair a degraded cache
    Health,
    /// Sync, then give failed assets one more full retry pass
    Retry,
    /// Delete the cache directory
    Clear,
    /// Show where an asset would be loaded from
    Resolve {
        /// Asset key, e.g. `treble_C4` or `c#4`
        key: String,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainArg {
    Images,
    Audio,
    All,
}

impl DomainArg {
    pub fn domains(self) -> Vec<AssetDomain> {
        match self {
            DomainArg::Images => vec![AssetDomain::StaffImages],
            DomainArg::Audio => vec![AssetDomain::PianoAudio],
            DomainArg::All => AssetDomain::ALL.to_vec(),
        }
    }
}
