use clap::Parser;
use error::AppError;
use indicatif::MultiProgress;
use note_cache::CacheConfig;
use tracing::{Level, debug, error, info};
use tracing_subscriber::FmtSubscriber;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};

mod cli;
mod commands;
mod error;
mod progress;

use cli::{CliArgs, Command};
use progress::ProgressManager;

fn main() {
    if let Err(e) = bootstrap() {
        eprintln!("Error: {e}");
        // Log the full error for debugging
        error!(error = ?e, "Application failed");
        std::process::exit(1);
    }
}

#[tokio::main]
async fn bootstrap() -> Result<(), AppError> {
    // Parse command-line arguments
    let args = CliArgs::parse();

    let show_progress = !args.no_progress
        && matches!(
            args.command,
            Command::Sync | Command::Preload { .. } | Command::Health | Command::Retry
        );

    // Setup logging. Progress bars own the terminal unless verbose output
    // was asked for.
    let log_level = if args.verbose {
        Level::DEBUG
    } else if show_progress {
        Level::WARN
    } else {
        Level::INFO
    };

    let writer = match &args.log_file {
        Some(path) => {
            let log_file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            BoxMakeWriter::new(MakeWriterExt::and(std::io::stderr, log_file))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(writer)
        .with_ansi(args.log_file.is_none())
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| AppError::Initialization(e.to_string()))?;

    let root = args
        .cache_dir
        .clone()
        .unwrap_or_else(|| CacheConfig::default().cache_dir);
    info!(root = %root.display(), command = ?args.command, "note-cache starting");

    let multi = MultiProgress::new();
    let progress_manager = if show_progress {
        ProgressManager::new(multi)
    } else {
        ProgressManager::new_disabled(multi)
    };
    debug!(progress = !progress_manager.is_disabled(), "Progress reporting configured");

    let caches = commands::build_caches(&args, &root, &progress_manager)?;
    let result = commands::run(&args.command, &caches).await;
    progress_manager.finish();
    result
}
