//! mixdown - batch audio normalizer and concatenator
//!
//! Scans a directory for audio files, transcodes them in parallel to a common
//! sample rate and channel layout, and merges them in path order into one MP3
//! while keeping decoded audio in memory bounded.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mixdown::audio::{AudioCodec, SymphoniaCodec};
use mixdown::progress::{ConsoleProgress, ProgressSink};
use mixdown::{RunOutcome, RunSummary};
use mixdown_common::config::{load_toml_config, MergeConfig};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let file_config =
        load_toml_config(args.config.as_deref()).context("Failed to load config file")?;

    // RUST_LOG wins over --log-level, which wins over the config file
    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| file_config.logging.level.clone());
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(&level))
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        git = env!("GIT_HASH"),
        built = env!("BUILD_TIMESTAMP"),
        profile = env!("BUILD_PROFILE"),
        "Starting mixdown"
    );

    let config =
        MergeConfig::resolve(args.overrides(), &file_config).context("Invalid configuration")?;
    info!(
        input = %config.input_dir.display(),
        output = %config.output.display(),
        bitrate = %config.bitrate,
        target = %config.target,
        "Resolved configuration"
    );

    let codec: Arc<dyn AudioCodec> = Arc::new(SymphoniaCodec::new());
    let progress: Arc<dyn ProgressSink> = Arc::new(ConsoleProgress::new());

    let summary = mixdown::run(&config, codec, progress)
        .await
        .context("Merge failed")?;

    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    if !summary.files_by_format.is_empty() {
        let formats: Vec<String> = summary
            .files_by_format
            .iter()
            .map(|(ext, count)| format!("{count} {ext}"))
            .collect();
        println!("Found {} file(s): {}", summary.files_found, formats.join(", "));
    }

    for failure in &summary.transcode_failures {
        eprintln!("Skipped {}: {}", failure.path.display(), failure.source);
    }

    match &summary.outcome {
        RunOutcome::Completed { output, merge } => {
            for failure in &merge.segment_failures {
                eprintln!("Skipped {}: {}", failure.path.display(), failure.source);
            }
            println!(
                "Completed: merged {} of {} file(s) into {} ({:.1}s of audio, {} spill cycle(s), {} worker(s)) in {:.1?}",
                merge.segments_merged,
                summary.files_found,
                output.display(),
                merge.duration_seconds,
                merge.spills,
                summary.worker_count,
                summary.elapsed,
            );
        }
        RunOutcome::NothingToMerge { reason } => {
            println!("Nothing to merge: {reason}");
        }
    }
}
