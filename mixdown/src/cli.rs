//! Command-line arguments
//!
//! Every option can also be set through a `MIXDOWN_*` environment variable or
//! the TOML config file; see [`mixdown_common::config`] for precedence.

use clap::Parser;
use mixdown_common::config::ConfigOverrides;
use mixdown_common::Bitrate;
use std::path::PathBuf;

/// Command-line arguments for mixdown
#[derive(Parser, Debug)]
#[command(name = "mixdown")]
#[command(about = "Normalize a directory of audio files and concatenate them into one MP3")]
#[command(version)]
pub struct Args {
    /// Directory containing the audio files to merge [default: songs/]
    #[arg(short = 'd', long = "dir", env = "MIXDOWN_INPUT_DIR")]
    pub input_dir: Option<PathBuf>,

    /// Output file [default: combined.mp3]
    #[arg(short, long, env = "MIXDOWN_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Transcode workers [default: sized from input volume and CPU count]
    #[arg(short, long, env = "MIXDOWN_WORKERS")]
    pub workers: Option<usize>,

    /// Output bitrate, e.g. 192k [default: 192k]
    #[arg(short, long, env = "MIXDOWN_BITRATE")]
    pub bitrate: Option<Bitrate>,

    /// Target sample rate in Hz [default: 44100]
    #[arg(short, long, env = "MIXDOWN_SAMPLE_RATE")]
    pub sample_rate: Option<u32>,

    /// Target channel count, 1 or 2 [default: 2]
    #[arg(
        short,
        long,
        env = "MIXDOWN_CHANNELS",
        value_parser = clap::value_parser!(u16).range(1..=2)
    )]
    pub channels: Option<u16>,

    /// Parent directory for scratch files [default: system temp]
    #[arg(long, env = "MIXDOWN_SCRATCH_DIR")]
    pub scratch_dir: Option<PathBuf>,

    /// Segments merged between spills to disk [default: 10]
    #[arg(long, env = "MIXDOWN_SPILL_INTERVAL")]
    pub spill_interval: Option<usize>,

    /// Decoded audio (MB) held in memory before a forced spill [default: 100]
    #[arg(long, env = "MIXDOWN_SPILL_THRESHOLD_MB")]
    pub spill_threshold_mb: Option<u64>,

    /// Config file [default: <config dir>/mixdown/config.toml]
    #[arg(long, env = "MIXDOWN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log filter, e.g. "debug" or "mixdown=trace" (RUST_LOG takes precedence)
    #[arg(long, env = "MIXDOWN_LOG_LEVEL")]
    pub log_level: Option<String>,
}

impl Args {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            input_dir: self.input_dir.clone(),
            output: self.output.clone(),
            workers: self.workers,
            bitrate: self.bitrate,
            sample_rate: self.sample_rate,
            channels: self.channels,
            scratch_dir: self.scratch_dir.clone(),
            spill_interval: self.spill_interval,
            spill_threshold_mb: self.spill_threshold_mb,
        }
    }
}
