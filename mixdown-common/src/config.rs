//! Configuration loading and option resolution
//!
//! Each option is resolved in priority order:
//! 1. Command-line argument or environment variable (both arrive as overrides)
//! 2. TOML config file
//! 3. Compiled default

use crate::format::{Bitrate, NormalizationTarget, DEFAULT_CHANNELS, DEFAULT_SAMPLE_RATE};
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default input directory
pub const DEFAULT_INPUT_DIR: &str = "songs/";

/// Default output file
pub const DEFAULT_OUTPUT: &str = "combined.mp3";

/// Segments absorbed between forced spill/reload cycles
pub const DEFAULT_SPILL_INTERVAL: usize = 10;

/// Decoded-audio size that forces a spill, in MB
pub const DEFAULT_SPILL_THRESHOLD_MB: u64 = 100;

/// Default log filter when neither RUST_LOG nor the config file sets one
pub const DEFAULT_LOG_LEVEL: &str = "info";

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Logging section of the TOML config file
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

/// Contents of `config.toml`. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub input_dir: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub workers: Option<usize>,
    pub bitrate: Option<Bitrate>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
    pub scratch_dir: Option<PathBuf>,
    pub spill_interval: Option<usize>,
    pub spill_threshold_mb: Option<u64>,
    pub logging: LoggingConfig,
}

/// Location of the per-user config file (`<config dir>/mixdown/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("mixdown").join("config.toml"))
}

/// Load the TOML config file.
///
/// An explicitly requested file must exist and parse. The per-user default
/// file is optional: when it is absent, compiled defaults apply.
pub fn load_toml_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(Error::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        return parse_toml_file(path);
    }

    match default_config_path() {
        Some(path) if path.is_file() => parse_toml_file(&path),
        Some(path) => {
            debug!(path = %path.display(), "No config file, using defaults");
            Ok(TomlConfig::default())
        }
        None => Ok(TomlConfig::default()),
    }
}

fn parse_toml_file(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;
    let config: TomlConfig = toml::from_str(&content)?;
    info!(path = %path.display(), "Loaded config file");
    Ok(config)
}

/// Parallelism requested for the transcode phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkerCount {
    /// Size the pool from input volume and available cores
    #[default]
    Auto,
    /// Use exactly this many workers
    Fixed(usize),
}

impl WorkerCount {
    /// Build from an optional explicit count. Explicit values are floored to 1.
    pub fn from_option(explicit: Option<usize>) -> Self {
        match explicit {
            Some(n) => Self::Fixed(n.max(1)),
            None => Self::Auto,
        }
    }
}

/// When the merge buffer is flushed to disk and reloaded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpillPolicy {
    /// Spill after every N absorbed segments
    pub interval: usize,
    /// Spill whenever the decoded buffer exceeds this many bytes
    pub threshold_bytes: usize,
}

impl SpillPolicy {
    pub fn new(interval: usize, threshold_bytes: usize) -> Result<Self> {
        if interval == 0 {
            return Err(Error::InvalidInput(
                "spill interval must be at least 1".to_string(),
            ));
        }
        if threshold_bytes == 0 {
            return Err(Error::InvalidInput(
                "spill threshold must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            interval,
            threshold_bytes,
        })
    }

    /// Whether a buffer holding `absorbed` segments and `buffer_bytes` of
    /// decoded audio must be spilled now
    pub fn should_spill(&self, absorbed: usize, buffer_bytes: usize) -> bool {
        (absorbed > 0 && absorbed % self.interval == 0) || buffer_bytes > self.threshold_bytes
    }
}

impl Default for SpillPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_SPILL_INTERVAL,
            threshold_bytes: (DEFAULT_SPILL_THRESHOLD_MB * BYTES_PER_MB) as usize,
        }
    }
}

/// Values supplied on the command line or through the environment.
/// `None` means "not given", letting the config file or default apply.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub input_dir: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub workers: Option<usize>,
    pub bitrate: Option<Bitrate>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
    pub scratch_dir: Option<PathBuf>,
    pub spill_interval: Option<usize>,
    pub spill_threshold_mb: Option<u64>,
}

/// Fully resolved settings for one run
#[derive(Debug, Clone)]
pub struct MergeConfig {
    pub input_dir: PathBuf,
    pub output: PathBuf,
    pub workers: WorkerCount,
    pub bitrate: Bitrate,
    pub target: NormalizationTarget,
    /// Parent directory for the run's scratch directory (system temp if unset)
    pub scratch_root: Option<PathBuf>,
    pub spill: SpillPolicy,
}

impl MergeConfig {
    /// Resolve every option from overrides, then the config file, then defaults
    pub fn resolve(overrides: ConfigOverrides, file: &TomlConfig) -> Result<Self> {
        let input_dir = overrides
            .input_dir
            .or_else(|| file.input_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_INPUT_DIR));
        let output = overrides
            .output
            .or_else(|| file.output.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));
        let workers = WorkerCount::from_option(overrides.workers.or(file.workers));
        let bitrate = overrides.bitrate.or(file.bitrate).unwrap_or_default();

        let target = NormalizationTarget::new(
            overrides
                .sample_rate
                .or(file.sample_rate)
                .unwrap_or(DEFAULT_SAMPLE_RATE),
            overrides
                .channels
                .or(file.channels)
                .unwrap_or(DEFAULT_CHANNELS),
        )?;

        let spill_threshold_mb = overrides
            .spill_threshold_mb
            .or(file.spill_threshold_mb)
            .unwrap_or(DEFAULT_SPILL_THRESHOLD_MB);
        let threshold_bytes = usize::try_from(spill_threshold_mb.saturating_mul(BYTES_PER_MB))
            .unwrap_or(usize::MAX);
        let spill = SpillPolicy::new(
            overrides
                .spill_interval
                .or(file.spill_interval)
                .unwrap_or(DEFAULT_SPILL_INTERVAL),
            threshold_bytes,
        )?;

        Ok(Self {
            input_dir,
            output,
            workers,
            bitrate,
            target,
            scratch_root: overrides.scratch_dir.or_else(|| file.scratch_dir.clone()),
            spill,
        })
    }

    /// Settings for `input_dir` -> `output` with every other option defaulted
    pub fn with_paths(input_dir: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output: output.into(),
            workers: WorkerCount::Auto,
            bitrate: Bitrate::default(),
            target: NormalizationTarget::default(),
            scratch_root: None,
            spill: SpillPolicy::default(),
        }
    }
}
