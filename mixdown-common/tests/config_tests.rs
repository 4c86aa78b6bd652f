//! Configuration resolution tests
//!
//! Covers option priority (overrides > config file > defaults), TOML parsing
//! and validation of out-of-range values.

use mixdown_common::config::{
    load_toml_config, ConfigOverrides, MergeConfig, TomlConfig, WorkerCount,
};
use mixdown_common::Bitrate;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn write_config(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("config.toml");
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_toml_values_override_defaults() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
input_dir = "/music/inbox"
output = "mix.mp3"
workers = 3
bitrate = "128k"
sample_rate = 48000
channels = 1
spill_interval = 5
spill_threshold_mb = 8

[logging]
level = "debug"
"#,
    );

    let file = load_toml_config(Some(&path)).unwrap();
    assert_eq!(file.logging.level, "debug");

    let config = MergeConfig::resolve(ConfigOverrides::default(), &file).unwrap();
    assert_eq!(config.input_dir, PathBuf::from("/music/inbox"));
    assert_eq!(config.output, PathBuf::from("mix.mp3"));
    assert_eq!(config.workers, WorkerCount::Fixed(3));
    assert_eq!(config.bitrate.kbps(), 128);
    assert_eq!(config.target.sample_rate(), 48000);
    assert_eq!(config.target.channels(), 1);
    assert_eq!(config.spill.interval, 5);
    assert_eq!(config.spill.threshold_bytes, 8 * 1024 * 1024);
}

#[test]
fn test_overrides_take_priority_over_toml() {
    let file = TomlConfig {
        output: Some(PathBuf::from("from-file.mp3")),
        bitrate: Some(Bitrate::from_kbps(128).unwrap()),
        workers: Some(2),
        ..Default::default()
    };
    let overrides = ConfigOverrides {
        output: Some(PathBuf::from("from-cli.mp3")),
        bitrate: Some(Bitrate::from_kbps(320).unwrap()),
        ..Default::default()
    };

    let config = MergeConfig::resolve(overrides, &file).unwrap();
    assert_eq!(config.output, PathBuf::from("from-cli.mp3"));
    assert_eq!(config.bitrate.kbps(), 320);
    // Not overridden: falls through to the file value
    assert_eq!(config.workers, WorkerCount::Fixed(2));
}

#[test]
fn test_partial_toml_keeps_defaults() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "channels = 1\n");

    let file = load_toml_config(Some(&path)).unwrap();
    assert_eq!(file.logging.level, "info");

    let config = MergeConfig::resolve(ConfigOverrides::default(), &file).unwrap();
    assert_eq!(config.target.channels(), 1);
    assert_eq!(config.target.sample_rate(), 44100);
    assert_eq!(config.output, PathBuf::from("combined.mp3"));
}

#[test]
fn test_invalid_bitrate_in_toml_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "bitrate = \"100k\"\n");

    assert!(load_toml_config(Some(&path)).is_err());
}

#[test]
fn test_missing_explicit_config_is_an_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.toml");

    let err = load_toml_config(Some(&missing)).unwrap_err();
    assert!(err.to_string().contains("config file not found"));
}

#[test]
fn test_invalid_channel_count_is_rejected() {
    let overrides = ConfigOverrides {
        channels: Some(6),
        ..Default::default()
    };
    let err = MergeConfig::resolve(overrides, &TomlConfig::default()).unwrap_err();
    assert!(err.to_string().contains("channel count"));
}

#[test]
fn test_zero_spill_interval_is_rejected() {
    let overrides = ConfigOverrides {
        spill_interval: Some(0),
        ..Default::default()
    };
    assert!(MergeConfig::resolve(overrides, &TomlConfig::default()).is_err());
}
