//! Audio Test Fixture Generator
//!
//! Writes short sine-tone WAV files so tests can tell segments apart by level

use std::path::{Path, PathBuf};

/// Configuration for generated audio
#[derive(Debug, Clone)]
pub struct AudioConfig {
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    /// Peak amplitude of the tone (0.0..=1.0)
    pub amplitude: f32,
    pub frequency: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            duration_seconds: 0.5,
            sample_rate: 44100,
            channels: 2,
            amplitude: 0.3,
            frequency: 440.0,
        }
    }
}

/// Generate a 16-bit PCM WAV tone
pub fn generate_test_wav(path: &Path, config: &AudioConfig) -> anyhow::Result<PathBuf> {
    let spec = hound::WavSpec {
        channels: config.channels,
        sample_rate: config.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    let total_frames = (config.duration_seconds * config.sample_rate as f64) as usize;

    for i in 0..total_frames {
        let t = i as f32 / config.sample_rate as f32;
        let sample = (config.amplitude
            * (2.0 * std::f32::consts::PI * config.frequency * t).sin()
            * i16::MAX as f32) as i16;

        for _ in 0..config.channels {
            writer.write_sample(sample)?;
        }
    }

    writer.finalize()?;
    Ok(path.to_path_buf())
}

/// Generate `count` files named `track_NNN.wav`, all with the same config
pub fn generate_test_library(
    dir: &Path,
    count: usize,
    config: &AudioConfig,
) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for i in 0..count {
        let file_path = dir.join(format!("track_{:03}.wav", i + 1));
        generate_test_wav(&file_path, config)?;
        files.push(file_path);
    }

    Ok(files)
}

/// Root mean square of a sample slice
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_generate_simple_wav() {
        let temp_dir = TempDir::new().unwrap();
        let wav_path = temp_dir.path().join("test.wav");

        generate_test_wav(&wav_path, &AudioConfig::default()).unwrap();

        let reader = hound::WavReader::open(&wav_path).unwrap();
        assert_eq!(reader.spec().channels, 2);
        assert_eq!(reader.duration(), 22050);
    }
}
