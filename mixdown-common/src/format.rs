//! Audio format descriptors shared by every stage of a run

use crate::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Default output bitrate in kbps ("192k")
pub const DEFAULT_BITRATE_KBPS: u16 = 192;

/// Default normalization sample rate in Hz
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Default normalization channel count (stereo)
pub const DEFAULT_CHANNELS: u16 = 2;

/// Constant bitrates accepted by MPEG layer III encoders, in kbps
pub const SUPPORTED_BITRATES_KBPS: [u16; 16] = [
    8, 16, 24, 32, 40, 48, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320,
];

/// Constant bitrate applied to every spill and to the final encode.
///
/// Parsed from `"192k"`, `"192K"` or `"192"`; displayed as `"192k"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct Bitrate(u16);

impl Bitrate {
    /// Create a bitrate from a kbps value
    pub fn from_kbps(kbps: u16) -> Result<Self> {
        if SUPPORTED_BITRATES_KBPS.contains(&kbps) {
            Ok(Self(kbps))
        } else {
            Err(Error::InvalidInput(format!(
                "unsupported bitrate {}k (expected one of {})",
                kbps,
                SUPPORTED_BITRATES_KBPS
                    .iter()
                    .map(|b| format!("{b}k"))
                    .collect::<Vec<_>>()
                    .join(", ")
            )))
        }
    }

    pub fn kbps(self) -> u16 {
        self.0
    }
}

impl Default for Bitrate {
    fn default() -> Self {
        Self(DEFAULT_BITRATE_KBPS)
    }
}

impl FromStr for Bitrate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_suffix('k')
            .or_else(|| trimmed.strip_suffix('K'))
            .unwrap_or(trimmed);
        let kbps = digits
            .parse::<u16>()
            .map_err(|_| Error::InvalidInput(format!("invalid bitrate: {s:?}")))?;
        Self::from_kbps(kbps)
    }
}

impl TryFrom<String> for Bitrate {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl fmt::Display for Bitrate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}k", self.0)
    }
}

/// Common sample rate and channel count every input is converted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NormalizationTarget {
    sample_rate: u32,
    channels: u16,
}

impl NormalizationTarget {
    /// Validate and build a target. Sample rate must be positive and the
    /// channel count must be 1 (mono) or 2 (stereo).
    pub fn new(sample_rate: u32, channels: u16) -> Result<Self> {
        if sample_rate == 0 {
            return Err(Error::InvalidInput(
                "sample rate must be a positive number of Hz".to_string(),
            ));
        }
        if !matches!(channels, 1 | 2) {
            return Err(Error::InvalidInput(format!(
                "channel count must be 1 or 2, got {channels}"
            )));
        }
        Ok(Self {
            sample_rate,
            channels,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }
}

impl Default for NormalizationTarget {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: DEFAULT_CHANNELS,
        }
    }
}

impl fmt::Display for NormalizationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let layout = if self.channels == 1 { "mono" } else { "stereo" };
        write!(f, "{} Hz {}", self.sample_rate, layout)
    }
}
