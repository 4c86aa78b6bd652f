//! Codec capability used by the transcoder and the merger
//!
//! The core never talks to symphonia, rubato or LAME directly. It goes
//! through [`AudioCodec`], so a run can be driven by a different backend
//! (tests use an in-memory one).

use super::types::PcmBuffer;
use super::{decoder, encoder, resampler::Resampler};
use mixdown_common::{Bitrate, NormalizationTarget};
use std::path::Path;
use thiserror::Error;

/// Errors raised by the codec backend
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Container format not recognized
    #[error("unrecognized audio format: {0}")]
    Probe(String),

    #[error("no audio track found")]
    NoAudioTrack,

    #[error("stream does not advertise a sample rate")]
    MissingSampleRate,

    #[error("stream does not advertise a channel layout")]
    MissingChannels,

    /// Stream opened but produced no samples
    #[error("stream contains no decodable audio")]
    EmptyStream,

    #[error("decode error: {0}")]
    Decode(String),

    #[error("resample error: {0}")]
    Resample(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("unsupported channel count for encoding: {0}")]
    UnsupportedChannels(u16),

    /// The worker running this call panicked or was cancelled
    #[error("worker aborted: {0}")]
    WorkerAborted(String),
}

/// Output encoding for [`AudioCodec::export`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Lossless intermediate
    Wav,
    /// Compressed output at a constant bitrate
    Mp3 { bitrate: Bitrate },
}

/// Decode / resample / remix / encode service.
///
/// Implementations must be callable from several worker threads at once;
/// each call is independent and shares no buffers with other calls.
pub trait AudioCodec: Send + Sync {
    /// Decode a whole file at its native rate and layout
    fn decode(&self, path: &Path) -> Result<PcmBuffer, CodecError>;

    /// Resample and remix to `target`. A buffer already in the target format
    /// is returned unchanged.
    fn normalize(&self, pcm: PcmBuffer, target: NormalizationTarget)
        -> Result<PcmBuffer, CodecError>;

    /// Encode `pcm` to `path`, replacing any existing file
    fn export(&self, pcm: &PcmBuffer, path: &Path, format: ExportFormat)
        -> Result<(), CodecError>;
}

/// Production codec: symphonia decode, rubato resample, hound WAV, LAME MP3
#[derive(Debug, Default, Clone, Copy)]
pub struct SymphoniaCodec;

impl SymphoniaCodec {
    pub fn new() -> Self {
        Self
    }
}

impl AudioCodec for SymphoniaCodec {
    fn decode(&self, path: &Path) -> Result<PcmBuffer, CodecError> {
        decoder::decode_file(path)
    }

    fn normalize(
        &self,
        pcm: PcmBuffer,
        target: NormalizationTarget,
    ) -> Result<PcmBuffer, CodecError> {
        if pcm.matches(target.sample_rate(), target.channels()) {
            return Ok(pcm);
        }

        // Remix first when narrowing so the resampler processes fewer channels
        let pcm = if pcm.channels > target.channels() {
            pcm.remix(target.channels())
        } else {
            pcm
        };

        let pcm = if pcm.sample_rate != target.sample_rate() {
            let samples = Resampler::resample(
                &pcm.samples,
                pcm.sample_rate,
                target.sample_rate(),
                pcm.channels,
            )?;
            PcmBuffer::new(samples, target.sample_rate(), pcm.channels)
        } else {
            pcm
        };

        Ok(pcm.remix(target.channels()))
    }

    fn export(
        &self,
        pcm: &PcmBuffer,
        path: &Path,
        format: ExportFormat,
    ) -> Result<(), CodecError> {
        match format {
            ExportFormat::Wav => encoder::write_wav(pcm, path),
            ExportFormat::Mp3 { bitrate } => encoder::write_mp3(pcm, path, bitrate),
        }
    }
}
