//! File encoders: lossless WAV intermediates and constant-bitrate MP3
//!
//! WAV files are written as 32-bit float so an intermediate carries the
//! decoded f32 samples without loss. MP3 encoding goes through LAME.

use super::codec::CodecError;
use super::types::PcmBuffer;
use mixdown_common::Bitrate;
use mp3lame_encoder::{Builder, FlushNoGap, InterleavedPcm, MonoPcm, Quality};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Frames handed to LAME per encode call
const ENCODE_CHUNK_FRAMES: usize = 1152 * 64;

/// Write `pcm` as a 32-bit float WAV file
pub fn write_wav(pcm: &PcmBuffer, path: &Path) -> Result<(), CodecError> {
    let spec = hound::WavSpec {
        channels: pcm.channels,
        sample_rate: pcm.sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    for sample in &pcm.samples {
        writer.write_sample(*sample)?;
    }
    writer.finalize()?;

    debug!(path = %path.display(), frames = pcm.frames(), "Wrote WAV intermediate");
    Ok(())
}

/// Encode `pcm` to a constant-bitrate MP3 file
pub fn write_mp3(pcm: &PcmBuffer, path: &Path, bitrate: Bitrate) -> Result<(), CodecError> {
    let channels = pcm.channels as usize;
    if !matches!(channels, 1 | 2) {
        return Err(CodecError::UnsupportedChannels(pcm.channels));
    }

    let mut lame = create_encoder(pcm.sample_rate, pcm.channels as u8, bitrate)?;

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let mut mp3_buffer: Vec<u8> = Vec::new();

    for chunk in pcm.samples.chunks(ENCODE_CHUNK_FRAMES * channels) {
        let num_frames = chunk.len() / channels;
        // LAME recommendation: 1.25 * num_samples + 7200 bytes
        let estimated_size = ((num_frames as f64) * 1.25 + 7200.0) as usize;
        mp3_buffer.clear();
        mp3_buffer.reserve(estimated_size);

        let result = if channels == 1 {
            lame.encode(MonoPcm(chunk), mp3_buffer.spare_capacity_mut())
        } else {
            lame.encode(InterleavedPcm(chunk), mp3_buffer.spare_capacity_mut())
        };
        let bytes_written = result.map_err(|e| CodecError::Encode(format!("{e:?}")))?;

        // SAFETY: LAME guarantees it wrote exactly `bytes_written` bytes.
        unsafe {
            mp3_buffer.set_len(bytes_written);
        }
        writer.write_all(&mp3_buffer)?;
    }

    mp3_buffer.clear();
    mp3_buffer.reserve(7200);
    let bytes_written = lame
        .flush::<FlushNoGap>(mp3_buffer.spare_capacity_mut())
        .map_err(|e| CodecError::Encode(format!("{e:?}")))?;
    // SAFETY: as above, for the flush call.
    unsafe {
        mp3_buffer.set_len(bytes_written);
    }
    writer.write_all(&mp3_buffer)?;
    writer.flush()?;

    debug!(
        path = %path.display(),
        frames = pcm.frames(),
        bitrate = %bitrate,
        "Wrote MP3"
    );
    Ok(())
}

/// Creates and configures a new LAME encoder instance.
fn create_encoder(
    sample_rate: u32,
    channels: u8,
    bitrate: Bitrate,
) -> Result<mp3lame_encoder::Encoder, CodecError> {
    let mut builder = Builder::new()
        .ok_or_else(|| CodecError::Encode("failed to create LAME encoder builder".to_string()))?;
    builder
        .set_num_channels(channels)
        .map_err(|e| CodecError::Encode(format!("failed to set channel count: {e:?}")))?;
    builder
        .set_sample_rate(sample_rate)
        .map_err(|e| CodecError::Encode(format!("failed to set sample rate: {e:?}")))?;
    builder
        .set_brate(lame_bitrate(bitrate)?)
        .map_err(|e| CodecError::Encode(format!("failed to set bitrate: {e:?}")))?;
    builder
        .set_quality(Quality::Good)
        .map_err(|e| CodecError::Encode(format!("failed to set encoding quality: {e:?}")))?;

    builder
        .build()
        .map_err(|e| CodecError::Encode(format!("failed to build LAME encoder: {e:?}")))
}

fn lame_bitrate(bitrate: Bitrate) -> Result<mp3lame_encoder::Bitrate, CodecError> {
    use mp3lame_encoder::Bitrate as Lame;

    Ok(match bitrate.kbps() {
        8 => Lame::Kbps8,
        16 => Lame::Kbps16,
        24 => Lame::Kbps24,
        32 => Lame::Kbps32,
        40 => Lame::Kbps40,
        48 => Lame::Kbps48,
        64 => Lame::Kbps64,
        80 => Lame::Kbps80,
        96 => Lame::Kbps96,
        112 => Lame::Kbps112,
        128 => Lame::Kbps128,
        160 => Lame::Kbps160,
        192 => Lame::Kbps192,
        224 => Lame::Kbps224,
        256 => Lame::Kbps256,
        320 => Lame::Kbps320,
        other => {
            return Err(CodecError::Encode(format!(
                "bitrate {other}k is not supported by the MP3 encoder"
            )))
        }
    })
}
