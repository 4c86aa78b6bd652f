//! Audio decoder using symphonia
//!
//! Decodes any container/codec symphonia supports (MP3, FLAC, AAC/M4A,
//! Vorbis, WAV) to interleaved f32 PCM at the file's native rate and layout.

use super::codec::CodecError;
use super::types::PcmBuffer;
use std::path::Path;
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::conv::FromSample;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;
use tracing::{debug, warn};

/// Decode an entire audio file.
///
/// Corrupt packets inside an otherwise readable stream are skipped with a
/// warning. A file that yields no audio at all is an error.
pub fn decode_file(path: &Path) -> Result<PcmBuffer, CodecError> {
    debug!(path = %path.display(), "Decoding audio file");

    let file = std::fs::File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| CodecError::Probe(e.to_string()))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(CodecError::NoAudioTrack)?;

    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| CodecError::Decode(format!("failed to create decoder: {e}")))?;

    // Container hints; the first decoded buffer is authoritative
    let mut sample_rate = codec_params.sample_rate;
    let mut channels = codec_params.channels.map(|c| c.count() as u16);
    let mut samples = Vec::new();
    let mut skipped_packets = 0usize;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(CodecError::Decode(format!("error reading packet: {e}"))),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = decoded.spec();
                sample_rate = Some(spec.rate);
                channels = Some(spec.channels.count() as u16);
                append_interleaved_ref(&decoded, &mut samples);
            }
            Err(SymphoniaError::DecodeError(e)) => {
                skipped_packets += 1;
                warn!(path = %path.display(), error = e, "Skipping corrupt packet");
            }
            Err(e) => return Err(CodecError::Decode(e.to_string())),
        }
    }

    let sample_rate = sample_rate.ok_or(CodecError::MissingSampleRate)?;
    let channels = channels.filter(|c| *c > 0).ok_or(CodecError::MissingChannels)?;

    if samples.is_empty() {
        return Err(CodecError::EmptyStream);
    }

    let pcm = PcmBuffer::new(samples, sample_rate, channels);

    debug!(
        path = %path.display(),
        sample_rate,
        channels,
        frames = pcm.frames(),
        skipped_packets,
        "Audio decoding complete"
    );

    Ok(pcm)
}

/// Append a decoded buffer of any sample type to `out`, interleaved as f32
fn append_interleaved_ref(decoded: &AudioBufferRef, out: &mut Vec<f32>) {
    match decoded {
        AudioBufferRef::U8(buf) => append_interleaved(buf, out),
        AudioBufferRef::U16(buf) => append_interleaved(buf, out),
        AudioBufferRef::U24(buf) => append_interleaved(buf, out),
        AudioBufferRef::U32(buf) => append_interleaved(buf, out),
        AudioBufferRef::S8(buf) => append_interleaved(buf, out),
        AudioBufferRef::S16(buf) => append_interleaved(buf, out),
        AudioBufferRef::S24(buf) => append_interleaved(buf, out),
        AudioBufferRef::S32(buf) => append_interleaved(buf, out),
        AudioBufferRef::F32(buf) => append_interleaved(buf, out),
        AudioBufferRef::F64(buf) => append_interleaved(buf, out),
    }
}

fn append_interleaved<S>(buf: &AudioBuffer<S>, out: &mut Vec<f32>)
where
    S: Sample,
    f32: FromSample<S>,
{
    let num_channels = buf.spec().channels.count();
    let num_frames = buf.frames();
    out.reserve(num_frames * num_channels);

    for frame_idx in 0..num_frames {
        for ch_idx in 0..num_channels {
            out.push(f32::from_sample(buf.chan(ch_idx)[frame_idx]));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_file_not_found() {
        let result = decode_file(Path::new("/nonexistent/file.mp3"));
        assert!(matches!(result, Err(CodecError::Io(_))));
    }

    #[test]
    fn test_decode_garbage_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("broken.mp3");
        std::fs::write(&path, b"this is definitely not an audio stream").unwrap();

        assert!(decode_file(&path).is_err());
    }
}
