//! Core audio data types
//!
//! **Format:**
//! - Samples are f32 (floating point -1.0 to 1.0)
//! - Interleaved by frame: [L, R, L, R, ...] for stereo, [M, M, ...] for mono

/// Decoded PCM audio held in memory
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    /// Interleaved samples
    pub samples: Vec<f32>,

    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Channel count (interleave stride)
    pub channels: u16,
}

impl PcmBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    /// Number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }

    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }

    /// In-memory size of the sample data
    pub fn byte_len(&self) -> usize {
        self.samples.len() * std::mem::size_of::<f32>()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Whether this buffer already has the given rate and layout
    pub fn matches(&self, sample_rate: u32, channels: u16) -> bool {
        self.sample_rate == sample_rate && self.channels == channels
    }

    /// Append another buffer with the same rate and layout.
    ///
    /// Returns `false` (leaving `self` untouched) on a format mismatch.
    pub fn append(&mut self, other: &PcmBuffer) -> bool {
        if !self.matches(other.sample_rate, other.channels) {
            return false;
        }
        self.samples.extend_from_slice(&other.samples);
        true
    }

    /// Convert to `channels` output channels.
    ///
    /// - N -> 1: average of all channels
    /// - 1 -> 2: duplicate the mono channel
    /// - N -> 2 (N > 2): keep the front left/right pair
    pub fn remix(self, channels: u16) -> PcmBuffer {
        let from = self.channels as usize;
        let to = channels as usize;
        if from == to || from == 0 || to == 0 {
            return self;
        }

        let frames = self.frames();
        let mut out = Vec::with_capacity(frames * to);

        for frame in self.samples.chunks_exact(from) {
            if to == 1 {
                let sum: f32 = frame.iter().sum();
                out.push(sum / from as f32);
            } else if from == 1 {
                out.extend(std::iter::repeat(frame[0]).take(to));
            } else {
                out.extend_from_slice(&frame[..to.min(from)]);
                // Pad with the last kept channel if the source is narrower
                for _ in from..to {
                    out.push(frame[from - 1]);
                }
            }
        }

        PcmBuffer {
            samples: out,
            sample_rate: self.sample_rate,
            channels,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_and_duration() {
        let buf = PcmBuffer::new(vec![0.0; 88200], 44100, 2);
        assert_eq!(buf.frames(), 44100);
        assert!((buf.duration_seconds() - 1.0).abs() < 1e-9);
        assert_eq!(buf.byte_len(), 88200 * 4);
    }

    #[test]
    fn test_remix_stereo_to_mono_averages() {
        let buf = PcmBuffer::new(vec![1.0, 0.0, 0.5, 0.5], 8000, 2);
        let mono = buf.remix(1);
        assert_eq!(mono.channels, 1);
        assert_eq!(mono.samples, vec![0.5, 0.5]);
    }

    #[test]
    fn test_remix_mono_to_stereo_duplicates() {
        let buf = PcmBuffer::new(vec![0.1, 0.2, 0.3], 8000, 1);
        let stereo = buf.remix(2);
        assert_eq!(stereo.channels, 2);
        assert_eq!(stereo.samples, vec![0.1, 0.1, 0.2, 0.2, 0.3, 0.3]);
    }

    #[test]
    fn test_remix_surround_to_stereo_keeps_front_pair() {
        // 2 frames of 6-channel audio
        let buf = PcmBuffer::new(
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0],
            48000,
            6,
        );
        let stereo = buf.remix(2);
        assert_eq!(stereo.samples, vec![1.0, 2.0, 7.0, 8.0]);
    }

    #[test]
    fn test_remix_same_layout_is_identity() {
        let buf = PcmBuffer::new(vec![0.1, 0.2], 8000, 2);
        assert_eq!(buf.clone().remix(2), buf);
    }

    #[test]
    fn test_append_rejects_mismatched_format() {
        let mut a = PcmBuffer::new(vec![0.1, 0.2], 8000, 2);
        let b = PcmBuffer::new(vec![0.3], 8000, 1);
        assert!(!a.append(&b));
        assert_eq!(a.samples.len(), 2);

        let c = PcmBuffer::new(vec![0.3, 0.4], 8000, 2);
        assert!(a.append(&c));
        assert_eq!(a.samples, vec![0.1, 0.2, 0.3, 0.4]);
    }
}
