//! Per-file transcode into a normalized intermediate
//!
//! Decode → resample → remix → write lossless WAV into scratch storage.
//! A failure affects only the one file; it is returned to the caller as a
//! [`TranscodeError`] and never aborts the batch.

use crate::audio::{AudioCodec, CodecError, ExportFormat};
use crate::services::file_scanner::SourceItem;
use mixdown_common::NormalizationTarget;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// One file that could not be transcoded
#[derive(Debug, Error)]
#[error("failed to transcode {}: {source}", .path.display())]
pub struct TranscodeError {
    pub index: usize,
    pub path: PathBuf,
    #[source]
    pub source: CodecError,
}

/// A normalized, losslessly encoded copy of one source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntermediateArtifact {
    /// Position of the originating [`SourceItem`] in the output
    pub index: usize,
    pub source_path: PathBuf,
    pub scratch_path: PathBuf,
}

/// Scratch file name for a source: zero-padded index, then the source stem.
///
/// The index prefix keeps names unique when stems collide and makes a
/// lexicographic sort of names agree with output order.
pub fn intermediate_name(item: &SourceItem) -> String {
    let stem = item
        .path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "source".to_string());
    format!("{:06}_{}.wav", item.index, stem)
}

/// Transcode one source file into `scratch_dir`
pub fn transcode(
    codec: &dyn AudioCodec,
    item: &SourceItem,
    target: NormalizationTarget,
    scratch_dir: &Path,
) -> Result<IntermediateArtifact, TranscodeError> {
    let fail = |source: CodecError| TranscodeError {
        index: item.index,
        path: item.path.clone(),
        source,
    };

    let decoded = codec.decode(&item.path).map_err(fail)?;
    debug!(
        path = %item.path.display(),
        sample_rate = decoded.sample_rate,
        channels = decoded.channels,
        "Decoded source"
    );

    let normalized = codec.normalize(decoded, target).map_err(fail)?;

    let scratch_path = scratch_dir.join(intermediate_name(item));
    if let Err(e) = codec.export(&normalized, &scratch_path, ExportFormat::Wav) {
        // Never leave a truncated intermediate behind
        let _ = std::fs::remove_file(&scratch_path);
        return Err(fail(e));
    }

    debug!(
        path = %item.path.display(),
        intermediate = %scratch_path.display(),
        frames = normalized.frames(),
        "Transcoded source"
    );

    Ok(IntermediateArtifact {
        index: item.index,
        source_path: item.path.clone(),
        scratch_path,
    })
}
