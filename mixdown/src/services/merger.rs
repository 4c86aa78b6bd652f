//! Incremental bounded-memory merge
//!
//! Concatenates the ordered intermediates into one MP3 without ever holding
//! the combined audio in memory.
//!
//! The merge buffer has two parts:
//! - a **window** of decoded audio in memory (segments absorbed since the
//!   last spill)
//! - a **compressed prefix** on scratch disk (everything spilled so far)
//!
//! A spill encodes the window to a compressed scratch file at the output
//! bitrate, folds that file into the compressed prefix, deletes it, and
//! empties the window. Spills happen every `interval` absorbed segments or as
//! soon as the window exceeds `threshold_bytes`, so decoded memory is capped
//! at one window regardless of how many segments are merged.
//!
//! The loop is strictly sequential: segment N is absorbed (or skipped) before
//! segment N+1 is decoded.

use crate::audio::{AudioCodec, CodecError, ExportFormat, PcmBuffer};
use crate::progress::ProgressSink;
use crate::services::transcoder::IntermediateArtifact;
use mixdown_common::config::SpillPolicy;
use mixdown_common::{Bitrate, NormalizationTarget, ProgressEvent};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

const PREFIX_FILE: &str = "merged.mp3.part";

/// One intermediate that could not be absorbed
#[derive(Debug, Error)]
#[error("failed to merge {}: {source}", .path.display())]
pub struct SegmentFailure {
    pub index: usize,
    pub path: PathBuf,
    #[source]
    pub source: CodecError,
}

/// Fatal merge errors
#[derive(Debug, Error)]
pub enum MergeError {
    /// No artifacts were given, or none of them could be decoded
    #[error("nothing to merge")]
    NothingToMerge,

    /// Writing the final output failed
    #[error("failed to write final output {}: {source}", .path.display())]
    FinalEncode {
        path: PathBuf,
        #[source]
        source: CodecError,
    },

    /// A spill failed part-way and the prefix could not be truncated back
    #[error("merge prefix {} is inconsistent after failed spill ({cause}): {source}", .path.display())]
    PrefixCorrupted {
        path: PathBuf,
        cause: io::Error,
        #[source]
        source: io::Error,
    },
}

/// Statistics from a successful merge
#[derive(Debug, Default)]
pub struct MergeReport {
    pub segments_merged: usize,
    pub segment_failures: Vec<SegmentFailure>,
    /// Completed spill cycles
    pub spills: usize,
    /// Spill attempts that failed and left the window in memory
    pub spill_failures: usize,
    /// Largest decoded window held at any point, in bytes
    pub peak_buffer_bytes: usize,
    pub duration_seconds: f64,
}

/// Settings for one merge
#[derive(Debug, Clone, Copy)]
pub struct MergeSettings {
    pub target: NormalizationTarget,
    pub bitrate: Bitrate,
    pub spill: SpillPolicy,
}

/// Accumulator: decoded window plus compressed prefix on disk
struct MergeBuffer {
    window: PcmBuffer,
    prefix_path: PathBuf,
    prefix_frames: usize,
    has_prefix: bool,
    absorbed: usize,
}

impl MergeBuffer {
    fn seed(pcm: PcmBuffer, prefix_path: PathBuf) -> Self {
        Self {
            window: pcm,
            prefix_path,
            prefix_frames: 0,
            has_prefix: false,
            absorbed: 1,
        }
    }

    fn window_bytes(&self) -> usize {
        self.window.byte_len()
    }

    fn total_frames(&self) -> usize {
        self.prefix_frames + self.window.frames()
    }

    /// Append raw compressed bytes from `spill_path` to the prefix file.
    ///
    /// The window is only emptied once the bytes are durable; on any failure
    /// the prefix is truncated back to its previous length.
    fn fold_into_prefix(&mut self, spill_path: &Path) -> Result<(), FoldError> {
        let mut prefix = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.prefix_path)
            .map_err(FoldError::rolled_back)?;
        let previous_len = prefix.metadata().map_err(FoldError::rolled_back)?.len();
        let mut spill = File::open(spill_path).map_err(FoldError::rolled_back)?;

        append_or_roll_back(&mut prefix, previous_len, &mut spill)?;

        self.has_prefix = true;
        self.prefix_frames += self.window.frames();
        self.window = PcmBuffer::new(Vec::new(), self.window.sample_rate, self.window.channels);
        Ok(())
    }
}

/// Why a fold did not complete
#[derive(Debug)]
enum FoldError {
    /// Prefix is back at its previous length; the window can be retried
    RolledBack(CodecError),
    /// Prefix may hold a partial fold and must not be appended to again
    Torn { source: io::Error, rollback: io::Error },
}

impl FoldError {
    fn rolled_back(e: io::Error) -> Self {
        Self::RolledBack(e.into())
    }
}

impl From<FoldError> for CodecError {
    fn from(e: FoldError) -> Self {
        match e {
            FoldError::RolledBack(source) => source,
            FoldError::Torn { source, .. } => source.into(),
        }
    }
}

/// Prefix storage the merge appends compressed frames to
trait PrefixFile: Write {
    fn sync(&mut self) -> io::Result<()>;
    fn truncate(&mut self, len: u64) -> io::Result<()>;
}

impl PrefixFile for File {
    fn sync(&mut self) -> io::Result<()> {
        self.sync_data()
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }
}

/// Copy `spill` to the end of `prefix` and sync it, or leave `prefix` at
/// `previous_len`
fn append_or_roll_back(
    prefix: &mut impl PrefixFile,
    previous_len: u64,
    spill: &mut impl Read,
) -> Result<(), FoldError> {
    let appended = io::copy(spill, &mut *prefix)
        .and_then(|_| prefix.flush())
        .and_then(|()| prefix.sync());

    match appended {
        Ok(()) => Ok(()),
        Err(source) => match prefix.truncate(previous_len) {
            Ok(()) => Err(FoldError::rolled_back(source)),
            Err(rollback) => Err(FoldError::Torn { source, rollback }),
        },
    }
}

/// Sequential, spill-bounded concatenation of intermediates
pub struct IncrementalMerger {
    codec: Arc<dyn AudioCodec>,
    settings: MergeSettings,
    scratch_dir: PathBuf,
}

impl IncrementalMerger {
    pub fn new(
        codec: Arc<dyn AudioCodec>,
        settings: MergeSettings,
        scratch_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            codec,
            settings,
            scratch_dir: scratch_dir.into(),
        }
    }

    /// Merge `artifacts` (already in output order) into `output`.
    ///
    /// Per-segment failures are recorded in the report and skipped. Only an
    /// empty input, a failed final write, or a spill that could not be rolled
    /// back fails the merge.
    pub fn merge(
        &self,
        artifacts: &[IntermediateArtifact],
        output: &Path,
        progress: &dyn ProgressSink,
    ) -> Result<MergeReport, MergeError> {
        if artifacts.is_empty() {
            warn!("No intermediate files to merge");
            return Err(MergeError::NothingToMerge);
        }

        let total = artifacts.len();
        progress.on_event(ProgressEvent::MergeStarted { total });
        info!(
            segments = total,
            bitrate = %self.settings.bitrate,
            spill_interval = self.settings.spill.interval,
            spill_threshold_bytes = self.settings.spill.threshold_bytes,
            "Starting merge"
        );

        let mut report = MergeReport::default();
        let mut buffer: Option<MergeBuffer> = None;

        for (position, artifact) in artifacts.iter().enumerate() {
            match self.load_segment(artifact) {
                Ok(segment) => match buffer.as_mut() {
                    None => {
                        buffer = Some(MergeBuffer::seed(segment, self.prefix_path()));
                        report.segments_merged += 1;
                    }
                    Some(buf) => {
                        if buf.window.append(&segment) {
                            buf.absorbed += 1;
                            report.segments_merged += 1;
                        } else {
                            self.record_failure(
                                &mut report,
                                artifact,
                                CodecError::Decode(format!(
                                    "segment format {} Hz/{} ch does not match merge buffer",
                                    segment.sample_rate, segment.channels
                                )),
                            );
                        }
                        // `segment` dropped here: only the window stays resident
                    }
                },
                Err(e) => self.record_failure(&mut report, artifact, e),
            }

            if let Some(buf) = buffer.as_mut() {
                report.peak_buffer_bytes = report.peak_buffer_bytes.max(buf.window_bytes());
                if !buf.window.is_empty()
                    && self.settings.spill.should_spill(buf.absorbed, buf.window_bytes())
                {
                    self.spill(buf, &mut report, progress)?;
                }
            }

            progress.on_event(ProgressEvent::MergeAdvanced {
                processed: position + 1,
                total,
            });
        }

        let Some(mut buffer) = buffer else {
            warn!("None of the intermediate files could be decoded");
            return Err(MergeError::NothingToMerge);
        };

        progress.on_event(ProgressEvent::Finalizing);
        info!(output = %output.display(), "Exporting final file");

        let cycles = report.spills + report.spill_failures;
        if let Err(source) = self.finalize(&mut buffer, output, cycles) {
            let _ = fs::remove_file(output);
            return Err(MergeError::FinalEncode {
                path: output.to_path_buf(),
                source,
            });
        }

        report.duration_seconds =
            buffer.total_frames() as f64 / self.settings.target.sample_rate() as f64;
        progress.on_event(ProgressEvent::MergeFinished);

        info!(
            segments = report.segments_merged,
            skipped = report.segment_failures.len(),
            spills = report.spills,
            duration_seconds = %format!("{:.1}", report.duration_seconds),
            "Merge complete"
        );

        Ok(report)
    }

    fn prefix_path(&self) -> PathBuf {
        self.scratch_dir.join(PREFIX_FILE)
    }

    fn spill_path(&self, cycle: usize) -> PathBuf {
        self.scratch_dir.join(format!("spill_{cycle:04}.mp3"))
    }

    /// Decode one intermediate and bring it to the merge format
    fn load_segment(&self, artifact: &IntermediateArtifact) -> Result<PcmBuffer, CodecError> {
        let decoded = self.codec.decode(&artifact.scratch_path)?;
        let segment = self.codec.normalize(decoded, self.settings.target)?;
        debug!(
            path = %artifact.source_path.display(),
            frames = segment.frames(),
            "Loaded segment"
        );
        Ok(segment)
    }

    fn record_failure(
        &self,
        report: &mut MergeReport,
        artifact: &IntermediateArtifact,
        source: CodecError,
    ) {
        warn!(
            path = %artifact.source_path.display(),
            error = %source,
            "Error merging segment, skipping"
        );
        report.segment_failures.push(SegmentFailure {
            index: artifact.index,
            path: artifact.source_path.clone(),
            source,
        });
    }

    /// Encode the window to a compressed scratch file and fold it into the
    /// prefix. Failure keeps the window in memory for the next attempt,
    /// unless the prefix could not be restored.
    fn spill(
        &self,
        buffer: &mut MergeBuffer,
        report: &mut MergeReport,
        progress: &dyn ProgressSink,
    ) -> Result<(), MergeError> {
        let cycle = report.spills + report.spill_failures + 1;
        let spill_path = self.spill_path(cycle);
        let window_bytes = buffer.window_bytes();

        let result = self
            .codec
            .export(
                &buffer.window,
                &spill_path,
                ExportFormat::Mp3 {
                    bitrate: self.settings.bitrate,
                },
            )
            .map_err(FoldError::RolledBack)
            .and_then(|()| buffer.fold_into_prefix(&spill_path));
        let _ = fs::remove_file(&spill_path);

        match result {
            Ok(()) => {
                report.spills += 1;
                info!(
                    cycle = report.spills,
                    absorbed = buffer.absorbed,
                    window_bytes,
                    "Flushed merge buffer to disk"
                );
                progress.on_event(ProgressEvent::Spilled {
                    cycle: report.spills,
                    buffer_bytes: window_bytes,
                });
                Ok(())
            }
            Err(FoldError::RolledBack(e)) => {
                report.spill_failures += 1;
                warn!(error = %e, window_bytes, "Spill failed, keeping buffer in memory");
                Ok(())
            }
            Err(FoldError::Torn { source, rollback }) => {
                error!(
                    path = %buffer.prefix_path.display(),
                    error = %source,
                    rollback_error = %rollback,
                    "Spill failed and merge prefix could not be restored"
                );
                Err(MergeError::PrefixCorrupted {
                    path: buffer.prefix_path.clone(),
                    cause: source,
                    source: rollback,
                })
            }
        }
    }

    /// Write the remaining window and move the result to `output`
    fn finalize(&self, buffer: &mut MergeBuffer, output: &Path, cycles: usize) -> Result<(), CodecError> {
        let format = ExportFormat::Mp3 {
            bitrate: self.settings.bitrate,
        };

        if !buffer.has_prefix {
            return self.codec.export(&buffer.window, output, format);
        }

        if !buffer.window.is_empty() {
            let tail_path = self.spill_path(cycles + 1);
            let result = self
                .codec
                .export(&buffer.window, &tail_path, format)
                .and_then(|()| buffer.fold_into_prefix(&tail_path).map_err(CodecError::from));
            let _ = fs::remove_file(&tail_path);
            result?;
        }

        persist(&buffer.prefix_path, output)?;
        Ok(())
    }
}

/// Move `from` to `to`, copying when they live on different filesystems
fn persist(from: &Path, to: &Path) -> io::Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    fs::copy(from, to)?;
    fs::remove_file(from)
}
