//! Progress events emitted while a merge run is in flight
//!
//! Events are plain values so they can cross worker boundaries and be
//! rendered by whatever front end the caller installs.

use std::path::PathBuf;

/// Progress of a batch run, in the order the phases occur
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// Transcode phase is starting with `total` source files
    TranscodeStarted { total: usize },

    /// One source file finished (successfully or not)
    TranscodeAdvanced {
        completed: usize,
        total: usize,
        path: PathBuf,
        succeeded: bool,
    },

    /// All transcode tasks have returned
    TranscodeFinished { succeeded: usize, failed: usize },

    /// Merge phase is starting with `total` intermediate segments
    MergeStarted { total: usize },

    /// One segment has been absorbed into the merge buffer (or skipped)
    MergeAdvanced { processed: usize, total: usize },

    /// The merge buffer was flushed to disk and reloaded
    Spilled { cycle: usize, buffer_bytes: usize },

    /// Final encode to the output path has begun
    Finalizing,

    /// Merge phase is done
    MergeFinished,
}
