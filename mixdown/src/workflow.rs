//! Run orchestration
//!
//! One run: clear the previous output, scan the input directory, size the
//! pool, transcode in parallel, merge sequentially. Scratch storage lives for
//! exactly one run and is removed on every exit path.

use crate::audio::AudioCodec;
use crate::error::{Error, Result};
use crate::progress::ProgressSink;
use crate::services::pool_sizer::{self, PoolSizer};
use crate::services::{
    Dispatcher, FileScanner, IncrementalMerger, MergeError, MergeReport, MergeSettings,
    ScanResult, ScratchDir, TranscodeError,
};
use mixdown_common::config::MergeConfig;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Why a run produced no output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NothingToMergeReason {
    /// No recognized audio files in the input directory
    NoInputFiles,
    /// Every file failed to transcode
    AllTranscodesFailed,
    /// No intermediate could be decoded for merging
    NoDecodableSegments,
}

impl fmt::Display for NothingToMergeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoInputFiles => write!(f, "no audio files found"),
            Self::AllTranscodesFailed => write!(f, "no files could be transcoded"),
            Self::NoDecodableSegments => write!(f, "no intermediate files could be decoded"),
        }
    }
}

#[derive(Debug)]
pub enum RunOutcome {
    Completed { output: PathBuf, merge: MergeReport },
    NothingToMerge { reason: NothingToMergeReason },
}

/// Everything the caller needs to report on a finished run
#[derive(Debug)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    pub files_found: usize,
    /// Files found per lowercased extension
    pub files_by_format: BTreeMap<String, usize>,
    pub total_size_mb: f64,
    pub worker_count: usize,
    /// Files excluded from the output, in input order
    pub transcode_failures: Vec<TranscodeError>,
    pub elapsed: Duration,
}

impl RunSummary {
    fn nothing_to_merge(reason: NothingToMergeReason, scan: &ScanSummary) -> Self {
        Self {
            outcome: RunOutcome::NothingToMerge { reason },
            files_found: scan.files_found,
            files_by_format: scan.files_by_format.clone(),
            total_size_mb: scan.total_size_mb,
            worker_count: 0,
            transcode_failures: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.outcome, RunOutcome::Completed { .. })
    }
}

struct ScanSummary {
    files_found: usize,
    files_by_format: BTreeMap<String, usize>,
    total_size_mb: f64,
}

/// Execute one batch merge
pub async fn run(
    config: &MergeConfig,
    codec: Arc<dyn AudioCodec>,
    progress: Arc<dyn ProgressSink>,
) -> Result<RunSummary> {
    let started = Instant::now();

    // A previous run's output must never be appended to
    remove_existing_output(&config.output)?;

    let scan = FileScanner::new().scan(&config.input_dir)?;
    let scan_summary = ScanSummary {
        files_found: scan.items.len(),
        files_by_format: scan.by_format.clone(),
        total_size_mb: scan.total_size_mb(),
    };
    info!(
        dir = %config.input_dir.display(),
        files = scan_summary.files_found,
        formats = %scan.format_summary(),
        total_mb = %format!("{:.1}", scan_summary.total_size_mb),
        "Found audio files"
    );

    if scan.items.is_empty() {
        info!("No audio files to merge");
        let mut summary =
            RunSummary::nothing_to_merge(NothingToMergeReason::NoInputFiles, &scan_summary);
        summary.elapsed = started.elapsed();
        return Ok(summary);
    }

    let scratch = ScratchDir::create(config.scratch_root.as_deref())?;
    let result = run_in_scratch(config, codec, progress, scan, &scan_summary, scratch.path()).await;
    // Failure is logged by close(); the run result takes precedence
    let _ = scratch.close();

    result.map(|mut summary| {
        summary.elapsed = started.elapsed();
        summary
    })
}

async fn run_in_scratch(
    config: &MergeConfig,
    codec: Arc<dyn AudioCodec>,
    progress: Arc<dyn ProgressSink>,
    scan: ScanResult,
    scan_summary: &ScanSummary,
    scratch_dir: &Path,
) -> Result<RunSummary> {
    let units = pool_sizer::available_units();
    let worker_count =
        PoolSizer::default().resolve(config.workers, scan_summary.total_size_mb, units);
    info!(workers = worker_count, units, "Sized transcode pool");

    let dispatcher = Dispatcher::new(Arc::clone(&codec), config.target, scratch_dir, worker_count);
    let dispatch = dispatcher.dispatch(scan.items, progress.as_ref()).await;

    if dispatch.artifacts.is_empty() {
        warn!(failed = dispatch.failures.len(), "Every file failed to transcode");
        let mut summary =
            RunSummary::nothing_to_merge(NothingToMergeReason::AllTranscodesFailed, scan_summary);
        summary.worker_count = worker_count;
        summary.transcode_failures = dispatch.failures;
        return Ok(summary);
    }

    let merger = IncrementalMerger::new(
        codec,
        MergeSettings {
            target: config.target,
            bitrate: config.bitrate,
            spill: config.spill,
        },
        scratch_dir,
    );
    let artifacts = dispatch.artifacts;
    let output = config.output.clone();
    let sink = Arc::clone(&progress);

    let merged = tokio::task::spawn_blocking(move || merger.merge(&artifacts, &output, sink.as_ref()))
        .await
        .map_err(|e| Error::Task(e.to_string()))?;

    let outcome = match merged {
        Ok(merge) => RunOutcome::Completed {
            output: config.output.clone(),
            merge,
        },
        Err(MergeError::NothingToMerge) => RunOutcome::NothingToMerge {
            reason: NothingToMergeReason::NoDecodableSegments,
        },
        Err(e) => return Err(e.into()),
    };

    Ok(RunSummary {
        outcome,
        files_found: scan_summary.files_found,
        files_by_format: scan_summary.files_by_format.clone(),
        total_size_mb: scan_summary.total_size_mb,
        worker_count,
        transcode_failures: dispatch.failures,
        elapsed: Duration::ZERO,
    })
}

/// Delete a leftover output file and make sure its parent directory exists
fn remove_existing_output(output: &Path) -> io::Result<()> {
    match fs::remove_file(output) {
        Ok(()) => info!(path = %output.display(), "Removed existing output"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}
