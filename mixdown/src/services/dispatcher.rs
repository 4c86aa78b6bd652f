//! Parallel transcode dispatch
//!
//! Fans source files out to a bounded pool of blocking workers, collects
//! results as they complete, and hands back the successes in output order.
//!
//! Workers share nothing: each task owns its [`SourceItem`] and returns its
//! result by value. A panicking worker fails only its own item.

use crate::audio::{AudioCodec, CodecError};
use crate::progress::ProgressSink;
use crate::services::file_scanner::SourceItem;
use crate::services::transcoder::{self, IntermediateArtifact, TranscodeError};
use futures::stream::{self, StreamExt};
use mixdown_common::{NormalizationTarget, ProgressEvent};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of a dispatch: successes in output order, plus every failure
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub artifacts: Vec<IntermediateArtifact>,
    pub failures: Vec<TranscodeError>,
}

/// Bounded transcode pool
pub struct Dispatcher {
    codec: Arc<dyn AudioCodec>,
    target: NormalizationTarget,
    scratch_dir: PathBuf,
    worker_count: usize,
    completed: Arc<AtomicUsize>,
}

impl Dispatcher {
    pub fn new(
        codec: Arc<dyn AudioCodec>,
        target: NormalizationTarget,
        scratch_dir: impl Into<PathBuf>,
        worker_count: usize,
    ) -> Self {
        Self {
            codec,
            target,
            scratch_dir: scratch_dir.into(),
            worker_count: worker_count.max(1),
            completed: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Items finished so far (successes and failures). Only ever increases.
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    /// Shared handle to the completion counter, for external progress polling
    pub fn completed_handle(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.completed)
    }

    /// Transcode every item, at most `worker_count` at a time
    pub async fn dispatch(
        &self,
        items: Vec<SourceItem>,
        progress: &dyn ProgressSink,
    ) -> DispatchReport {
        let total = items.len();
        progress.on_event(ProgressEvent::TranscodeStarted { total });

        info!(
            files = total,
            workers = self.worker_count,
            target = %self.target,
            "Starting transcode phase"
        );

        let mut results = stream::iter(items)
            .map(|item| {
                let codec = Arc::clone(&self.codec);
                let target = self.target;
                let scratch_dir = self.scratch_dir.clone();
                let index = item.index;
                let path = item.path.clone();

                async move {
                    let task = tokio::task::spawn_blocking(move || {
                        transcoder::transcode(codec.as_ref(), &item, target, &scratch_dir)
                    });
                    match task.await {
                        Ok(result) => result,
                        Err(join_error) => Err(TranscodeError {
                            index,
                            path,
                            source: CodecError::WorkerAborted(join_error.to_string()),
                        }),
                    }
                }
            })
            .buffer_unordered(self.worker_count);

        let mut report = DispatchReport::default();

        while let Some(result) = results.next().await {
            let completed = self.completed.fetch_add(1, Ordering::Relaxed) + 1;

            let (path, succeeded) = match result {
                Ok(artifact) => {
                    let path = artifact.source_path.clone();
                    report.artifacts.push(artifact);
                    (path, true)
                }
                Err(e) => {
                    warn!(path = %e.path.display(), error = %e.source, "Error processing file, skipping");
                    let path = e.path.clone();
                    report.failures.push(e);
                    (path, false)
                }
            };

            progress.on_event(ProgressEvent::TranscodeAdvanced {
                completed,
                total,
                path,
                succeeded,
            });
        }

        // Completion order is arbitrary; output order is the enumeration order
        report.artifacts.sort_by_key(|a| a.index);
        report.failures.sort_by_key(|f| f.index);

        progress.on_event(ProgressEvent::TranscodeFinished {
            succeeded: report.artifacts.len(),
            failed: report.failures.len(),
        });

        info!(
            succeeded = report.artifacts.len(),
            failed = report.failures.len(),
            "Transcode phase complete"
        );

        report
    }
}
