//! Progress reporting
//!
//! The pipeline emits [`ProgressEvent`]s to a [`ProgressSink`]. The CLI
//! installs [`ConsoleProgress`]; library callers and tests use
//! [`NoProgress`] or their own sink.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use mixdown_common::ProgressEvent;
use std::sync::Mutex;
use std::time::Duration;

/// Receiver for progress events. Called from the orchestrating task and the
/// merge thread, so implementations must be thread-safe.
pub trait ProgressSink: Send + Sync {
    fn on_event(&self, event: ProgressEvent);
}

/// Discards all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_event(&self, _event: ProgressEvent) {}
}

/// Terminal progress bars (one per phase) drawn on stderr
pub struct ConsoleProgress {
    bar: Mutex<Option<ProgressBar>>,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn start_bar(&self, total: usize, label: &'static str) {
        let style = ProgressStyle::with_template(
            "{spinner:.green} {prefix} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar());

        let bar = ProgressBar::with_draw_target(Some(total as u64), ProgressDrawTarget::stderr());
        bar.set_style(style);
        bar.set_prefix(label);
        bar.enable_steady_tick(Duration::from_millis(100));

        if let Ok(mut slot) = self.bar.lock() {
            if let Some(previous) = slot.replace(bar) {
                previous.finish_and_clear();
            }
        }
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(slot) = self.bar.lock() {
            if let Some(bar) = slot.as_ref() {
                f(bar);
            }
        }
    }

    fn finish_bar(&self, message: String) {
        if let Ok(mut slot) = self.bar.lock() {
            if let Some(bar) = slot.take() {
                bar.finish_with_message(message);
            }
        }
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for ConsoleProgress {
    fn on_event(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::TranscodeStarted { total } => self.start_bar(total, "Transcoding"),
            ProgressEvent::TranscodeAdvanced {
                completed, path, ..
            } => self.with_bar(|bar| {
                bar.set_position(completed as u64);
                if let Some(name) = path.file_name() {
                    bar.set_message(name.to_string_lossy().into_owned());
                }
            }),
            ProgressEvent::TranscodeFinished { succeeded, failed } => {
                self.finish_bar(format!("{succeeded} ok, {failed} failed"))
            }
            ProgressEvent::MergeStarted { total } => self.start_bar(total, "Merging"),
            ProgressEvent::MergeAdvanced { processed, .. } => {
                self.with_bar(|bar| bar.set_position(processed as u64))
            }
            ProgressEvent::Spilled { cycle, .. } => {
                self.with_bar(|bar| bar.set_message(format!("flush #{cycle}")))
            }
            ProgressEvent::Finalizing => {
                self.with_bar(|bar| bar.set_message("exporting final file..."))
            }
            ProgressEvent::MergeFinished => self.finish_bar("done".to_string()),
        }
    }
}
