//! Pipeline services
//!
//! Scan → size pool → transcode in parallel → merge sequentially.

pub mod dispatcher;
pub mod file_scanner;
pub mod merger;
pub mod pool_sizer;
pub mod scratch;
pub mod transcoder;

pub use dispatcher::{DispatchReport, Dispatcher};
pub use file_scanner::{FileScanner, ScanError, ScanResult, SourceItem};
pub use merger::{IncrementalMerger, MergeError, MergeReport, MergeSettings, SegmentFailure};
pub use pool_sizer::PoolSizer;
pub use scratch::ScratchDir;
pub use transcoder::{IntermediateArtifact, TranscodeError};
