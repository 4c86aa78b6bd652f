//! Error types for mixdown

use crate::services::{MergeError, ScanError};
use thiserror::Error;

/// Errors that abort a run
#[derive(Debug, Error)]
pub enum Error {
    /// Input directory could not be enumerated
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),

    /// Final output could not be written
    #[error("Merge error: {0}")]
    Merge(#[from] MergeError),

    /// Scratch storage or output path could not be prepared
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Merge thread panicked or was cancelled
    #[error("Merge task failed: {0}")]
    Task(String),

    /// mixdown-common error
    #[error("Common error: {0}")]
    Common(#[from] mixdown_common::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
