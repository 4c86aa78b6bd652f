//! mixdown library interface
//!
//! Normalizes a directory of audio files to one format and concatenates them,
//! in path order, into a single MP3 with bounded memory.

pub mod audio;
pub mod error;
pub mod progress;
pub mod services;
pub mod workflow;

pub use crate::error::{Error, Result};
pub use crate::workflow::{run, NothingToMergeReason, RunOutcome, RunSummary};
