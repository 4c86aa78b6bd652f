//! # mixdown Common Library
//!
//! Shared code for the mixdown workspace:
//! - Error types
//! - Audio format descriptors (bitrate, normalization target)
//! - Configuration loading and resolution
//! - Progress event types

pub mod config;
pub mod error;
pub mod events;
pub mod format;

pub use error::{Error, Result};
pub use events::ProgressEvent;
pub use format::{Bitrate, NormalizationTarget};
