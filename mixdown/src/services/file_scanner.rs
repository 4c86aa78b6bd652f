//! Audio file scanner
//!
//! Lists the recognized audio files directly inside the input directory and
//! assigns each one its position in the run's output order.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Extensions treated as audio input (compared case-insensitively)
pub const SUPPORTED_EXTENSIONS: [&str; 6] = ["mp3", "wav", "ogg", "flac", "m4a", "aac"];

/// Audio file scanner errors
#[derive(Debug, Error)]
pub enum ScanError {
    /// Specified path does not exist
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// Path exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Directory listing failed
    #[error("I/O error scanning {0}: {1}")]
    IoError(PathBuf, String),
}

/// One input file, in output order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceItem {
    /// Position in the output (0-based, assigned by path order)
    pub index: usize,
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Scan result with statistics
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    /// Audio files, sorted by path, indexed in that order
    pub items: Vec<SourceItem>,
    /// Total size of all items in bytes
    pub total_size: u64,
    /// Count of files by lowercased extension
    pub by_format: BTreeMap<String, usize>,
}

impl ScanResult {
    pub fn total_size_mb(&self) -> f64 {
        self.total_size as f64 / (1024.0 * 1024.0)
    }

    /// Per-format counts as `ext=n`, alphabetical
    pub fn format_summary(&self) -> String {
        self.by_format
            .iter()
            .map(|(ext, count)| format!("{ext}={count}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Audio file scanner
#[derive(Debug, Default)]
pub struct FileScanner;

impl FileScanner {
    pub fn new() -> Self {
        Self
    }

    /// Scan `root_path` (non-recursively) for recognized audio files.
    ///
    /// Entries that cannot be read are logged and skipped.
    pub fn scan(&self, root_path: &Path) -> Result<ScanResult, ScanError> {
        if !root_path.exists() {
            return Err(ScanError::PathNotFound(root_path.to_path_buf()));
        }

        if !root_path.is_dir() {
            return Err(ScanError::NotADirectory(root_path.to_path_buf()));
        }

        let mut found: Vec<(PathBuf, u64)> = Vec::new();

        let walker = WalkDir::new(root_path)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .into_iter();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    if e.depth() == 0 {
                        return Err(ScanError::IoError(root_path.to_path_buf(), e.to_string()));
                    }
                    tracing::warn!("Error accessing entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() || !Self::is_supported(entry.path()) {
                continue;
            }

            match entry.metadata() {
                Ok(metadata) => found.push((entry.into_path(), metadata.len())),
                Err(e) => {
                    tracing::warn!(path = %entry.path().display(), error = %e, "Cannot read file size, skipping");
                }
            }
        }

        found.sort_by(|a, b| a.0.cmp(&b.0));

        let mut result = ScanResult::default();
        for (index, (path, size_bytes)) in found.into_iter().enumerate() {
            result.total_size += size_bytes;
            if let Some(ext) = Self::extension(&path) {
                *result.by_format.entry(ext).or_insert(0) += 1;
            }
            result.items.push(SourceItem {
                index,
                path,
                size_bytes,
            });
        }

        tracing::debug!(
            files = result.items.len(),
            total_bytes = result.total_size,
            "Scan complete"
        );

        Ok(result)
    }

    /// Whether `path` has one of the recognized audio extensions
    pub fn is_supported(path: &Path) -> bool {
        Self::extension(path)
            .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
            .unwrap_or(false)
    }

    fn extension(path: &Path) -> Option<String> {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
    }
}
