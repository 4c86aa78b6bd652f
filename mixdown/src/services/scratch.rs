//! Run-scoped scratch storage
//!
//! Holds intermediate WAVs and spill files. The directory and everything in
//! it is removed when the guard is closed or dropped, on every exit path.

use std::io;
use std::path::Path;
use tempfile::TempDir;
use tracing::{debug, warn};

const SCRATCH_PREFIX: &str = "audio_process_";

/// Temporary directory owned by one run
#[derive(Debug)]
pub struct ScratchDir {
    dir: TempDir,
}

impl ScratchDir {
    /// Create a fresh scratch directory under `root`, or the system temp
    /// directory when `root` is `None`
    pub fn create(root: Option<&Path>) -> io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(SCRATCH_PREFIX);
        let dir = match root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };
        debug!(path = %dir.path().display(), "Created scratch directory");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Remove the directory now, reporting failure instead of ignoring it
    pub fn close(self) -> io::Result<()> {
        let path = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => {
                debug!(path = %path.display(), "Removed scratch directory");
                Ok(())
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to remove scratch directory");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_removes_contents() {
        let root = tempfile::TempDir::new().unwrap();
        let scratch = ScratchDir::create(Some(root.path())).unwrap();
        let path = scratch.path().to_path_buf();
        std::fs::write(path.join("0001_song.wav"), b"data").unwrap();

        assert!(path.starts_with(root.path()));
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(SCRATCH_PREFIX));

        scratch.close().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_drop_removes_directory() {
        let path = {
            let scratch = ScratchDir::create(None).unwrap();
            scratch.path().to_path_buf()
        };
        assert!(!path.exists());
    }
}
