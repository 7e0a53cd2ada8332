//! Counter-named snapshot files for Model evaluations.

use std::fs;
use std::path::{Path, PathBuf};

use tea_core::errors::{ErrorInfo, TeaError};

/// Allocator of uniquely named snapshot paths within one run.
///
/// Every Model evaluation persists its state to a fresh file so the
/// Calculator reads settled data while the live session moves on. Names come
/// from a monotonically increasing counter, never from the swept values
/// themselves: values may repeat or need more digits than a filename can
/// faithfully carry. Files accumulate for the lifetime of the run directory;
/// cleanup is the caller's concern.
#[derive(Debug)]
pub struct SnapshotDir {
    dir: PathBuf,
    count: u64,
}

impl SnapshotDir {
    /// Creates an allocator rooted at `<out_dir>/snapshots`.
    pub fn new(out_dir: &Path) -> Self {
        Self {
            dir: out_dir.join("snapshots"),
            count: 0,
        }
    }

    /// Number of snapshot paths handed out so far.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Allocates the next snapshot path, creating the directory on first use.
    pub fn next_path(&mut self) -> Result<PathBuf, TeaError> {
        fs::create_dir_all(&self.dir).map_err(|err| {
            TeaError::Serde(
                ErrorInfo::new("snapshot-mkdir", err.to_string())
                    .with_context("path", self.dir.display().to_string()),
            )
        })?;
        self.count += 1;
        Ok(self.dir.join(format!("snap_{:05}.bkp", self.count)))
    }
}
