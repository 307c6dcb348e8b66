//! Writing generated artifacts to disk.

use std::path::{Path, PathBuf};

use super::OutputSink;
use crate::utils::fs::safe_write;

/// Writes artifacts below an output directory.
///
/// Writes are atomic per file. A failed write is logged and otherwise ignored;
/// the next build overwrites the artifact anyway.
#[derive(Debug, Clone)]
pub struct FsOutputSink {
    root: PathBuf,
}

impl FsOutputSink {
    /// Sink writing below `root`.
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    /// The output directory.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl OutputSink for FsOutputSink {
    fn emit(&self, path: &Path, content: &str) {
        let target = self.root.join(path);
        match safe_write(&target, content) {
            Ok(()) => tracing::debug!("Wrote {}", target.display()),
            Err(e) => tracing::error!("Failed to write {}: {e:#}", target.display()),
        }
    }
}
