//! Filesystem-backed [`RepoFiles`] view for classification.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::classifier::RepoFiles;

/// Repository files read straight from disk.
///
/// Reads are lossy: invalid UTF-8 is replaced rather than rejected, and any
/// I/O error reads as a missing file.
#[derive(Debug, Clone)]
pub struct FsRepo {
    root: PathBuf,
}

impl FsRepo {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl RepoFiles for FsRepo {
    fn exists(&self, rel_path: &str) -> bool {
        self.root.join(rel_path).is_file()
    }

    fn read_text(&self, rel_path: &str) -> Option<String> {
        let path = self.root.join(rel_path);
        match fs::read(&path) {
            Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
            Err(err) => {
                debug!(path = %path.display(), err = %err, "treating unreadable file as empty");
                None
            }
        }
    }
}
