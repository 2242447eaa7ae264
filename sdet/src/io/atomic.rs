//! Whole-file replacement via temp file + rename.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Write `contents` to `path`, creating parent directories.
///
/// Readers see either the previous file or the complete new one.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = temp_path(path);
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp file {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_parents_and_overwrites() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("a/b/latest.md");
        write_atomic(&path, "first").expect("write first");
        write_atomic(&path, "second").expect("write second");
        assert_eq!(fs::read_to_string(&path).expect("read"), "second");
        assert!(!temp.path().join("a/b/latest.md.tmp").exists());
    }

    #[test]
    fn temp_path_keeps_extensionless_names() {
        assert_eq!(
            temp_path(Path::new(".agent/Dockerfile")),
            PathBuf::from(".agent/Dockerfile.tmp")
        );
    }
}
