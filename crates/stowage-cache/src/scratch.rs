//! Scoped transient files.

use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A local file removed when the guard goes out of scope.
///
/// Removal runs on success, on error returns, and during unwinding.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    /// Take ownership of `path`. The file itself need not exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<path>.<suffix>` next to an existing file, e.g. `cache.tar.zst.tar`.
    pub fn sibling(path: &Path, suffix: &str) -> Self {
        let mut name = path.as_os_str().to_owned();
        name.push(".");
        name.push(suffix);
        Self::new(PathBuf::from(name))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Removed transient file"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), "Failed to cleanup file: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.tar.gz");
        {
            let scratch = ScratchFile::new(&path);
            std::fs::write(scratch.path(), b"data").unwrap();
            assert!(path.exists());
        }
        assert!(!path.exists());
    }

    #[test]
    fn test_missing_file_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        drop(ScratchFile::new(dir.path().join("never-created")));
    }

    #[test]
    fn test_removed_during_unwind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.tar.zst");
        let inner = path.clone();
        let result = std::panic::catch_unwind(move || {
            let scratch = ScratchFile::new(&inner);
            std::fs::write(scratch.path(), b"data").unwrap();
            panic!("boom");
        });
        assert!(result.is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_sibling_name() {
        let scratch = ScratchFile::sibling(Path::new("work/cache.tar.zst"), "tar");
        assert_eq!(scratch.path(), Path::new("work/cache.tar.zst.tar"));
    }
}
