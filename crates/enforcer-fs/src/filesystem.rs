//! Existence checks against the local filesystem
//!
//! A path that does not exist is a normal `false` answer, never an error.
//! Only failures to inspect an existing path (permissions, broken media)
//! surface as [`Error::Io`](crate::Error::Io).

use std::io::ErrorKind;
use std::path::Path;

use crate::{Error, Result};

/// Read-only view of the filesystem used by the installation probe.
pub trait FileSystem {
    /// Whether `path` exists and is a regular file.
    fn file_exists(&self, path: &Path) -> Result<bool>;

    /// Whether `path` exists and is a directory.
    fn dir_exists(&self, path: &Path) -> Result<bool>;
}

/// [`FileSystem`] backed by `std::fs` metadata lookups.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFs;

impl LocalFs {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for LocalFs {
    fn file_exists(&self, path: &Path) -> Result<bool> {
        match std::fs::metadata(path) {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::io(path, e)),
        }
    }

    fn dir_exists(&self, path: &Path) -> Result<bool> {
        match std::fs::metadata(path) {
            Ok(meta) => Ok(meta.is_dir()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::io(path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_path_is_not_an_error() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope");

        assert!(!LocalFs.file_exists(&missing).unwrap());
        assert!(!LocalFs.dir_exists(&missing).unwrap());
    }

    #[test]
    fn test_file_is_not_a_directory() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("warp-svc.exe");
        std::fs::write(&file, b"").unwrap();

        assert!(LocalFs.file_exists(&file).unwrap());
        assert!(!LocalFs.dir_exists(&file).unwrap());
    }

    #[test]
    fn test_directory_is_not_a_file() {
        let temp = TempDir::new().unwrap();

        assert!(LocalFs.dir_exists(temp.path()).unwrap());
        assert!(!LocalFs.file_exists(temp.path()).unwrap());
    }
}
