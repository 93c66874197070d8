//! Utility functions for error handling
//!
//! Path checks that produce errors carrying the offending path.

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Open a file for reading, attaching the path to any failure
pub fn safe_open_file(path: &Path) -> Result<fs::File> {
    if !path.is_file() {
        return Err(Error::io_at(
            path,
            std::io::Error::new(std::io::ErrorKind::NotFound, "not a readable file"),
        ));
    }
    fs::File::open(path).map_err(|e| Error::io_at(path, e))
}

/// Check that a directory exists and is readable
pub fn validate_directory(path: &Path) -> Result<()> {
    if !path.is_dir() {
        return Err(Error::io_at(
            path,
            std::io::Error::new(std::io::ErrorKind::NotFound, "directory not found"),
        ));
    }
    fs::read_dir(path).map(|_| ()).map_err(|e| Error::io_at(path, e))
}

/// Create a directory and all its parents
pub fn ensure_directory(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|e| Error::io_at(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_directory_is_reported_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = validate_directory(&missing).unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn open_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "x").unwrap();
        assert!(safe_open_file(&path).is_ok());
        assert!(safe_open_file(dir.path()).is_err());
    }
}
