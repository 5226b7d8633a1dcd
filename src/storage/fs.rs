//! Filesystem-backed partition store.
//!
//! Stores each partition as one file in a flat directory. Partition names
//! are validated before touching the filesystem so a hostile or corrupted
//! name can never escape the directory.

use super::partition::PartitionStore;
use crate::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Filesystem implementation of [`PartitionStore`].
pub struct FsPartitionStore {
    /// Directory holding the partition files.
    base_path: PathBuf,
}

impl FsPartitionStore {
    /// Creates a store rooted at `base_path`, creating the directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn with_create(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).map_err(|e| Error::OperationFailed {
            operation: "create_partition_dir".to_string(),
            cause: e.to_string(),
        })?;

        Ok(Self { base_path })
    }

    /// Returns the base path.
    #[must_use]
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Resolves a validated partition name to its path.
    fn partition_path(&self, name: &str) -> Result<PathBuf> {
        if !Self::is_safe_name(name) {
            return Err(Error::InvalidInput(format!(
                "partition name contains invalid characters: {name}"
            )));
        }
        Ok(self.base_path.join(name))
    }

    /// Checks a partition name for path-traversal characters.
    fn is_safe_name(name: &str) -> bool {
        !name.is_empty()
            && name.len() <= 255
            && !name.contains("..")
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
    }
}

impl PartitionStore for FsPartitionStore {
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let path = self.partition_path(name)?;
        if !path.exists() {
            return Ok(None);
        }

        fs::read(&path)
            .map(Some)
            .map_err(|e| Error::OperationFailed {
                operation: "read_partition".to_string(),
                cause: e.to_string(),
            })
    }

    fn write(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let path = self.partition_path(name)?;

        // The directory may have been removed out from under a long-lived
        // process; recreate it rather than failing the write.
        let _ = fs::create_dir_all(&self.base_path);

        fs::write(&path, bytes).map_err(|e| Error::OperationFailed {
            operation: "write_partition".to_string(),
            cause: e.to_string(),
        })
    }

    fn list(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| Error::OperationFailed {
            operation: "list_partitions".to_string(),
            cause: e.to_string(),
        })?;

        let mut names = Vec::new();
        for entry in entries.flatten() {
            if entry.path().is_file() {
                if let Ok(name) = entry.file_name().into_string() {
                    names.push(name);
                }
            }
        }
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_missing_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsPartitionStore::with_create(dir.path()).unwrap();

        assert!(store.read("sent-2025-07-14.json").unwrap().is_none());
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsPartitionStore::with_create(dir.path()).unwrap();

        store.write("sent-2025-07-14.json", b"[]").unwrap();
        let data = store.read("sent-2025-07-14.json").unwrap();
        assert_eq!(data.as_deref(), Some(b"[]".as_slice()));
    }

    #[test]
    fn test_list_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsPartitionStore::with_create(dir.path()).unwrap();

        store.write("sent-2025-07-13.json", b"[]").unwrap();
        store.write("sent-2025-07-14.json", b"[]").unwrap();

        let mut names = store.list().unwrap();
        names.sort();
        assert_eq!(names, vec!["sent-2025-07-13.json", "sent-2025-07-14.json"]);
    }

    #[test]
    fn test_rejects_traversal_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsPartitionStore::with_create(dir.path()).unwrap();

        assert!(store.write("../escape.json", b"[]").is_err());
        assert!(store.read("a/b.json").is_err());
        assert!(store.write("", b"[]").is_err());
    }

    #[test]
    fn test_write_recreates_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("partitions");
        let store = FsPartitionStore::with_create(&nested).unwrap();

        std::fs::remove_dir_all(&nested).unwrap();
        store.write("sent-2025-07-14.json", b"[]").unwrap();
        assert!(store.read("sent-2025-07-14.json").unwrap().is_some());
    }
}
