//! Installation identity.
//!
//! One ULID per installation, stored as plain text in `user-id`. It's created the first
//! time a record needs it and never rotated; every queued record carries it.

use std::io::Write;
use std::path::{Path, PathBuf};

use fs_err as fs;
use tempfile::NamedTempFile;

use crate::error::{Result, SafekeyError};

#[derive(Debug, Clone)]
pub struct UserIdentity {
    path: PathBuf,
}

impl UserIdentity {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Returns the persisted id, or None if none has been created yet.
    pub fn load(&self) -> Option<String> {
        let content = fs::read_to_string(&self.path).ok()?;
        let id = content.trim();
        (!id.is_empty()).then(|| id.to_string())
    }

    /// Returns the persisted id, creating it on first use.
    ///
    /// If the new id can't be written, it is still returned so capture keeps working; the
    /// next process start will mint another one.
    pub fn load_or_create(&self) -> String {
        if let Some(id) = self.load() {
            return id;
        }

        let id = ulid::Ulid::new().to_string();
        if let Err(err) = self.persist(&id) {
            tracing::warn!(
                error = %err,
                path = %self.path.display(),
                "Failed to persist user id; using in-memory id"
            );
        } else {
            tracing::info!(user_id = %id, "Created installation user id");
        }
        id
    }

    fn persist(&self, id: &str) -> Result<()> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| SafekeyError::Validation("user id path has no parent".to_string()))?;
        fs::create_dir_all(parent).map_err(|e| SafekeyError::io("create identity dir", e))?;

        let mut temp_file =
            NamedTempFile::new_in(parent).map_err(|e| SafekeyError::io("identity temp file", e))?;
        temp_file
            .write_all(id.as_bytes())
            .map_err(|e| SafekeyError::io("write identity temp file", e))?;
        temp_file
            .persist(&self.path)
            .map_err(|e| SafekeyError::io("persist user id", e.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_returns_none() {
        let temp = TempDir::new().unwrap();
        let identity = UserIdentity::new(&temp.path().join("user-id"));
        assert!(identity.load().is_none());
    }

    #[test]
    fn test_load_or_create_is_stable() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("user-id");

        let first = UserIdentity::new(&path).load_or_create();
        let second = UserIdentity::new(&path).load_or_create();

        assert_eq!(first, second);
        assert_eq!(first.len(), 26);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), first);
    }

    #[test]
    fn test_blank_file_is_replaced() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("user-id");
        std::fs::write(&path, "  \n").unwrap();

        let id = UserIdentity::new(&path).load_or_create();
        assert!(!id.trim().is_empty());
        assert_eq!(UserIdentity::new(&path).load(), Some(id));
    }

    #[test]
    fn test_unwritable_location_still_returns_id() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("not-a-dir");
        std::fs::write(&blocker, "file").unwrap();

        let identity = UserIdentity::new(&blocker.join("user-id"));
        let id = identity.load_or_create();
        assert_eq!(id.len(), 26);
        assert!(identity.load().is_none());
    }
}
