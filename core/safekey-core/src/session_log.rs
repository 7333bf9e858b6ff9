//! Append-only log of whole keyboard sessions.
//!
//! One line per session, written at teardown. Nothing uploads this file; it stays on the
//! device.

use std::io::Write;
use std::path::{Path, PathBuf};

use fs_err as fs;
use fs_err::OpenOptions;

use crate::error::{Result, SafekeyError};

#[derive(Debug, Clone)]
pub struct SessionLog {
    path: PathBuf,
}

impl SessionLog {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `contents` as one line. Empty sessions write nothing.
    ///
    /// Returns whether a line was written; failures are logged, not raised.
    pub fn flush(&self, contents: &str) -> bool {
        if contents.is_empty() {
            return false;
        }
        match self.append_line(contents) {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(
                    error = %err,
                    path = %self.path.display(),
                    "Failed to write session log"
                );
                false
            }
        }
    }

    fn append_line(&self, contents: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| SafekeyError::io("create session log dir", e))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| SafekeyError::io("open session log", e))?;
        writeln!(file, "{}", contents).map_err(|e| SafekeyError::io("write session log", e))?;
        file.flush()
            .map_err(|e| SafekeyError::io("flush session log", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_flush_appends_one_line_per_session() {
        let temp = TempDir::new().unwrap();
        let log = SessionLog::new(&temp.path().join("session-log.txt"));

        assert!(log.flush("first session"));
        assert!(log.flush("second"));

        assert_eq!(
            std::fs::read_to_string(log.path()).unwrap(),
            "first session\nsecond\n"
        );
    }

    #[test]
    fn test_empty_session_writes_nothing() {
        let temp = TempDir::new().unwrap();
        let log = SessionLog::new(&temp.path().join("session-log.txt"));

        assert!(!log.flush(""));
        assert!(!log.path().exists());
    }

    #[test]
    fn test_write_failure_is_swallowed() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("file");
        std::fs::write(&blocker, "x").unwrap();

        let log = SessionLog::new(&blocker.join("session-log.txt"));
        assert!(!log.flush("lost"));
    }
}
