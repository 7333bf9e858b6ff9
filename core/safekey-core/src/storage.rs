//! Storage configuration and path management for SafeKey.
//!
//! `StorageConfig` centralizes every file the keyboard writes, so the host only has to hand
//! over one directory (the app's private files dir on device, a temp dir in tests).
//!
//! ```text
//! {root}/
//! ├── messages.csv        # durable message queue (header + records)
//! ├── session-log.txt     # one line per keyboard session
//! ├── user-id             # installation identity
//! ├── registration.json   # parent registration, written after POST /register
//! ├── config.json         # endpoint and batch thresholds
//! └── logs/               # tracing output (CLI only)
//! ```

use std::path::{Path, PathBuf};

const ROOT_DIR_NAME: &str = "safekey";

/// Central configuration for all SafeKey storage paths.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    root: PathBuf,
}

impl StorageConfig {
    /// Creates a StorageConfig rooted at the given directory.
    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    /// Platform default root (`$XDG_DATA_HOME/safekey` or the OS equivalent).
    /// Returns None when the platform reports no local data directory.
    pub fn default_root() -> Option<PathBuf> {
        dirs::data_local_dir().map(|d| d.join(ROOT_DIR_NAME))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Files
    // ─────────────────────────────────────────────────────────────────────────────

    /// Path to the durable message queue.
    pub fn queue_file(&self) -> PathBuf {
        self.root.join("messages.csv")
    }

    /// Path to the per-session keystroke log.
    pub fn session_log_file(&self) -> PathBuf {
        self.root.join("session-log.txt")
    }

    /// Path to the persisted installation identifier.
    pub fn user_id_file(&self) -> PathBuf {
        self.root.join("user-id")
    }

    pub fn registration_file(&self) -> PathBuf {
        self.root.join("registration.json")
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.json")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// Ensures the root directory exists.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        fs_err::create_dir_all(&self.root)
    }
}
