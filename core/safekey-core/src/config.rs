//! Keyboard configuration loading and saving.
//!
//! `config.json` under the storage root holds the collection endpoint and the two batch
//! gate thresholds. A missing or corrupt file yields defaults; the keyboard must come up
//! even when its configuration is damaged.

use crate::error::{Result, SafekeyError};
use crate::storage::StorageConfig;
use fs_err as fs;
use serde::{Deserialize, Serialize};

/// Overrides `endpoint_base` when set.
pub const ENDPOINT_ENV: &str = "SAFEKEY_ENDPOINT";

pub const DEFAULT_ENDPOINT_BASE: &str = "https://your-api-url.com";
pub const DEFAULT_BATCH_SIZE_THRESHOLD: u32 = 3;
pub const DEFAULT_MIN_PAYLOAD_LINES: u32 = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
#[serde(default)]
pub struct KeyboardConfig {
    /// Scheme + host of the collection API, without a trailing slash.
    pub endpoint_base: String,
    /// Count gate: a flush needs strictly more pending records than this.
    pub batch_size_threshold: u32,
    /// Payload gate: a flush needs at least this many raw lines in the queue file.
    pub min_payload_lines: u32,
}

impl Default for KeyboardConfig {
    fn default() -> Self {
        Self {
            endpoint_base: DEFAULT_ENDPOINT_BASE.to_string(),
            batch_size_threshold: DEFAULT_BATCH_SIZE_THRESHOLD,
            min_payload_lines: DEFAULT_MIN_PAYLOAD_LINES,
        }
    }
}

impl KeyboardConfig {
    /// Loads `config.json`, then applies environment overrides.
    pub fn load(storage: &StorageConfig) -> Self {
        Self::load_file(storage).with_overrides(|key| std::env::var(key).ok())
    }

    /// Loads `config.json` only, returning defaults if it's missing or unreadable.
    pub fn load_file(storage: &StorageConfig) -> Self {
        let path = storage.config_file();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(err) => {
                tracing::warn!(error = %err, "Failed to read keyboard config; using defaults");
                return Self::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    path = %path.display(),
                    "Malformed keyboard config; using defaults"
                );
                Self::default()
            }
        }
    }

    /// Applies overrides from a key lookup (the process environment in production).
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(endpoint) = lookup(ENDPOINT_ENV).filter(|v| !v.trim().is_empty()) {
            self.endpoint_base = endpoint.trim().to_string();
        }
        self.endpoint_base = self.endpoint_base.trim_end_matches('/').to_string();
        self
    }

    pub fn save(&self, storage: &StorageConfig) -> Result<()> {
        storage
            .ensure_dirs()
            .map_err(|e| SafekeyError::io("create storage root", e))?;
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| SafekeyError::json("serialize keyboard config", e))?;
        fs::write(storage.config_file(), content)
            .map_err(|e| SafekeyError::io("write keyboard config", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = KeyboardConfig::default();
        assert_eq!(config.batch_size_threshold, 3);
        assert_eq!(config.min_payload_lines, 50);
        assert_eq!(config.endpoint_base, DEFAULT_ENDPOINT_BASE);
    }

    #[test]
    fn test_missing_file_returns_defaults() {
        let temp = TempDir::new().unwrap();
        let storage = StorageConfig::with_root(temp.path().to_path_buf());
        assert_eq!(KeyboardConfig::load_file(&storage), KeyboardConfig::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let temp = TempDir::new().unwrap();
        let storage = StorageConfig::with_root(temp.path().to_path_buf());
        std::fs::write(storage.config_file(), r#"{"batch_size_threshold": 10}"#).unwrap();

        let config = KeyboardConfig::load_file(&storage);
        assert_eq!(config.batch_size_threshold, 10);
        assert_eq!(config.min_payload_lines, DEFAULT_MIN_PAYLOAD_LINES);
    }

    #[test]
    fn test_corrupt_file_returns_defaults() {
        let temp = TempDir::new().unwrap();
        let storage = StorageConfig::with_root(temp.path().to_path_buf());
        std::fs::write(storage.config_file(), "{not json").unwrap();

        assert_eq!(KeyboardConfig::load_file(&storage), KeyboardConfig::default());
    }

    #[test]
    fn test_save_round_trip() {
        let temp = TempDir::new().unwrap();
        let storage = StorageConfig::with_root(temp.path().join("root"));
        let config = KeyboardConfig {
            endpoint_base: "http://127.0.0.1:9000".to_string(),
            batch_size_threshold: 1,
            min_payload_lines: 2,
        };

        config.save(&storage).unwrap();
        assert_eq!(KeyboardConfig::load_file(&storage), config);
    }

    #[test]
    fn test_endpoint_override_trims_trailing_slash() {
        let config = KeyboardConfig::default().with_overrides(|key| {
            (key == ENDPOINT_ENV).then(|| "http://localhost:8080/".to_string())
        });
        assert_eq!(config.endpoint_base, "http://localhost:8080");
    }

    #[test]
    fn test_blank_override_is_ignored() {
        let config = KeyboardConfig::default().with_overrides(|_| Some("  ".to_string()));
        assert_eq!(config.endpoint_base, DEFAULT_ENDPOINT_BASE);
    }
}
