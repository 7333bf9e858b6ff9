//! Error types for safekey-core operations.
//! Keep SafekeyFfiError minimal and stable to avoid breaking the keyboard host.

use crate::upload::TransportError;

// ═══════════════════════════════════════════════════════════════════════════════
// FFI-Compatible Error (for Kotlin/Swift)
// ═══════════════════════════════════════════════════════════════════════════════

/// FFI-safe error type for use across the keyboard host boundary.
///
/// Carries only a message string, which keeps it compatible with UniFFI's error handling.
#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum SafekeyFfiError {
    #[error("{message}")]
    General { message: String },
}

impl From<String> for SafekeyFfiError {
    fn from(message: String) -> Self {
        SafekeyFfiError::General { message }
    }
}

impl From<&str> for SafekeyFfiError {
    fn from(message: &str) -> Self {
        SafekeyFfiError::General {
            message: message.to_string(),
        }
    }
}

impl From<SafekeyError> for SafekeyFfiError {
    fn from(err: SafekeyError) -> Self {
        SafekeyFfiError::General {
            message: err.to_string(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Internal Error (for Rust-only use)
// ═══════════════════════════════════════════════════════════════════════════════

/// All errors that can occur in safekey-core operations.
///
/// Capture-path callers log these and carry on; only the registration flow and the
/// CLI surface them to a user.
#[derive(Debug, thiserror::Error)]
pub enum SafekeyError {
    // ─────────────────────────────────────────────────────────────────────
    // Storage Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("No storage root available for keyboard data")]
    StorageRootUnavailable,

    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    // ─────────────────────────────────────────────────────────────────────
    // Remote Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Transport failed: {0}")]
    Transport(#[from] TransportError),

    #[error("Remote rejected {endpoint}: HTTP {status}")]
    RemoteStatus { endpoint: String, status: u16 },

    // ─────────────────────────────────────────────────────────────────────
    // Input Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Invalid input: {0}")]
    Validation(String),
}

impl SafekeyError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        SafekeyError::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        SafekeyError::Json {
            context: context.into(),
            source,
        }
    }
}

/// Convenience type alias for Results using SafekeyError.
pub type Result<T> = std::result::Result<T, SafekeyError>;

impl From<SafekeyError> for String {
    fn from(err: SafekeyError) -> String {
        err.to_string()
    }
}
