//! # safekey-core
//!
//! Capture pipeline for the SafeKey keyboard: keystroke buffers, message completion
//! detection, the durable CSV queue and its batch upload to the collection API.
//!
//! ## Design Principles
//!
//! - **Synchronous**: No async runtime. Network calls run on one dedicated worker thread.
//! - **Never in the way of typing**: Key handlers commit to the host first and swallow
//!   capture failures after logging them.
//! - **Durable first**: A completed message is on disk before any upload is attempted, and
//!   only what an accepted upload contained is ever removed.
//! - **Private fields stay private**: Password and incognito fields are never captured.
//! - **FFI-ready**: UniFFI annotations generate the Kotlin bindings the keyboard host uses.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use safekey_core::KeyboardEngine;
//!
//! let engine = KeyboardEngine::new(files_dir, surface)?;
//! engine.on_session_start();
//! engine.on_character("h".to_string());
//! ```

// UniFFI scaffolding for Kotlin/Swift bindings
uniffi::setup_scaffolding!();

pub mod api;
pub mod capture;
pub mod config;
pub mod engine;
pub mod error;
pub mod identity;
pub mod queue;
pub mod session_log;
pub mod storage;
pub mod surface;
pub mod upload;

pub use api::{load_registration, ApiClient, Registration};
pub use capture::{
    app_label_from_package, Completion, CompletionDetector, FieldShrinkDetector,
    FieldStateTracker, KeystrokeSink, MessageRecord,
};
pub use config::KeyboardConfig;
pub use engine::KeyboardEngine;
pub use error::{Result, SafekeyError, SafekeyFfiError};
pub use identity::UserIdentity;
pub use queue::{CommitOutcome, DurableQueue, QueueSnapshot};
pub use session_log::SessionLog;
pub use storage::StorageConfig;
pub use surface::InputSurface;
pub use upload::{BatchGates, BatchUploader, FlushOutcome, HttpTransport, Transport, TransportError};
