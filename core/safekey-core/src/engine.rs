//! KeyboardEngine - the one object the keyboard host talks to.
//!
//! The host constructs a single engine when its input service starts and forwards key
//! events to it. The engine owns every piece of capture state, so nothing here is a
//! process-wide global:
//!
//! - keystroke buffers and the completion detector (behind one mutex, input thread only)
//! - the installation identity, resolved lazily on the first completed message
//! - the durable queue, shared with the upload worker
//! - the session log
//!
//! Key handlers never fail and never block on the network. A keystroke always reaches the
//! host, even if capture hits an I/O error.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! let engine = KeyboardEngine::new(files_dir, surface)?;
//! engine.on_session_start();
//! engine.on_character("h".into());
//! engine.on_delete();
//! engine.on_session_end();
//! ```

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Local;
use once_cell::sync::OnceCell;

use crate::api::{load_registration, ApiClient};
use crate::capture::{CompletionDetector, FieldShrinkDetector, KeystrokeSink, MessageRecord};
use crate::config::KeyboardConfig;
use crate::error::{Result, SafekeyError, SafekeyFfiError};
use crate::identity::UserIdentity;
use crate::queue::DurableQueue;
use crate::session_log::SessionLog;
use crate::storage::StorageConfig;
use crate::surface::InputSurface;
use crate::upload::{BatchGates, BatchUploader, FlushOutcome, HttpTransport, Transport};

struct CaptureState {
    sink: KeystrokeSink,
    detector: Box<dyn CompletionDetector>,
}

#[derive(uniffi::Object)]
pub struct KeyboardEngine {
    storage: StorageConfig,
    config: KeyboardConfig,
    surface: Arc<dyn InputSurface>,
    capture: Mutex<CaptureState>,
    identity: UserIdentity,
    user_id: OnceCell<String>,
    queue: Arc<DurableQueue>,
    uploader: BatchUploader,
    api: ApiClient,
    session_log: SessionLog,
}

impl KeyboardEngine {
    /// Builds an engine with an explicit transport.
    ///
    /// Used by tests and the CLI. Not exposed to FFI - use `new()` from the host.
    pub fn with_transport(
        storage: StorageConfig,
        config: KeyboardConfig,
        surface: Arc<dyn InputSurface>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        storage
            .ensure_dirs()
            .map_err(|e| SafekeyError::io("create storage root", e))?;

        let queue = Arc::new(DurableQueue::new(&storage.queue_file()));
        let uploader = BatchUploader::spawn(
            Arc::clone(&queue),
            Arc::clone(&transport),
            BatchGates::from_config(&config),
        );

        tracing::info!(
            root = %storage.root().display(),
            endpoint = %config.endpoint_base,
            batch_size_threshold = config.batch_size_threshold,
            min_payload_lines = config.min_payload_lines,
            "Keyboard engine ready"
        );

        Ok(Self {
            identity: UserIdentity::new(&storage.user_id_file()),
            session_log: SessionLog::new(&storage.session_log_file()),
            capture: Mutex::new(CaptureState {
                sink: KeystrokeSink::new(),
                detector: Box::new(FieldShrinkDetector::new()),
            }),
            user_id: OnceCell::new(),
            api: ApiClient::new(transport),
            storage,
            config,
            surface,
            queue,
            uploader,
        })
    }

    pub fn storage(&self) -> &StorageConfig {
        &self.storage
    }

    pub fn queue(&self) -> &DurableQueue {
        &self.queue
    }

    /// Swaps the completion heuristic (e.g. for an explicit send hook).
    pub fn replace_detector(&self, detector: Box<dyn CompletionDetector>) {
        tracing::debug!(detector = detector.name(), "Completion detector replaced");
        self.lock_capture().detector = detector;
    }

    /// Current pending-message buffer.
    pub fn pending_message(&self) -> String {
        self.lock_capture().sink.pending().to_string()
    }

    /// Current session buffer.
    pub fn session_text(&self) -> String {
        self.lock_capture().sink.session().to_string()
    }

    /// Blocks until the upload worker has finished everything queued so far.
    pub fn wait_for_uploads(&self) {
        self.uploader.wait_idle();
    }

    fn lock_capture(&self) -> MutexGuard<'_, CaptureState> {
        self.capture
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn field_text(&self) -> String {
        self.surface.text_before_cursor().unwrap_or_default()
    }

    fn record_completion(&self, message: &str) {
        if message.trim().is_empty() {
            tracing::debug!("Completion with blank message skipped");
            return;
        }

        let user_id = self.user_id.get_or_init(|| self.identity.load_or_create());
        let package = self.surface.package_name();
        let record = MessageRecord::new(
            user_id,
            message,
            Local::now().naive_local(),
            package.as_deref(),
        );

        if self.queue.append(&record) {
            tracing::debug!(app = %record.app_label, "Message queued");
            self.uploader.trigger();
        }
    }
}

#[uniffi::export]
impl KeyboardEngine {
    /// Creates an engine storing its files under `storage_root`.
    ///
    /// Reads `config.json` there (plus `SAFEKEY_ENDPOINT`) and posts to the configured
    /// endpoint over HTTPS.
    #[uniffi::constructor]
    pub fn new(
        storage_root: String,
        surface: Arc<dyn InputSurface>,
    ) -> std::result::Result<Self, SafekeyFfiError> {
        let storage = StorageConfig::with_root(storage_root.into());
        let config = KeyboardConfig::load(&storage);
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(&config.endpoint_base));
        Self::with_transport(storage, config, surface, transport)
            .map_err(SafekeyFfiError::from)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Input lifecycle
    // ─────────────────────────────────────────────────────────────────────────────

    /// Input view created: starts a fresh session.
    pub fn on_session_start(&self) {
        let mut state = self.lock_capture();
        state.sink.reset();
        state.detector.reset();
    }

    /// Commits `text` to the host and captures it.
    pub fn on_character(&self, text: String) {
        self.surface.commit_text(text.clone());
        if self.surface.is_private_field() {
            return;
        }

        let field = self.field_text();
        let completion = {
            let mut state = self.lock_capture();
            let CaptureState { sink, detector } = &mut *state;
            sink.push_str(&text);
            detector.after_commit(&field, sink.pending_mut())
        };

        if let Some(completion) = completion {
            self.record_completion(&completion.message);
        }
    }

    /// Deletes one character in the host and in both buffers.
    pub fn on_delete(&self) {
        self.surface.delete_before_cursor(1);
        if self.surface.is_private_field() {
            return;
        }

        let field = self.field_text();
        let mut state = self.lock_capture();
        state.sink.pop();
        state.detector.after_delete(&field);
    }

    /// DONE key: sends the message being composed through `POST /send`.
    pub fn on_done(&self) {
        if self.surface.is_private_field() {
            return;
        }
        let pending = self.pending_message();
        if pending.trim().is_empty() {
            return;
        }
        self.uploader.send_message(pending);
    }

    /// Input view torn down: appends the session to the session log.
    pub fn on_session_end(&self) {
        let session = self.lock_capture().sink.take_session();
        self.session_log.flush(&session);
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Queue
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn pending_record_count(&self) -> u32 {
        self.queue.count() as u32
    }

    /// Schedules a gated flush on the upload worker.
    pub fn request_upload(&self) {
        self.uploader.trigger();
    }

    /// Runs a gated flush on the calling thread. Don't call from the input thread.
    pub fn flush_now(&self) -> FlushOutcome {
        self.uploader.flush_now()
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Registration & identity
    // ─────────────────────────────────────────────────────────────────────────────

    /// Registers the installation with the collection API. Blocking; call off the UI
    /// thread.
    pub fn register(
        &self,
        email: String,
        child_age: String,
    ) -> std::result::Result<(), SafekeyFfiError> {
        let registration = self.api.register(&email, &child_age)?;
        registration.save(&self.storage)?;
        Ok(())
    }

    pub fn is_registered(&self) -> bool {
        load_registration(&self.storage).is_some()
    }

    pub fn user_id(&self) -> String {
        self.user_id
            .get_or_init(|| self.identity.load_or_create())
            .clone()
    }

    pub fn config(&self) -> KeyboardConfig {
        self.config.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::test_utils::RecordingTransport;
    use safekey_protocol::{parse_queue, SEND_PATH};
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::TempDir;

    #[derive(Default)]
    struct FakeSurface {
        field: Mutex<String>,
        private: AtomicBool,
    }

    impl FakeSurface {
        fn clear(&self) {
            self.field.lock().unwrap().clear();
        }
    }

    impl InputSurface for FakeSurface {
        fn commit_text(&self, text: String) {
            self.field.lock().unwrap().push_str(&text);
        }

        fn delete_before_cursor(&self, count: u32) {
            let mut field = self.field.lock().unwrap();
            for _ in 0..count {
                field.pop();
            }
        }

        fn text_before_cursor(&self) -> Option<String> {
            Some(self.field.lock().unwrap().clone())
        }

        fn package_name(&self) -> Option<String> {
            Some("com.whatsapp".to_string())
        }

        fn is_private_field(&self) -> bool {
            self.private.load(Ordering::SeqCst)
        }
    }

    fn engine(temp: &TempDir) -> (KeyboardEngine, Arc<FakeSurface>, Arc<RecordingTransport>) {
        let surface = Arc::new(FakeSurface::default());
        let transport = Arc::new(RecordingTransport::default());
        let engine = KeyboardEngine::with_transport(
            StorageConfig::with_root(temp.path().join("files")),
            KeyboardConfig::default(),
            Arc::clone(&surface) as Arc<dyn InputSurface>,
            Arc::clone(&transport) as Arc<dyn Transport>,
        )
        .unwrap();
        (engine, surface, transport)
    }

    fn type_text(engine: &KeyboardEngine, text: &str) {
        for c in text.chars() {
            engine.on_character(c.to_string());
        }
    }

    #[test]
    fn test_field_clear_queues_completed_message() {
        let temp = TempDir::new().unwrap();
        let (engine, surface, _transport) = engine(&temp);

        engine.on_session_start();
        type_text(&engine, "hello");
        surface.clear();
        engine.on_character("!".to_string());

        assert_eq!(engine.pending_message(), "!");
        assert_eq!(engine.pending_record_count(), 1);

        let content = std::fs::read_to_string(engine.storage().queue_file()).unwrap();
        let records = parse_queue(&content);
        assert_eq!(records[0].message, "hello");
        assert_eq!(records[0].package_name, "whatsapp");
        assert_eq!(records[0].user_id, engine.user_id());
    }

    #[test]
    fn test_private_field_commits_but_does_not_capture() {
        let temp = TempDir::new().unwrap();
        let (engine, surface, _transport) = engine(&temp);

        surface.private.store(true, Ordering::SeqCst);
        type_text(&engine, "secret");

        assert_eq!(surface.text_before_cursor().unwrap(), "secret");
        assert_eq!(engine.pending_message(), "");
        assert_eq!(engine.session_text(), "");
    }

    #[test]
    fn test_delete_edits_buffers_without_completing() {
        let temp = TempDir::new().unwrap();
        let (engine, _surface, _transport) = engine(&temp);

        type_text(&engine, "abc");
        engine.on_delete();
        engine.on_delete();
        engine.on_character("x".to_string());

        assert_eq!(engine.pending_message(), "ax");
        assert_eq!(engine.session_text(), "ax");
        assert_eq!(engine.pending_record_count(), 0);
    }

    #[test]
    fn test_session_end_flushes_session_log() {
        let temp = TempDir::new().unwrap();
        let (engine, _surface, _transport) = engine(&temp);

        engine.on_session_start();
        type_text(&engine, "hi there");
        engine.on_session_end();

        let log = std::fs::read_to_string(engine.storage().session_log_file()).unwrap();
        assert_eq!(log, "hi there\n");
        assert_eq!(engine.session_text(), "");
    }

    #[test]
    fn test_done_sends_pending_message() {
        let temp = TempDir::new().unwrap();
        let (engine, _surface, transport) = engine(&temp);

        type_text(&engine, "on my way");
        engine.on_done();
        engine.wait_for_uploads();

        let requests = transport.requests();
        let send = requests.iter().find(|r| r.path == SEND_PATH).unwrap();
        let body: serde_json::Value = serde_json::from_str(&send.body).unwrap();
        assert_eq!(body["message"], "on my way");
        assert_eq!(engine.pending_message(), "on my way");
    }

    #[test]
    fn test_done_with_blank_pending_sends_nothing() {
        let temp = TempDir::new().unwrap();
        let (engine, _surface, transport) = engine(&temp);

        type_text(&engine, "  ");
        engine.on_done();
        engine.wait_for_uploads();

        assert!(transport.requests().is_empty());
    }

    #[test]
    fn test_session_start_resets_field_snapshot() {
        let temp = TempDir::new().unwrap();
        let (engine, surface, _transport) = engine(&temp);

        type_text(&engine, "long draft");
        surface.clear();
        engine.on_session_start();
        engine.on_character("k".to_string());

        assert_eq!(engine.pending_record_count(), 0);
        assert_eq!(engine.pending_message(), "k");
    }

    #[test]
    fn test_register_persists_registration() {
        let temp = TempDir::new().unwrap();
        let (engine, _surface, _transport) = engine(&temp);

        assert!(!engine.is_registered());
        engine
            .register("parent@example.com".to_string(), "11".to_string())
            .unwrap();
        assert!(engine.is_registered());
    }

    #[test]
    fn test_register_blank_email_fails() {
        let temp = TempDir::new().unwrap();
        let (engine, _surface, transport) = engine(&temp);

        assert!(engine.register(" ".to_string(), "11".to_string()).is_err());
        assert!(!engine.is_registered());
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn test_user_id_is_stable() {
        let temp = TempDir::new().unwrap();
        let (engine, _surface, _transport) = engine(&temp);

        let id = engine.user_id();
        assert_eq!(id.len(), 26);
        assert_eq!(engine.user_id(), id);
        assert_eq!(
            std::fs::read_to_string(engine.storage().user_id_file()).unwrap(),
            id
        );
    }
}
