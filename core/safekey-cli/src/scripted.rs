//! In-memory host editor for driving the engine outside a device.

use safekey_core::{
    HttpTransport, InputSurface, KeyboardConfig, KeyboardEngine, StorageConfig, Transport,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// One text field plus the focused app, mutated by replay events.
#[derive(Default)]
pub struct ScriptedSurface {
    text: Mutex<String>,
    package: Mutex<Option<String>>,
    private: AtomicBool,
}

impl ScriptedSurface {
    pub fn text(&self) -> String {
        lock(&self.text).clone()
    }

    /// Empties the field, as a host app does after sending.
    pub fn clear(&self) {
        lock(&self.text).clear();
    }

    pub fn set_package(&self, package: Option<String>) {
        *lock(&self.package) = package;
    }

    pub fn set_private(&self, private: bool) {
        self.private.store(private, Ordering::SeqCst);
    }
}

impl InputSurface for ScriptedSurface {
    fn commit_text(&self, text: String) {
        lock(&self.text).push_str(&text);
    }

    fn delete_before_cursor(&self, count: u32) {
        let mut text = lock(&self.text);
        for _ in 0..count {
            text.pop();
        }
    }

    fn text_before_cursor(&self) -> Option<String> {
        Some(self.text())
    }

    fn package_name(&self) -> Option<String> {
        lock(&self.package).clone()
    }

    fn is_private_field(&self) -> bool {
        self.private.load(Ordering::SeqCst)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Opens an engine on `storage` that talks to the configured endpoint.
pub fn open_engine(
    storage: &StorageConfig,
    surface: Arc<ScriptedSurface>,
) -> Result<KeyboardEngine, String> {
    let config = KeyboardConfig::load(storage);
    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(&config.endpoint_base));
    open_engine_with(storage, config, surface, transport)
}

pub fn open_engine_with(
    storage: &StorageConfig,
    config: KeyboardConfig,
    surface: Arc<ScriptedSurface>,
    transport: Arc<dyn Transport>,
) -> Result<KeyboardEngine, String> {
    KeyboardEngine::with_transport(
        storage.clone(),
        config,
        surface as Arc<dyn InputSurface>,
        transport,
    )
    .map_err(|e| format!("Failed to open keyboard engine: {}", e))
}
