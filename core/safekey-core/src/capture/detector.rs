//! Message completion detection.
//!
//! The keyboard never sees the host app's "send" button, so completion is inferred from the
//! host field. [`FieldShrinkDetector`] implements the heuristic in use today; it sits behind
//! [`CompletionDetector`] so an explicit send hook can replace it without touching the queue
//! or uploader.
//!
//! ```text
//! typed "hello"   field "hello"   snapshot "hello"
//! host sends      field ""        (no keystroke, nothing observed)
//! typed "!"       field "!"       1 < 5  -> completion "hello", pending "!"
//! ```
//!
//! The character that reveals the truncation is the first character of the next message,
//! which is why the completed message excludes the last pending character and the pending
//! buffer keeps it.

/// A message inferred to have been submitted by the host app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub message: String,
}

/// Decides when the pending buffer holds a submitted message.
pub trait CompletionDetector: Send {
    /// Short identifier for logs.
    fn name(&self) -> &'static str;

    /// Called after every character commit with the host's text before the cursor.
    ///
    /// On completion the detector takes the message out of `pending` and leaves whatever
    /// belongs to the next message behind.
    fn after_commit(&mut self, field_text: &str, pending: &mut String) -> Option<Completion>;

    /// Called after every delete. Updates field state without detecting.
    fn after_delete(&mut self, field_text: &str);

    /// Forgets all field state (new keyboard session).
    fn reset(&mut self);
}

/// Remembers the last observed field text.
///
/// Lengths are compared in characters, not bytes.
#[derive(Debug, Default, Clone)]
pub struct FieldStateTracker {
    snapshot: String,
}

impl FieldStateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> &str {
        &self.snapshot
    }

    /// True when the previous snapshot is non-blank and `current` is strictly shorter.
    pub fn is_truncation(&self, current: &str) -> bool {
        !self.snapshot.trim().is_empty()
            && current.chars().count() < self.snapshot.chars().count()
    }

    pub fn update(&mut self, current: &str) {
        self.snapshot.clear();
        self.snapshot.push_str(current);
    }

    pub fn reset(&mut self) {
        self.snapshot.clear();
    }
}

/// Field-shrink heuristic: the host cleared its field, so the pending buffer was sent.
#[derive(Debug, Default)]
pub struct FieldShrinkDetector {
    tracker: FieldStateTracker,
}

impl FieldShrinkDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tracker(&self) -> &FieldStateTracker {
        &self.tracker
    }
}

impl CompletionDetector for FieldShrinkDetector {
    fn name(&self) -> &'static str {
        "field-shrink"
    }

    fn after_commit(&mut self, field_text: &str, pending: &mut String) -> Option<Completion> {
        let completion = self
            .tracker
            .is_truncation(field_text)
            .then(|| split_completed(pending));
        self.tracker.update(field_text);
        completion
    }

    fn after_delete(&mut self, field_text: &str) {
        self.tracker.update(field_text);
    }

    fn reset(&mut self) {
        self.tracker.reset();
    }
}

/// Everything but the last pending character becomes the message; the last character
/// stays pending.
fn split_completed(pending: &mut String) -> Completion {
    let carry = pending.pop();
    let message = std::mem::take(pending);
    if let Some(c) = carry {
        pending.push(c);
    }
    Completion { message }
}
