//! Keystroke sink: the session buffer and the pending-message buffer.

/// Buffers fed by committed characters and deletes.
///
/// The two buffers are independent: the session buffer is the full history of one keyboard
/// activation, the pending buffer is the message currently being composed and is cut short
/// whenever a completion is detected.
#[derive(Debug, Default, Clone)]
pub struct KeystrokeSink {
    session: String,
    pending: String,
}

impl KeystrokeSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, c: char) {
        self.session.push(c);
        self.pending.push(c);
    }

    pub fn push_str(&mut self, text: &str) {
        for c in text.chars() {
            self.push(c);
        }
    }

    /// Removes the last character of each buffer. Empty buffers are left alone.
    pub fn pop(&mut self) {
        self.session.pop();
        self.pending.pop();
    }

    pub fn session(&self) -> &str {
        &self.session
    }

    pub fn pending(&self) -> &str {
        &self.pending
    }

    pub(crate) fn pending_mut(&mut self) -> &mut String {
        &mut self.pending
    }

    /// Hands over the session buffer, leaving it empty.
    pub fn take_session(&mut self) -> String {
        std::mem::take(&mut self.session)
    }

    pub fn reset(&mut self) {
        self.session.clear();
        self.pending.clear();
    }
}
