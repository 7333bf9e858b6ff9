//! Host input surface, implemented by the keyboard app (Kotlin `InputConnection` glue).

/// What the engine needs from the host editor.
///
/// Every method is called on the input thread and must return promptly.
#[uniffi::export(with_foreign)]
pub trait InputSurface: Send + Sync {
    /// Commits text at the cursor.
    fn commit_text(&self, text: String);

    /// Deletes `count` characters before the cursor.
    fn delete_before_cursor(&self, count: u32);

    /// Text before the cursor in the focused field; None when the host can't tell.
    fn text_before_cursor(&self) -> Option<String>;

    /// Package id of the app owning the focused field.
    fn package_name(&self) -> Option<String>;

    /// True for password and no-personalized-learning fields. Keystrokes in these fields
    /// reach the host but are never captured.
    fn is_private_field(&self) -> bool;
}
