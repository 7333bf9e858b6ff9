//! Keystroke capture.
//!
//! Everything here runs synchronously on the thread that delivers input events.
//!
//! ```text
//! commit/delete → KeystrokeSink → CompletionDetector → MessageRecord → DurableQueue
//!                  (buffers)       (field tracker)                      (queue.rs)
//! ```
//!
//! - [`sink`]: session and pending-message buffers
//! - [`detector`]: field-state tracking and the completion heuristic
//! - [`record`]: queue records and app labels

mod detector;
mod record;
mod sink;

pub use detector::{Completion, CompletionDetector, FieldShrinkDetector, FieldStateTracker};
pub use record::{app_label_from_package, MessageRecord};
pub use sink::KeystrokeSink;
