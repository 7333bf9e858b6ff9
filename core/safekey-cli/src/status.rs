//! Read-only view of a storage root.

use safekey_core::{load_registration, DurableQueue, StorageConfig, UserIdentity};
use safekey_protocol::parse_queue;
use std::fmt::Write as _;

pub fn run(storage: &StorageConfig, show: bool) -> Result<(), String> {
    print!("{}", render(storage, show)?);
    Ok(())
}

/// Builds the status report. Never creates files, including the user id.
pub fn render(storage: &StorageConfig, show: bool) -> Result<String, String> {
    let queue = DurableQueue::new(&storage.queue_file());
    let user_id = UserIdentity::new(&storage.user_id_file())
        .load()
        .unwrap_or_else(|| "(not assigned)".to_string());
    let registration = match load_registration(storage) {
        Some(r) => format!(
            "{} (child age {}, {})",
            r.email,
            r.child_age,
            r.registered_at.format("%Y-%m-%d %H:%M UTC")
        ),
        None => "not registered".to_string(),
    };

    let mut out = String::new();
    let _ = writeln!(out, "root:         {}", storage.root().display());
    let _ = writeln!(out, "user id:      {}", user_id);
    let _ = writeln!(out, "registration: {}", registration);
    let _ = writeln!(out, "pending:      {} records", queue.count());
    let _ = writeln!(out, "queue lines:  {}", queue.line_count());

    if show {
        let content = queue.snapshot().map_err(|e| e.to_string())?.content;
        for record in parse_queue(&content) {
            let _ = writeln!(
                out,
                "  {} [{}] {:?}",
                record.timestamp, record.package_name, record.message
            );
        }
    }
    Ok(out)
}
