//! Completed-message records as they are written to the queue.

use chrono::NaiveDateTime;
use safekey_protocol::encode_record_line;

const UNKNOWN_APP: &str = "unknown";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// Package segments that say nothing about which app it is.
const GENERIC_SEGMENTS: &[&str] = &[
    "android", "app", "apps", "mobile", "lite", "client", "beta", "debug", "release", "prod",
];

/// One completed message. Immutable once queued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRecord {
    pub user_id: String,
    pub message: String,
    /// Local wall-clock time, `YYYY-MM-DDTHH:MM:SS.mmm`.
    pub timestamp: String,
    pub app_label: String,
}

impl MessageRecord {
    pub fn new(
        user_id: &str,
        message: &str,
        recorded_at: NaiveDateTime,
        package_name: Option<&str>,
    ) -> Self {
        Self {
            user_id: user_id.to_string(),
            message: message.to_string(),
            timestamp: recorded_at.format(TIMESTAMP_FORMAT).to_string(),
            app_label: app_label_from_package(package_name),
        }
    }

    /// The record's queue line, without the trailing newline.
    pub fn to_csv_line(&self) -> String {
        encode_record_line(&self.user_id, &self.message, &self.timestamp, &self.app_label)
    }
}

/// Best-effort short app name from a package id.
///
/// `com.whatsapp` → `whatsapp`, `org.telegram.messenger` → `messenger`,
/// `com.instagram.android` → `instagram`. Characters that would break the CSV column are
/// dropped; anything unusable becomes `unknown`.
pub fn app_label_from_package(package_name: Option<&str>) -> String {
    let Some(package) = package_name.map(str::trim).filter(|p| !p.is_empty()) else {
        return UNKNOWN_APP.to_string();
    };

    let segments: Vec<String> = package
        .split('.')
        .map(|segment| {
            segment
                .chars()
                .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
                .collect::<String>()
                .to_ascii_lowercase()
        })
        .filter(|segment| !segment.is_empty())
        .collect();

    segments
        .iter()
        .rev()
        .find(|segment| !GENERIC_SEGMENTS.contains(&segment.as_str()))
        .or_else(|| segments.last())
        .cloned()
        .unwrap_or_else(|| UNKNOWN_APP.to_string())
}
