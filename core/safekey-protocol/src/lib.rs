//! Wire contract for the SafeKey collection endpoint.
//!
//! Shared by the keyboard core (which produces queue files and request bodies) and by
//! tooling that reads them back, so both sides agree on paths, content types and the CSV
//! dialect of the message queue.
//!
//! The queue dialect is deliberately small: plain comma separation, the message column is
//! always quote-wrapped with internal quotes doubled, every other column is written bare.

use serde::{Deserialize, Serialize};

pub const QUEUE_HEADER: &str = "userId,message,timestamp,packageName";

pub const REGISTER_PATH: &str = "/register";
pub const SEND_PATH: &str = "/send";
pub const BATCH_PATH: &str = "/endpoint";

pub const CSV_CONTENT_TYPE: &str = "application/csv";
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Body of `POST /register`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    #[serde(rename = "childAge")]
    pub child_age: String,
}

/// Body of `POST /send`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub message: String,
}

/// One decoded line of the message queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueRecord {
    pub user_id: String,
    pub message: String,
    pub timestamp: String,
    pub package_name: String,
}

/// Wraps a field in quotes, doubling any quote it contains.
pub fn quote_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Formats one queue line (without the trailing newline).
pub fn encode_record_line(
    user_id: &str,
    message: &str,
    timestamp: &str,
    app_label: &str,
) -> String {
    format!(
        "{},{},{},{}",
        user_id,
        quote_field(message),
        timestamp,
        app_label
    )
}

/// Splits CSV content into rows using standard quoted-field rules.
///
/// Quoted fields may contain commas, newlines and doubled quotes. `\r\n` line endings are
/// accepted.
pub fn parse_rows(content: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut fields: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut row_started = false;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
            continue;
        }

        match c {
            '"' => {
                in_quotes = true;
                row_started = true;
            }
            ',' => {
                fields.push(std::mem::take(&mut field));
                row_started = true;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                fields.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut fields));
                row_started = false;
            }
            other => {
                field.push(other);
                row_started = true;
            }
        }
    }

    if row_started || !field.is_empty() {
        fields.push(field);
        rows.push(fields);
    }

    rows
}

/// Decodes the records of a queue file, skipping the header and malformed rows.
pub fn parse_queue(content: &str) -> Vec<QueueRecord> {
    parse_rows(content)
        .into_iter()
        .filter(|row| row.join(",") != QUEUE_HEADER)
        .filter_map(|row| match <[String; 4]>::try_from(row) {
            Ok([user_id, message, timestamp, package_name]) => Some(QueueRecord {
                user_id,
                message,
                timestamp,
                package_name,
            }),
            Err(_) => None,
        })
        .collect()
}

/// Number of records in queue content, not counting the header.
///
/// Line breaks inside quoted messages do not start a new record, and blank lines are not
/// records.
pub fn count_records(content: &str) -> usize {
    let mut rows: usize = 0;
    let mut in_quotes = false;
    let mut at_row_start = true;

    for c in content.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                at_row_start = false;
            }
            '\n' if !in_quotes => {
                if !at_row_start {
                    rows += 1;
                }
                at_row_start = true;
            }
            _ => at_row_start = false,
        }
    }

    if !at_row_start {
        rows += 1;
    }

    rows.saturating_sub(1)
}

/// Raw line count of the content, used by the payload gate.
pub fn count_lines(content: &str) -> usize {
    content.lines().count()
}
