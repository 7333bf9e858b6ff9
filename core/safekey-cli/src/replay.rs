//! Replays a scripted keyboard session through the engine.
//!
//! Input is JSON lines, one event per line:
//!
//! ```text
//! {"event":"start"}
//! {"event":"package","name":"com.whatsapp"}
//! {"event":"type","text":"hello"}
//! {"event":"clear"}                 host app sent its field
//! {"event":"type","text":"!"}       → "hello" is queued, "!" stays pending
//! {"event":"delete","count":1}
//! {"event":"private","enabled":true}
//! {"event":"done"}
//! {"event":"end"}
//! ```
//!
//! `type` commits one character at a time, like key presses. Blank lines are skipped.

use fs_err as fs;
use safekey_core::{KeyboardEngine, StorageConfig};
use serde::Deserialize;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use std::sync::Arc;

use crate::scripted::{open_engine, ScriptedSurface};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReplayEvent {
    Start,
    Type {
        text: String,
    },
    Delete {
        #[serde(default = "one")]
        count: u32,
    },
    Clear,
    Package {
        name: Option<String>,
    },
    Private {
        enabled: bool,
    },
    Done,
    End,
}

fn one() -> u32 {
    1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    pub events: usize,
    pub queued: u32,
}

pub fn run(storage: &StorageConfig, file: Option<&Path>) -> Result<(), String> {
    let input: Box<dyn Read> = match file {
        Some(path) => Box::new(fs::File::open(path).map_err(|e| e.to_string())?),
        None => Box::new(io::stdin()),
    };
    let events = parse_events(BufReader::new(input))?;

    let surface = Arc::new(ScriptedSurface::default());
    let engine = open_engine(storage, Arc::clone(&surface))?;
    let summary = replay(&engine, &surface, &events);

    println!(
        "Replayed {} events; {} records pending",
        summary.events, summary.queued
    );
    Ok(())
}

pub fn parse_events(reader: impl BufRead) -> Result<Vec<ReplayEvent>, String> {
    let mut events = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| format!("Failed to read events: {}", e))?;
        if line.trim().is_empty() {
            continue;
        }
        let event = serde_json::from_str(&line)
            .map_err(|e| format!("Invalid event on line {}: {}", index + 1, e))?;
        events.push(event);
    }
    Ok(events)
}

/// Applies `events` in order, then waits for the upload worker to go idle.
pub fn replay(
    engine: &KeyboardEngine,
    surface: &ScriptedSurface,
    events: &[ReplayEvent],
) -> ReplaySummary {
    for event in events {
        tracing::debug!(?event, "Replaying event");
        match event {
            ReplayEvent::Start => engine.on_session_start(),
            ReplayEvent::Type { text } => {
                for c in text.chars() {
                    engine.on_character(c.to_string());
                }
            }
            ReplayEvent::Delete { count } => {
                for _ in 0..*count {
                    engine.on_delete();
                }
            }
            ReplayEvent::Clear => surface.clear(),
            ReplayEvent::Package { name } => surface.set_package(name.clone()),
            ReplayEvent::Private { enabled } => surface.set_private(*enabled),
            ReplayEvent::Done => engine.on_done(),
            ReplayEvent::End => engine.on_session_end(),
        }
    }

    engine.wait_for_uploads();
    ReplaySummary {
        events: events.len(),
        queued: engine.pending_record_count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripted::open_engine_with;
    use safekey_core::{KeyboardConfig, Transport, TransportError};
    use safekey_protocol::{parse_queue, SEND_PATH};
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct Paths(Mutex<Vec<String>>);

    impl Transport for Paths {
        fn post(&self, path: &str, _: &str, _: String) -> Result<u16, TransportError> {
            self.0.lock().unwrap().push(path.to_string());
            Ok(200)
        }
    }

    fn setup(temp: &TempDir) -> (KeyboardEngine, Arc<ScriptedSurface>, Arc<Paths>) {
        let storage = StorageConfig::with_root(temp.path().to_path_buf());
        let surface = Arc::new(ScriptedSurface::default());
        let paths = Arc::new(Paths::default());
        let engine = open_engine_with(
            &storage,
            KeyboardConfig::default(),
            Arc::clone(&surface),
            Arc::clone(&paths) as Arc<dyn Transport>,
        )
        .unwrap();
        (engine, surface, paths)
    }

    #[test]
    fn parses_all_event_kinds() {
        let input = r#"
{"event":"start"}
{"event":"type","text":"hi"}
{"event":"delete"}
{"event":"delete","count":3}
{"event":"clear"}
{"event":"package","name":"com.whatsapp"}
{"event":"package","name":null}
{"event":"private","enabled":true}
{"event":"done"}
{"event":"end"}
"#;
        let events = parse_events(input.as_bytes()).unwrap();
        assert_eq!(events.len(), 10);
        assert_eq!(events[2], ReplayEvent::Delete { count: 1 });
        assert_eq!(events[3], ReplayEvent::Delete { count: 3 });
        assert_eq!(events[6], ReplayEvent::Package { name: None });
    }

    #[test]
    fn reports_line_of_bad_event() {
        let err = parse_events("{\"event\":\"start\"}\n{\"event\":\"jump\"}\n".as_bytes())
            .unwrap_err();
        assert!(err.contains("line 2"), "{}", err);
    }

    #[test]
    fn replay_queues_message_on_field_clear() {
        let temp = TempDir::new().unwrap();
        let (engine, surface, _paths) = setup(&temp);

        let events = vec![
            ReplayEvent::Start,
            ReplayEvent::Package {
                name: Some("com.whatsapp".to_string()),
            },
            ReplayEvent::Type {
                text: "hello".to_string(),
            },
            ReplayEvent::Clear,
            ReplayEvent::Type {
                text: "!".to_string(),
            },
            ReplayEvent::End,
        ];
        let summary = replay(&engine, &surface, &events);

        assert_eq!(summary, ReplaySummary { events: 6, queued: 1 });
        let content = std::fs::read_to_string(engine.storage().queue_file()).unwrap();
        let records = parse_queue(&content);
        assert_eq!(records[0].message, "hello");
        assert_eq!(records[0].package_name, "whatsapp");
        assert_eq!(
            std::fs::read_to_string(engine.storage().session_log_file()).unwrap(),
            "hello!\n"
        );
    }

    #[test]
    fn replay_done_posts_send() {
        let temp = TempDir::new().unwrap();
        let (engine, surface, paths) = setup(&temp);

        let events = vec![
            ReplayEvent::Type {
                text: "bye".to_string(),
            },
            ReplayEvent::Done,
        ];
        replay(&engine, &surface, &events);

        assert_eq!(*paths.0.lock().unwrap(), vec![SEND_PATH.to_string()]);
    }

    #[test]
    fn replay_private_field_commits_only() {
        let temp = TempDir::new().unwrap();
        let (engine, surface, _paths) = setup(&temp);

        let events = vec![
            ReplayEvent::Private { enabled: true },
            ReplayEvent::Type {
                text: "pin1234".to_string(),
            },
            ReplayEvent::Delete { count: 2 },
        ];
        replay(&engine, &surface, &events);

        assert_eq!(surface.text(), "pin12");
        assert_eq!(engine.session_text(), "");
    }
}
