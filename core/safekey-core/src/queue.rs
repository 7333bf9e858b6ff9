//! Durable message queue backed by a CSV file.
//!
//! The file is append-only between clears. Its first line is always
//! [`QUEUE_HEADER`](safekey_protocol::QUEUE_HEADER) once anything has been written, and
//! a clear rewrites it to exactly that header.
//!
//! # Upload race
//!
//! The capture thread appends while the upload worker reads, posts and clears. Every file
//! mutation happens under one mutex, and every clear bumps a generation counter. The
//! uploader works from a [`QueueSnapshot`] and hands it back to [`DurableQueue::commit`],
//! which removes only the bytes that were uploaded:
//!
//! ```text
//! snapshot(gen 4) = header + r1 + r2      capture appends r3
//! POST ok → commit(gen 4) → header + r3   generation 5
//! ```
//!
//! A commit against a stale generation leaves the file alone.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use fs_err as fs;
use fs_err::OpenOptions;
use safekey_protocol::{count_lines, count_records, QUEUE_HEADER};
use tempfile::NamedTempFile;

use crate::capture::MessageRecord;
use crate::error::{Result, SafekeyError};

/// Queue content captured for an upload attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueSnapshot {
    pub generation: u64,
    pub content: String,
}

impl QueueSnapshot {
    pub fn record_count(&self) -> usize {
        count_records(&self.content)
    }

    pub fn line_count(&self) -> usize {
        count_lines(&self.content)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The uploaded prefix was removed; `retained` records arrived after the snapshot.
    Cleared { retained: usize },
    /// The queue was cleared or rewritten since the snapshot; nothing was touched.
    Stale,
}

#[derive(Debug, Default)]
struct QueueState {
    generation: u64,
}

#[derive(Debug)]
pub struct DurableQueue {
    path: PathBuf,
    state: Mutex<QueueState>,
}

impl DurableQueue {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            state: Mutex::new(QueueState::default()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Appends one record. Failures are logged and reported as `false`, never raised.
    pub fn append(&self, record: &MessageRecord) -> bool {
        match self.try_append(record) {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(
                    error = %err,
                    path = %self.path.display(),
                    "Failed to append message record"
                );
                false
            }
        }
    }

    pub fn try_append(&self, record: &MessageRecord) -> Result<()> {
        let _guard = self.lock();

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| SafekeyError::io("create queue dir", e))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| SafekeyError::io("open queue", e))?;

        let is_empty = file
            .metadata()
            .map_err(|e| SafekeyError::io("stat queue", e))?
            .len()
            == 0;

        let mut chunk = String::new();
        if is_empty {
            chunk.push_str(QUEUE_HEADER);
            chunk.push('\n');
        }
        chunk.push_str(&record.to_csv_line());
        chunk.push('\n');

        file.write_all(chunk.as_bytes())
            .map_err(|e| SafekeyError::io("write queue record", e))?;
        file.flush()
            .map_err(|e| SafekeyError::io("flush queue record", e))?;
        Ok(())
    }

    /// Number of pending records; 0 if the file is absent or unreadable.
    pub fn count(&self) -> usize {
        let _guard = self.lock();
        self.read_content().map(|c| count_records(&c)).unwrap_or(0)
    }

    /// Raw line count of the queue file, header included.
    pub fn line_count(&self) -> usize {
        let _guard = self.lock();
        self.read_content().map(|c| count_lines(&c)).unwrap_or(0)
    }

    /// Truncates the queue to the header line.
    pub fn clear(&self) -> Result<()> {
        let mut state = self.lock();
        self.rewrite("")?;
        state.generation += 1;
        Ok(())
    }

    /// Reads the current content together with the generation it belongs to.
    pub fn snapshot(&self) -> Result<QueueSnapshot> {
        let state = self.lock();
        Ok(QueueSnapshot {
            generation: state.generation,
            content: self.read_content()?,
        })
    }

    /// Removes the uploaded snapshot from the queue, keeping anything appended since.
    pub fn commit(&self, snapshot: &QueueSnapshot) -> Result<CommitOutcome> {
        let mut state = self.lock();
        if state.generation != snapshot.generation {
            return Ok(CommitOutcome::Stale);
        }

        let current = self.read_content()?;
        let Some(tail) = current.strip_prefix(snapshot.content.as_str()) else {
            tracing::warn!(
                path = %self.path.display(),
                "Queue no longer starts with uploaded content; leaving it untouched"
            );
            return Ok(CommitOutcome::Stale);
        };

        let retained = count_records(&format!("{}\n{}", QUEUE_HEADER, tail));
        self.rewrite(tail)?;
        state.generation += 1;
        Ok(CommitOutcome::Cleared { retained })
    }

    fn read_content(&self) -> Result<String> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(content),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(err) => Err(SafekeyError::io("read queue", err)),
        }
    }

    /// Atomically replaces the file with the header followed by `records`.
    fn rewrite(&self, records: &str) -> Result<()> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| SafekeyError::Validation("queue path has no parent".to_string()))?;
        fs::create_dir_all(parent).map_err(|e| SafekeyError::io("create queue dir", e))?;

        let mut temp_file =
            NamedTempFile::new_in(parent).map_err(|e| SafekeyError::io("queue temp file", e))?;
        temp_file
            .write_all(format!("{}\n{}", QUEUE_HEADER, records).as_bytes())
            .map_err(|e| SafekeyError::io("write queue temp file", e))?;
        temp_file
            .flush()
            .map_err(|e| SafekeyError::io("flush queue temp file", e))?;
        temp_file
            .persist(&self.path)
            .map_err(|e| SafekeyError::io("replace queue", e.error))?;
        Ok(())
    }
}
