//! Batch upload of the message queue.
//!
//! Network calls never run on the capture thread. [`BatchUploader`] owns one worker
//! thread; the capture path only enqueues jobs:
//!
//! ```text
//! capture thread                 safekey-upload worker
//! ──────────────                 ─────────────────────
//! append record ─ trigger() ───▶ Flush: snapshot → gates → POST /endpoint → commit
//! DONE key ─── send_message() ─▶ SendMessage: POST /send
//! ```
//!
//! Flush triggers are coalesced: while one is waiting in the channel, further triggers are
//! dropped, since the queued flush will read the whole file anyway. There are no retries;
//! a failed flush leaves the queue intact and the next completion tries again.

mod transport;

#[cfg(test)]
pub(crate) use transport::test_utils;
pub use transport::{HttpTransport, Transport, TransportError};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, unbounded, Sender};
use safekey_protocol::{BATCH_PATH, CSV_CONTENT_TYPE};

use crate::api::ApiClient;
use crate::config::KeyboardConfig;
use crate::queue::{CommitOutcome, DurableQueue};

const WORKER_NAME: &str = "safekey-upload";

/// The two thresholds a flush must clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchGates {
    /// Count gate: records must be strictly greater than this.
    pub batch_size_threshold: u32,
    /// Payload gate: raw lines (header included) must be at least this.
    pub min_payload_lines: u32,
}

impl BatchGates {
    pub fn from_config(config: &KeyboardConfig) -> Self {
        Self {
            batch_size_threshold: config.batch_size_threshold,
            min_payload_lines: config.min_payload_lines,
        }
    }

    pub fn allows(&self, records: usize, lines: usize) -> bool {
        records > self.batch_size_threshold as usize && lines >= self.min_payload_lines as usize
    }
}

impl Default for BatchGates {
    fn default() -> Self {
        Self::from_config(&KeyboardConfig::default())
    }
}

/// Result of one flush attempt.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum FlushOutcome {
    /// A gate held the batch back; nothing was sent.
    GateClosed { records: u32, lines: u32 },
    /// The batch was accepted and removed from the queue.
    Sent { records: u32, retained: u32 },
    /// The endpoint answered with something other than 200; queue untouched.
    Rejected { status: u16 },
    /// The queue couldn't be read, the request never completed, or the clear failed.
    Failed { reason: String },
    /// The batch was accepted but the queue had already been cleared elsewhere.
    Superseded,
}

enum Job {
    Flush,
    SendMessage(String),
    Barrier(Sender<()>),
}

struct UploaderShared {
    queue: Arc<DurableQueue>,
    transport: Arc<dyn Transport>,
    api: ApiClient,
    gates: BatchGates,
    flush_lock: Mutex<()>,
    flush_queued: AtomicBool,
}

impl UploaderShared {
    fn flush(&self) -> FlushOutcome {
        let _guard = self
            .flush_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let snapshot = match self.queue.snapshot() {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to read queue for upload");
                return FlushOutcome::Failed {
                    reason: err.to_string(),
                };
            }
        };

        let records = snapshot.record_count();
        let lines = snapshot.line_count();
        if !self.gates.allows(records, lines) {
            tracing::debug!(records, lines, "Batch gates closed");
            return FlushOutcome::GateClosed {
                records: records as u32,
                lines: lines as u32,
            };
        }

        match self
            .transport
            .post(BATCH_PATH, CSV_CONTENT_TYPE, snapshot.content.clone())
        {
            Ok(200) => match self.queue.commit(&snapshot) {
                Ok(CommitOutcome::Cleared { retained }) => {
                    tracing::info!(records, retained, "Uploaded message batch");
                    FlushOutcome::Sent {
                        records: records as u32,
                        retained: retained as u32,
                    }
                }
                Ok(CommitOutcome::Stale) => {
                    tracing::warn!(records, "Queue changed generation during upload");
                    FlushOutcome::Superseded
                }
                Err(err) => {
                    tracing::error!(error = %err, "Batch uploaded but queue clear failed");
                    FlushOutcome::Failed {
                        reason: err.to_string(),
                    }
                }
            },
            Ok(status) => {
                tracing::warn!(status, records, "Batch upload rejected; queue kept");
                FlushOutcome::Rejected { status }
            }
            Err(err) => {
                tracing::warn!(error = %err, records, "Batch upload failed; queue kept");
                FlushOutcome::Failed {
                    reason: err.to_string(),
                }
            }
        }
    }

    fn run(&self, job: Job) {
        match job {
            Job::Flush => {
                self.flush_queued.store(false, Ordering::SeqCst);
                self.flush();
            }
            Job::SendMessage(message) => {
                if let Err(err) = self.api.send_message(&message) {
                    tracing::warn!(error = %err, "Single-message send failed");
                }
            }
            Job::Barrier(done) => {
                let _ = done.send(());
            }
        }
    }
}

/// Uploads the queue from a single background worker.
///
/// Dropping the uploader stops accepting jobs but does not wait for an in-flight request;
/// use [`BatchUploader::shutdown`] to wait.
pub struct BatchUploader {
    shared: Arc<UploaderShared>,
    jobs: Option<Sender<Job>>,
    worker: Option<JoinHandle<()>>,
}

impl BatchUploader {
    /// Starts the worker thread.
    pub fn spawn(
        queue: Arc<DurableQueue>,
        transport: Arc<dyn Transport>,
        gates: BatchGates,
    ) -> Self {
        let shared = Arc::new(UploaderShared {
            queue,
            api: ApiClient::new(Arc::clone(&transport)),
            transport,
            gates,
            flush_lock: Mutex::new(()),
            flush_queued: AtomicBool::new(false),
        });

        let (tx, rx) = unbounded::<Job>();
        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name(WORKER_NAME.to_string())
            .spawn(move || {
                for job in rx.iter() {
                    worker_shared.run(job);
                }
                tracing::debug!("Upload worker stopped");
            });

        let (jobs, worker) = match worker {
            Ok(handle) => (Some(tx), Some(handle)),
            Err(err) => {
                tracing::error!(
                    error = %err,
                    "Failed to start upload worker; uploads disabled"
                );
                (None, None)
            }
        };

        Self {
            shared,
            jobs,
            worker,
        }
    }

    pub fn gates(&self) -> BatchGates {
        self.shared.gates
    }

    /// Schedules a flush on the worker. Returns immediately.
    pub fn trigger(&self) {
        if self.shared.flush_queued.swap(true, Ordering::SeqCst) {
            return;
        }
        if !self.submit(Job::Flush) {
            self.shared.flush_queued.store(false, Ordering::SeqCst);
        }
    }

    /// Schedules a `POST /send` of one message on the worker.
    pub fn send_message(&self, message: String) {
        self.submit(Job::SendMessage(message));
    }

    /// Runs a flush on the calling thread.
    pub fn flush_now(&self) -> FlushOutcome {
        self.shared.flush()
    }

    /// Blocks until every job submitted before this call has finished.
    pub fn wait_idle(&self) {
        let (done_tx, done_rx) = bounded(1);
        if self.submit(Job::Barrier(done_tx)) {
            let _ = done_rx.recv();
        }
    }

    /// Stops the worker after it drains queued jobs, and waits for it.
    pub fn shutdown(mut self) {
        self.jobs.take();
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                tracing::error!("Upload worker panicked");
            }
        }
    }

    fn submit(&self, job: Job) -> bool {
        let Some(jobs) = self.jobs.as_ref() else {
            tracing::warn!("Upload worker unavailable; job dropped");
            return false;
        };
        if jobs.send(job).is_err() {
            tracing::warn!("Upload worker stopped; job dropped");
            return false;
        }
        true
    }
}

impl Drop for BatchUploader {
    fn drop(&mut self) {
        self.jobs.take();
    }
}
