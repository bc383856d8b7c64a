//! Write-Behind Queue Module
//!
//! A bounded queue of SQL writes drained by one background worker. Each write
//! is journaled before it reaches the store, retried once on failure and
//! recorded in a failure journal when the retry fails too.

mod journal;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::{BackpressurePolicy, SyncPolicy};
use crate::error::{CacheError, Result};
use crate::store::{ExecOutcome, Store};

pub use journal::{format_entry, format_failure, rotated_path, Journal};

// == Pending Write ==
/// Lifecycle of a queued write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteState {
    Queued,
    Journaled,
    Executed,
    Retrying,
    Failed,
}

/// A write waiting for the worker.
pub struct PendingWrite {
    pub sql: String,
    pub submitted_at: DateTime<Local>,
    pub state: WriteState,
    reply: Option<oneshot::Sender<Result<ExecOutcome>>>,
}

impl PendingWrite {
    fn new(sql: String, reply: Option<oneshot::Sender<Result<ExecOutcome>>>) -> Self {
        Self {
            sql,
            submitted_at: Local::now(),
            state: WriteState::Queued,
            reply,
        }
    }
}

enum Message {
    Write(PendingWrite),
    /// Queued behind every earlier write; stops the worker.
    Shutdown,
}

/// Whether the queue accepted a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Queued,
    Dropped,
}

// == Stats ==
#[derive(Default)]
struct Counters {
    executed: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

/// Counters of a queue since it started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub executed_writes: u64,
    pub failed_writes: u64,
    pub dropped_writes: u64,
}

// == Write-Behind Queue ==
/// Handle to one table's write queue and its worker.
pub struct WriteBehindQueue {
    table: String,
    sender: mpsc::Sender<Message>,
    backpressure: BackpressurePolicy,
    counters: Arc<Counters>,
    worker: Mutex<Option<JoinHandle<()>>>,
    journal_path: PathBuf,
    failed_journal_path: PathBuf,
}

impl WriteBehindQueue {
    /// Opens the table's journals and spawns the worker.
    pub fn start<S: Store>(store: Arc<S>, table: &str, policy: &SyncPolicy) -> Result<Self> {
        let dir = Path::new(&policy.journal_dir);
        let journal_path = dir.join(format!("{}_{}", table, policy.journal_file_name));
        let failed_journal_path = dir.join(format!("{}_{}", table, policy.failed_journal_file_name));

        let journal = Journal::open(&journal_path, policy.max_journal_bytes).map_err(|e| {
            CacheError::Config(format!("cannot open journal {}: {}", journal_path.display(), e))
        })?;
        let failed = Journal::open(&failed_journal_path, policy.max_journal_bytes).map_err(|e| {
            CacheError::Config(format!(
                "cannot open journal {}: {}",
                failed_journal_path.display(),
                e
            ))
        })?;

        let (sender, receiver) = mpsc::channel(policy.queue_capacity.max(1));
        let counters = Arc::new(Counters::default());
        let worker = Worker {
            table: table.to_string(),
            store,
            journal,
            failed,
            retry_delay: Duration::from_millis(policy.retry_delay_ms),
            counters: Arc::clone(&counters),
        };
        let handle = tokio::spawn(worker.run(receiver));

        info!(
            "Write-behind queue for '{}' started (capacity {}, journal {})",
            table,
            policy.queue_capacity,
            journal_path.display()
        );

        Ok(Self {
            table: table.to_string(),
            sender,
            backpressure: policy.backpressure,
            counters,
            worker: Mutex::new(Some(handle)),
            journal_path,
            failed_journal_path,
        })
    }

    /// Enqueues a write without waiting for its outcome.
    ///
    /// Under `DropAndLog` a full queue drops the write and logs a warning.
    pub async fn submit(&self, sql: String) -> SubmitOutcome {
        self.enqueue(PendingWrite::new(sql, None)).await
    }

    /// Enqueues a write and waits for the worker's result.
    pub async fn submit_and_wait(&self, sql: String) -> Result<ExecOutcome> {
        let (tx, rx) = oneshot::channel();
        if self.enqueue(PendingWrite::new(sql, Some(tx))).await == SubmitOutcome::Dropped {
            return Err(CacheError::CapacityExceeded(format!(
                "write queue for '{}' is full",
                self.table
            )));
        }
        rx.await.map_err(|_| {
            CacheError::QueuedWrite(format!(
                "write queue for '{}' stopped before the write ran",
                self.table
            ))
        })?
    }

    async fn enqueue(&self, write: PendingWrite) -> SubmitOutcome {
        let accepted = match self.backpressure {
            BackpressurePolicy::DropAndLog => self.sender.try_send(Message::Write(write)).is_ok(),
            BackpressurePolicy::Block => self.sender.send(Message::Write(write)).await.is_ok(),
        };
        if accepted {
            SubmitOutcome::Queued
        } else {
            self.counters.dropped.fetch_add(1, Ordering::Relaxed);
            warn!("Write queue for '{}' is full or closed, write dropped", self.table);
            SubmitOutcome::Dropped
        }
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            executed_writes: self.counters.executed.load(Ordering::Relaxed),
            failed_writes: self.counters.failed.load(Ordering::Relaxed),
            dropped_writes: self.counters.dropped.load(Ordering::Relaxed),
        }
    }

    pub fn journal_path(&self) -> &Path {
        &self.journal_path
    }

    pub fn failed_journal_path(&self) -> &Path {
        &self.failed_journal_path
    }

    /// Drains every queued write, then stops the worker. Later calls are no-ops.
    pub async fn close(&self) {
        let handle = self.worker.lock().take();
        let Some(handle) = handle else {
            return;
        };
        if self.sender.send(Message::Shutdown).await.is_err() {
            debug!("Write-behind worker for '{}' already stopped", self.table);
        }
        if let Err(e) = handle.await {
            error!("Write-behind worker for '{}' panicked: {}", self.table, e);
        }
    }
}

// == Worker ==
struct Worker<S> {
    table: String,
    store: Arc<S>,
    journal: Journal,
    failed: Journal,
    retry_delay: Duration,
    counters: Arc<Counters>,
}

impl<S: Store> Worker<S> {
    async fn run(mut self, mut receiver: mpsc::Receiver<Message>) {
        while let Some(message) = receiver.recv().await {
            match message {
                Message::Write(write) => self.process(write).await,
                Message::Shutdown => break,
            }
        }
        info!("Write-behind worker for '{}' stopped", self.table);
    }

    async fn process(&mut self, mut write: PendingWrite) {
        self.journal.rotate_if_needed();
        self.failed.rotate_if_needed();

        if let Err(e) = self.journal.append(&format_entry(write.submitted_at, &write.sql)) {
            error!(
                "Journal {} append failed: {}",
                self.journal.path().display(),
                e
            );
        }
        write.state = WriteState::Journaled;
        debug!(table = %self.table, sql = %write.sql, state = ?write.state, "write journaled");

        let result = match self.store.execute(&write.sql).await {
            Ok(outcome) => Ok(outcome),
            Err(first) => {
                write.state = WriteState::Retrying;
                warn!(
                    "Queued write for '{}' failed, retrying in {:?}: {}",
                    self.table, self.retry_delay, first
                );
                tokio::time::sleep(self.retry_delay).await;
                self.store.execute(&write.sql).await
            }
        };

        let reply = match result {
            Ok(outcome) => {
                write.state = WriteState::Executed;
                self.counters.executed.fetch_add(1, Ordering::Relaxed);
                debug!(table = %self.table, rows = outcome.rows_affected, state = ?write.state, "write executed");
                Ok(outcome)
            }
            Err(e) => {
                write.state = WriteState::Failed;
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                error!(
                    "Queued write for '{}' failed after retry: {} ({})",
                    self.table, e, write.sql
                );
                let line = format_failure(write.submitted_at, &e.to_string(), &write.sql);
                if let Err(io) = self.failed.append(&line) {
                    error!(
                        "Journal {} append failed: {}",
                        self.failed.path().display(),
                        io
                    );
                }
                Err(CacheError::QueuedWrite(e.to_string()))
            }
        };

        if let Some(tx) = write.reply.take() {
            let _ = tx.send(reply);
        }
    }
}
