//! Debounced background persistence for the snippet collection
//!
//! Every mutation of the store sends a [`PersistEvent::Changed`] to a tokio
//! task. Each event pushes the write deadline back by the debounce delay, so
//! a burst of edits results in a single write. When the deadline passes the
//! task serializes whatever the collection holds at that moment, never an
//! older snapshot.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use log::{debug, error, warn};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use crate::error::{Result, VaultError};
use crate::models::{Snippet, SnippetBackend};

pub type SharedSnippets = Arc<RwLock<Vec<Snippet>>>;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

pub enum PersistEvent {
    Changed,
    /// Write any pending state now and report the outcome
    Flush(oneshot::Sender<Result<()>>),
}

/// Outcome of a debounced write, delivered back to the owner of the store
#[derive(Debug)]
pub enum PersistReport {
    Saved { count: usize },
    Failed(VaultError),
}

/// Serializes the collection into the string stored by a backend
pub fn serialize_collection(snippets: &[Snippet]) -> Result<String> {
    serde_json::to_string(snippets).map_err(|e| VaultError::PersistenceWrite(e.to_string()))
}

struct DebouncedWriter {
    snippets: SharedSnippets,
    backend: Arc<dyn SnippetBackend>,
    delay: Duration,
    reports: mpsc::UnboundedSender<PersistReport>,
    /// Memory holds changes storage has not accepted yet. Only a successful
    /// write clears it.
    dirty: bool,
}

impl DebouncedWriter {
    /// Returns the new deadline, if a debounced write is scheduled
    fn handle_event(&mut self, event: PersistEvent) -> Option<Instant> {
        match event {
            PersistEvent::Changed => {
                self.dirty = true;
                Some(Instant::now() + self.delay)
            }
            PersistEvent::Flush(ack) => {
                let result = if self.dirty {
                    self.write_latest().map(|_| ())
                } else {
                    Ok(())
                };
                let _ = ack.send(result);
                None
            }
        }
    }

    fn finish_debounce(&mut self) {
        let report = match self.write_latest() {
            Ok(count) => PersistReport::Saved { count },
            Err(err) => PersistReport::Failed(err),
        };
        // The store may already be gone during shutdown
        let _ = self.reports.send(report);
    }

    fn write_latest(&mut self) -> Result<usize> {
        let (contents, count) = {
            let snippets = self.snippets.read().unwrap_or_else(PoisonError::into_inner);
            (serialize_collection(&snippets)?, snippets.len())
        };

        match self.backend.write(&contents) {
            Ok(()) => {
                debug!("persisted {count} snippets");
                self.dirty = false;
                Ok(count)
            }
            Err(err) => {
                error!("failed to persist snippets: {err:#}");
                Err(VaultError::PersistenceWrite(format!("{err:#}")))
            }
        }
    }
}

async fn run(mut writer: DebouncedWriter, mut rx: mpsc::UnboundedReceiver<PersistEvent>) {
    let mut deadline = None;
    loop {
        let event = match deadline {
            Some(deadline_) => match tokio::time::timeout_at(deadline_, rx.recv()).await {
                Ok(event) => event,
                Err(_) => {
                    writer.finish_debounce();
                    deadline = None;
                    continue;
                }
            },
            None => rx.recv().await,
        };
        let Some(event) = event else {
            if writer.dirty {
                writer.finish_debounce();
            }
            break;
        };
        deadline = writer.handle_event(event);
    }
}

/// Handle to the background writer task
pub struct Persister {
    tx: mpsc::UnboundedSender<PersistEvent>,
    reports: mpsc::UnboundedReceiver<PersistReport>,
}

impl Persister {
    /// Spawns the writer task. Must be called from within a tokio runtime.
    pub fn spawn(snippets: SharedSnippets, backend: Arc<dyn SnippetBackend>, delay: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (report_tx, reports) = mpsc::unbounded_channel();
        let writer = DebouncedWriter {
            snippets,
            backend,
            delay,
            reports: report_tx,
            dirty: false,
        };
        tokio::spawn(run(writer, rx));

        Self { tx, reports }
    }

    /// Cancels any pending write and reschedules it one delay from now
    pub fn schedule(&self) {
        if self.tx.send(PersistEvent::Changed).is_err() {
            warn!("persistence task has stopped; change will not be saved");
        }
    }

    /// Writes pending changes immediately
    pub async fn flush(&self) -> Result<()> {
        let (ack, done) = oneshot::channel();
        self.tx
            .send(PersistEvent::Flush(ack))
            .map_err(|_| VaultError::PersistenceWrite("persistence task has stopped".into()))?;
        done.await
            .map_err(|_| VaultError::PersistenceWrite("persistence task has stopped".into()))?
    }

    /// Reports of every debounced write completed since the last call
    pub fn drain_reports(&mut self) -> Vec<PersistReport> {
        let mut reports = Vec::new();
        while let Ok(report) = self.reports.try_recv() {
            reports.push(report);
        }
        reports
    }
}
