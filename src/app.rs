use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{error, info, warn};

use crate::config::Config;
use crate::error::{Result, VaultError};
use crate::filter::{Selection, derive_view};
use crate::models::export::{self, read_import_file, write_export};
use crate::models::{Facets, FileBackend, Snippet, SnippetBackend, SnippetInput, SnippetPatch};
use crate::persist::PersistReport;
use crate::store::{ImportSummary, SnippetStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
    Error,
}

/// A user-facing outcome report, e.g. for a toast or a status line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// Application state shared by every front end.
///
/// Owns the snippet store and the active filter selection, and turns the
/// outcome of each operation into [`Notice`]s. Front ends hold one `App` for
/// the session and call [`App::shutdown`] when done so pending writes land.
pub struct App {
    store: SnippetStore,
    pub selection: Selection,
    notices: Vec<Notice>,
}

impl App {
    /// Builds the application over `backend` and loads the stored collection.
    /// Must be called from within a tokio runtime.
    pub fn new(backend: Arc<dyn SnippetBackend>, config: &Config) -> Self {
        let mut store = SnippetStore::new(backend, config.debounce());
        store.hydrate();

        Self {
            store,
            selection: Selection::with_sort(config.default_sort),
            notices: Vec::new(),
        }
    }

    /// Opens the file-backed vault in the configured data directory
    pub fn open(config: &Config) -> anyhow::Result<Self> {
        let backend = FileBackend::new(&config.data_dir)?;
        info!("using snippet storage at {}", backend.database_file().display());
        Ok(Self::new(Arc::new(backend), config))
    }

    /// True until the stored collection has been loaded
    pub fn is_loading(&self) -> bool {
        !self.store.is_ready()
    }

    pub fn snippets(&self) -> Vec<Snippet> {
        self.store.snapshot()
    }

    /// The collection filtered and ordered by the current selection
    pub fn filtered_snippets(&self) -> Vec<Snippet> {
        self.store
            .with_snippets(|snippets| derive_view(snippets, &self.selection).into_iter().cloned().collect())
    }

    pub fn facets(&self) -> Facets {
        self.store.with_snippets(Facets::collect)
    }

    pub fn get_snippet_by_id(&self, id: &str) -> Option<Snippet> {
        self.store.get_by_id(id)
    }

    pub fn create_snippet(&mut self, input: SnippetInput) -> Result<Snippet> {
        let outcome = input.validated().map(|input| self.store.create(input));
        self.report(&outcome, "Snippet created successfully", "Failed to create snippet");
        outcome
    }

    pub fn update_snippet(&mut self, id: &str, patch: SnippetPatch) -> Result<Snippet> {
        let outcome = patch
            .validated()
            .and_then(|patch| self.store.update(id, patch));
        self.report(&outcome, "Snippet updated successfully", "Failed to update snippet");
        outcome
    }

    pub fn toggle_favorite(&mut self, id: &str) -> Result<Snippet> {
        let current = self
            .store
            .get_by_id(id)
            .map(|s| s.is_favorite)
            .ok_or_else(|| VaultError::NotFound(id.to_string()));
        let outcome = current.and_then(|is_favorite| {
            self.store.update(
                id,
                SnippetPatch {
                    is_favorite: Some(!is_favorite),
                    ..Default::default()
                },
            )
        });
        self.report(&outcome, "Favorite updated", "Failed to update snippet");
        outcome
    }

    /// Deleting an id that does not exist is not an error
    pub fn delete_snippet(&mut self, id: &str) -> bool {
        let removed = self.store.delete(id);
        if removed {
            self.notify(NoticeLevel::Success, "Snippet deleted successfully");
        } else {
            self.notify(NoticeLevel::Info, "Snippet was already deleted");
        }
        removed
    }

    /// Removes every snippet
    pub fn clear_all(&mut self) {
        self.store.clear();
        self.notify(NoticeLevel::Success, "All snippets removed");
    }

    /// Serializes the whole collection as an export document
    pub fn export_document(&mut self) -> Result<String> {
        let outcome = self.store.with_snippets(export::export_document);
        if let Err(err) = &outcome {
            self.fail("Failed to export snippets", err);
        }
        outcome
    }

    /// Writes the export document into `dir`, named after today's date
    pub fn export_to_dir(&mut self, dir: &Path) -> Result<PathBuf> {
        let today = chrono::Local::now().date_naive();
        let outcome = self.store.with_snippets(|snippets| write_export(dir, snippets, today));
        match &outcome {
            Ok(path) => self.notify(
                NoticeLevel::Success,
                format!("Snippets exported successfully to {}", path.display()),
            ),
            Err(err) => self.fail("Failed to export snippets", err),
        }
        outcome
    }

    /// Validates the whole document before inserting anything, then adds the
    /// records whose ids are new.
    pub fn import_document(&mut self, raw: &str) -> Result<ImportSummary> {
        let outcome = export::parse_import_document(raw);
        self.finish_import(outcome)
    }

    pub fn import_file(&mut self, path: &Path) -> Result<ImportSummary> {
        let outcome = read_import_file(path);
        self.finish_import(outcome)
    }

    fn finish_import(&mut self, parsed: Result<Vec<Snippet>>) -> Result<ImportSummary> {
        let records = match parsed {
            Ok(records) => records,
            Err(err) => {
                self.fail("Invalid JSON file or corrupt data", &err);
                return Err(err);
            }
        };

        let summary = self.store.bulk_import(records);
        match summary.imported {
            0 => self.notify(NoticeLevel::Info, "No new snippets to import (all already exist)"),
            n => {
                let plural = if n == 1 { "" } else { "s" };
                let mut message = format!("Imported {n} snippet{plural} successfully");
                if summary.skipped > 0 {
                    message.push_str(&format!(", skipped {} already present", summary.skipped));
                }
                self.notify(NoticeLevel::Success, message);
            }
        }
        Ok(summary)
    }

    /// Turns completed background writes into notices. Failed writes become
    /// warnings: memory still holds every change.
    pub fn poll_persistence(&mut self) {
        for report in self.store.drain_reports() {
            if let PersistReport::Failed(err) = report {
                self.notify(
                    NoticeLevel::Warning,
                    format!("{err}. Changes are kept in memory and will be retried on the next save"),
                );
            }
        }
    }

    /// Notices raised since the last call, oldest first
    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.poll_persistence();
        std::mem::take(&mut self.notices)
    }

    /// Writes any pending changes. Call once before exiting.
    pub async fn shutdown(&mut self) -> Result<()> {
        let outcome = self.store.flush().await;
        if let Err(err) = &outcome {
            self.fail("Failed to save snippets", err);
        }
        outcome
    }

    fn report<T>(&mut self, outcome: &Result<T>, success: &str, failure: &str) {
        match outcome {
            Ok(_) => self.notify(NoticeLevel::Success, success),
            Err(err) => self.fail(failure, err),
        }
    }

    fn fail(&mut self, message: &str, err: &VaultError) {
        if err.is_recoverable_warning() {
            warn!("{message}: {err}");
            self.notify(NoticeLevel::Warning, format!("{message}: {err}"));
        } else {
            error!("{message}: {err}");
            self.notify(NoticeLevel::Error, format!("{message}: {err}"));
        }
    }

    fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) {
        self.notices.push(Notice::new(level, message));
    }
}
