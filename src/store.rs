use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use log::{debug, info, warn};

use crate::error::{Result, VaultError};
use crate::models::snippet::now;
use crate::models::{Snippet, SnippetBackend, SnippetInput, SnippetPatch};
use crate::persist::{PersistReport, Persister, SharedSnippets};

/// How many records a bulk import inserted versus skipped as already present
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
}

/// Single source of truth for the snippet collection.
///
/// All mutations go through this type. Each one updates memory immediately
/// and schedules a debounced write of the whole collection to the backend.
/// Until [`SnippetStore::hydrate`] has run the store reports itself as not
/// ready and schedules no writes, so an empty in-memory collection can never
/// overwrite what is stored.
pub struct SnippetStore {
    snippets: SharedSnippets,
    backend: Arc<dyn SnippetBackend>,
    persister: Persister,
    ready: bool,
}

impl SnippetStore {
    /// Creates an empty, not yet hydrated store. Must be called from within a
    /// tokio runtime since it starts the background writer.
    pub fn new(backend: Arc<dyn SnippetBackend>, debounce: Duration) -> Self {
        let snippets = SharedSnippets::default();
        let persister = Persister::spawn(snippets.clone(), backend.clone(), debounce);

        Self {
            snippets,
            backend,
            persister,
            ready: false,
        }
    }

    /// Loads the stored collection. Unreadable or corrupt storage is logged and
    /// treated as an empty vault. Records created before hydration are kept
    /// alongside the loaded ones. Returns the number of records loaded.
    pub fn hydrate(&mut self) -> usize {
        let loaded = match read_collection(self.backend.as_ref()) {
            Ok(loaded) => loaded,
            Err(err) => {
                warn!("{err}; starting with an empty collection");
                Vec::new()
            }
        };
        let count = loaded.len();

        let pending = {
            let mut snippets = self.write();
            let pending = std::mem::replace(&mut *snippets, loaded);
            let mut ids: HashSet<String> = snippets.iter().map(|s| s.id.clone()).collect();
            let early = pending.len();
            snippets.extend(pending.into_iter().filter(|s| ids.insert(s.id.clone())));
            early
        };

        self.ready = true;
        info!("loaded {count} snippets");
        if pending > 0 {
            self.persister.schedule();
        }
        count
    }

    /// False until the initial load has completed
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Adds a snippet built from validated input and returns it
    pub fn create(&mut self, input: SnippetInput) -> Snippet {
        let mut snippet = Snippet::from_input(input);
        {
            let mut snippets = self.write();
            // v4 ids do not collide in practice; imported ids are arbitrary strings
            while snippets.iter().any(|s| s.id == snippet.id) {
                snippet = Snippet { id: uuid::Uuid::new_v4().to_string(), ..snippet };
            }
            snippets.push(snippet.clone());
        }
        debug!("created snippet {}", snippet.id);
        self.changed();
        snippet
    }

    /// Merges `patch` over the snippet with the given id and returns the result
    pub fn update(&mut self, id: &str, patch: SnippetPatch) -> Result<Snippet> {
        let updated = {
            let mut snippets = self.write();
            let snippet = snippets
                .iter_mut()
                .find(|s| s.id == id)
                .ok_or_else(|| VaultError::NotFound(id.to_string()))?;
            snippet.apply(patch);
            snippet.clone()
        };
        debug!("updated snippet {id}");
        self.changed();
        Ok(updated)
    }

    /// Removes the snippet with the given id. Unknown ids are ignored.
    /// Returns whether anything was removed.
    pub fn delete(&mut self, id: &str) -> bool {
        let removed = {
            let mut snippets = self.write();
            let before = snippets.len();
            snippets.retain(|s| s.id != id);
            snippets.len() != before
        };
        if removed {
            debug!("deleted snippet {id}");
            self.changed();
        }
        removed
    }

    pub fn get_by_id(&self, id: &str) -> Option<Snippet> {
        self.read().iter().find(|s| s.id == id).cloned()
    }

    /// Inserts the given records whose ids are not yet present, refreshing
    /// their `updated_at`. Every other field, including `id` and `created_at`,
    /// is kept as given.
    pub fn bulk_import(&mut self, incoming: Vec<Snippet>) -> ImportSummary {
        let mut summary = ImportSummary::default();
        {
            let mut snippets = self.write();
            let mut ids: HashSet<String> = snippets.iter().map(|s| s.id.clone()).collect();
            let imported_at = now();

            for mut snippet in incoming {
                if !ids.insert(snippet.id.clone()) {
                    summary.skipped += 1;
                    continue;
                }
                snippet.updated_at = imported_at.max(snippet.created_at);
                snippets.push(snippet);
                summary.imported += 1;
            }
        }

        info!(
            "imported {} snippets, skipped {} duplicates",
            summary.imported, summary.skipped
        );
        if summary.imported > 0 {
            self.changed();
        }
        summary
    }

    /// Removes every snippet
    pub fn clear(&mut self) {
        self.write().clear();
        self.changed();
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Copy of the whole collection in insertion order
    pub fn snapshot(&self) -> Vec<Snippet> {
        self.read().clone()
    }

    /// Runs `f` against the collection without copying it
    pub fn with_snippets<R>(&self, f: impl FnOnce(&[Snippet]) -> R) -> R {
        f(&self.read())
    }

    /// Writes pending changes now instead of waiting for the debounce window
    pub async fn flush(&self) -> Result<()> {
        self.persister.flush().await
    }

    /// Outcomes of background writes since the last call
    pub fn drain_reports(&mut self) -> Vec<PersistReport> {
        self.persister.drain_reports()
    }

    fn changed(&self) {
        if self.ready {
            self.persister.schedule();
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Snippet>> {
        self.snippets.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Snippet>> {
        self.snippets.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Reads and parses the stored collection. Nothing stored yet is an empty
/// collection; records repeating an earlier id are dropped.
pub fn read_collection(backend: &dyn SnippetBackend) -> Result<Vec<Snippet>> {
    let raw = backend
        .read()
        .map_err(|e| VaultError::PersistenceRead(format!("{e:#}")))?;

    let Some(raw) = raw.filter(|raw| !raw.trim().is_empty()) else {
        return Ok(Vec::new());
    };

    let parsed: Vec<Snippet> =
        serde_json::from_str(&raw).map_err(|e| VaultError::PersistenceRead(e.to_string()))?;

    let mut ids = HashSet::new();
    let total = parsed.len();
    let unique: Vec<Snippet> = parsed.into_iter().filter(|s| ids.insert(s.id.clone())).collect();
    if unique.len() != total {
        warn!("dropped {} stored snippets with duplicate ids", total - unique.len());
    }
    Ok(unique)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MemoryBackend;
    use crate::persist::DEFAULT_DEBOUNCE;
    use chrono::{Duration as ChronoDuration, Utc};

    fn input(title: &str) -> SnippetInput {
        SnippetInput {
            title: title.to_string(),
            code: "fn main() {}".to_string(),
            language: "rust".to_string(),
            ..Default::default()
        }
    }

    fn store(backend: &MemoryBackend) -> SnippetStore {
        let mut store = SnippetStore::new(Arc::new(backend.clone()), DEFAULT_DEBOUNCE);
        store.hydrate();
        store
    }

    async fn settle() {
        tokio::time::sleep(DEFAULT_DEBOUNCE * 2).await;
    }

    #[tokio::test(start_paused = true)]
    async fn create_produces_the_requested_record() {
        let backend = MemoryBackend::new();
        let mut store = store(&backend);

        let created = store.create(SnippetInput {
            title: "Debounce Hook".into(),
            code: "function f(){}".into(),
            language: "javascript".into(),
            tags: vec!["hooks".into()],
            category: "Hook".into(),
            is_favorite: false,
            ..Default::default()
        });

        let all = store.snapshot();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0], created);
        assert_eq!(created.title, "Debounce Hook");
        assert_eq!(created.tags, vec!["hooks"]);
        assert_eq!(created.category, "Hook");
        assert_eq!(created.created_at, created.updated_at);
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_creates_get_unique_ids() {
        let mut store = store(&MemoryBackend::new());
        for i in 0..200 {
            store.create(input(&format!("snippet {i}")));
        }
        let ids: HashSet<String> = store.snapshot().into_iter().map(|s| s.id).collect();
        assert_eq!(ids.len(), 200);
    }

    #[tokio::test(start_paused = true)]
    async fn update_merges_and_bumps_updated_at() {
        let mut store = store(&MemoryBackend::new());
        let original = store.create(input("Old"));

        let updated = store
            .update(&original.id, SnippetPatch { title: Some("New".into()), ..Default::default() })
            .unwrap();

        assert_eq!(updated.title, "New");
        assert_eq!(updated.id, original.id);
        assert_eq!(updated.created_at, original.created_at);
        assert!(updated.updated_at > original.updated_at);
        assert_eq!(updated.code, original.code);
        assert_eq!(store.get_by_id(&original.id), Some(updated));
    }

    #[tokio::test(start_paused = true)]
    async fn update_of_unknown_id_is_not_found() {
        let mut store = store(&MemoryBackend::new());
        store.create(input("kept"));
        let before = store.snapshot();

        let result = store.update("missing", SnippetPatch::default());

        assert!(matches!(result, Err(VaultError::NotFound(id)) if id == "missing"));
        assert_eq!(store.snapshot(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn delete_is_idempotent() {
        let mut store = store(&MemoryBackend::new());
        let a = store.create(input("a"));
        store.create(input("b"));

        assert!(store.delete(&a.id));
        let once = store.snapshot();
        assert!(!store.delete(&a.id));
        assert_eq!(store.snapshot(), once);
        assert_eq!(store.get_by_id(&a.id), None);
    }

    #[tokio::test(start_paused = true)]
    async fn bulk_import_skips_known_ids() {
        let mut store = store(&MemoryBackend::new());
        let existing = store.create(input("existing"));

        let created_at = Utc::now() - ChronoDuration::days(30);
        let fresh = Snippet {
            id: "imported-1".into(),
            created_at,
            updated_at: created_at,
            ..existing.clone()
        };

        let summary = store.bulk_import(vec![existing.clone(), fresh.clone(), fresh.clone()]);

        assert_eq!(summary, ImportSummary { imported: 1, skipped: 2 });
        let stored = store.get_by_id("imported-1").unwrap();
        assert_eq!(stored.created_at, created_at);
        assert!(stored.updated_at > created_at);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn mutations_coalesce_into_one_write_of_final_state() {
        let backend = MemoryBackend::new();
        let mut store = store(&backend);

        let snippet = store.create(input("draft"));
        for i in 0..20 {
            store
                .update(&snippet.id, SnippetPatch { code: Some(format!("v{i}")), ..Default::default() })
                .unwrap();
        }
        settle().await;

        assert_eq!(backend.write_count(), 1);
        let persisted = read_collection(&backend).unwrap();
        assert_eq!(persisted, store.snapshot());
        assert_eq!(persisted[0].code, "v19");
    }

    #[tokio::test(start_paused = true)]
    async fn corrupt_storage_hydrates_empty() {
        let backend = MemoryBackend::with_value("{not json");
        let mut store = SnippetStore::new(Arc::new(backend.clone()), DEFAULT_DEBOUNCE);

        assert!(!store.is_ready());
        assert_eq!(store.hydrate(), 0);
        assert!(store.is_ready());
        assert!(store.is_empty());
        settle().await;
        assert_eq!(backend.write_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn hydrate_restores_persisted_collection() {
        let backend = MemoryBackend::new();
        let mut first = store(&backend);
        first.create(input("a"));
        first.create(input("b"));
        first.flush().await.unwrap();

        let second = store(&backend);
        assert_eq!(second.snapshot(), first.snapshot());
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_is_written_before_hydration() {
        let backend = MemoryBackend::with_value("[]");
        let mut store = SnippetStore::new(Arc::new(backend.clone()), DEFAULT_DEBOUNCE);

        let early = store.create(input("early"));
        settle().await;
        assert_eq!(backend.write_count(), 0);

        store.hydrate();
        assert_eq!(store.get_by_id(&early.id), Some(early));
        settle().await;
        assert_eq!(backend.write_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn noop_delete_schedules_nothing() {
        let backend = MemoryBackend::new();
        let mut store = store(&backend);

        store.delete("missing");
        settle().await;

        assert_eq!(backend.write_count(), 0);
    }

    #[test]
    fn read_collection_drops_duplicate_ids() {
        let backend = MemoryBackend::with_value(
            r#"[{"id":"1","title":"a","code":"x","language":"go","tags":[],
                 "createdAt":"2024-01-01T00:00:00.000Z","updatedAt":"2024-01-01T00:00:00.000Z"},
                {"id":"1","title":"b","code":"y","language":"go","tags":[],
                 "createdAt":"2024-01-01T00:00:00.000Z","updatedAt":"2024-01-01T00:00:00.000Z"}]"#,
        );
        let loaded = read_collection(&backend).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].title, "a");
    }
}
