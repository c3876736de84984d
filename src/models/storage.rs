use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Key under which the whole snippet collection is stored
pub const STORAGE_KEY: &str = "snippetvault_snippets";

/// Durable key-value storage holding the serialized collection under a
/// single key. `read` returns `None` when nothing has been stored yet.
pub trait SnippetBackend: Send + Sync {
    fn read(&self) -> Result<Option<String>>;
    fn write(&self, contents: &str) -> Result<()>;
}

/// Stores the collection as `<data_dir>/<key>.json`
#[derive(Debug)]
pub struct FileBackend {
    database_file: PathBuf,
}

impl FileBackend {
    pub fn new(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        let database_file = data_dir.join(format!("{STORAGE_KEY}.json"));

        fs::create_dir_all(&data_dir).with_context(|| {
            format!("Failed to create data directory {}", data_dir.display())
        })?;

        Ok(Self { database_file })
    }

    pub fn database_file(&self) -> &Path {
        &self.database_file
    }
}

impl SnippetBackend for FileBackend {
    fn read(&self) -> Result<Option<String>> {
        if !self.database_file.exists() {
            return Ok(None);
        }

        fs::read_to_string(&self.database_file)
            .map(Some)
            .context("Failed to read database file")
    }

    fn write(&self, contents: &str) -> Result<()> {
        // Write beside the target and rename so a crash never leaves half a file
        let tmp_file = self.database_file.with_extension("json.tmp");
        fs::write(&tmp_file, contents).context("Failed to write database file")?;
        fs::rename(&tmp_file, &self.database_file).context("Failed to replace database file")
    }
}

#[derive(Debug, Default)]
struct MemoryCell {
    value: Option<String>,
    writes: usize,
}

/// Process-local backend. Clones share the same cell, which lets a caller
/// keep a handle to inspect what the store wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    cell: Arc<Mutex<MemoryCell>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(value: impl Into<String>) -> Self {
        let backend = Self::new();
        backend.lock().value = Some(value.into());
        backend
    }

    pub fn value(&self) -> Option<String> {
        self.lock().value.clone()
    }

    /// Number of writes performed so far
    pub fn write_count(&self) -> usize {
        self.lock().writes
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryCell> {
        self.cell.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SnippetBackend for MemoryBackend {
    fn read(&self) -> Result<Option<String>> {
        Ok(self.value())
    }

    fn write(&self, contents: &str) -> Result<()> {
        let mut cell = self.lock();
        cell.value = Some(contents.to_string());
        cell.writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_backend_round_trips_contents() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path().join("vault")).unwrap();

        assert_eq!(backend.read().unwrap(), None);
        backend.write("[]").unwrap();
        assert_eq!(backend.read().unwrap().as_deref(), Some("[]"));
        assert!(backend.database_file().ends_with("snippetvault_snippets.json"));
    }

    #[test]
    fn memory_backend_clones_share_state() {
        let backend = MemoryBackend::new();
        let handle = backend.clone();

        backend.write("a").unwrap();
        backend.write("b").unwrap();

        assert_eq!(handle.value().as_deref(), Some("b"));
        assert_eq!(handle.write_count(), 2);
    }
}
