pub mod export;
pub mod snippet;
pub mod storage;
pub mod tags;

pub use export::{export_document, export_file_name, parse_import_document};
pub use snippet::{Category, Snippet, SnippetInput, SnippetLanguage, SnippetPatch};
pub use storage::{FileBackend, MemoryBackend, SnippetBackend, STORAGE_KEY};
pub use tags::{FacetCount, Facets};
