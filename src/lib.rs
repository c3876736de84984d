//! snipvault - Personal Code Snippet Vault
//!
//! Keeps a collection of code snippets tagged with a language, a category
//! and free-form tags, stored locally and written back to disk in the
//! background. Front ends hold one [`App`], browse it through a
//! [`Selection`] of search text, tag and language facets, a favorites
//! toggle and a sort key, and read the outcome of every operation as
//! [`Notice`]s.

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod filter;
pub mod models;
pub mod persist;
pub mod store;

pub use app::{App, Notice, NoticeLevel};
pub use config::Config;
pub use error::{Result, VaultError};
pub use filter::{Selection, SortKey, derive_view};
pub use models::{Snippet, SnippetInput, SnippetPatch};
pub use store::{ImportSummary, SnippetStore};
