//! Filtering and ordering of the snippet collection
//!
//! [`derive_view`] is a pure function of the collection and the current
//! [`Selection`]. Callers re-run it whenever either changes; nothing here is
//! cached or mutated.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::VaultError;
use crate::models::Snippet;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    #[default]
    Newest,
    Oldest,
    LastUpdated,
    FirstUpdated,
    TitleAsc,
    TitleDesc,
    Language,
}

impl SortKey {
    pub const ALL: [SortKey; 7] = [
        SortKey::Newest,
        SortKey::Oldest,
        SortKey::LastUpdated,
        SortKey::FirstUpdated,
        SortKey::TitleAsc,
        SortKey::TitleDesc,
        SortKey::Language,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Newest => "newest",
            SortKey::Oldest => "oldest",
            SortKey::LastUpdated => "last-updated",
            SortKey::FirstUpdated => "first-updated",
            SortKey::TitleAsc => "title-asc",
            SortKey::TitleDesc => "title-desc",
            SortKey::Language => "language",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortKey::Newest => "Newest First",
            SortKey::Oldest => "Oldest First",
            SortKey::LastUpdated => "Last Updated",
            SortKey::FirstUpdated => "First Updated",
            SortKey::TitleAsc => "Title (A-Z)",
            SortKey::TitleDesc => "Title (Z-A)",
            SortKey::Language => "Language",
        }
    }

    fn compare(&self, a: &Snippet, b: &Snippet) -> Ordering {
        match self {
            SortKey::Newest => b.created_at.cmp(&a.created_at),
            SortKey::Oldest => a.created_at.cmp(&b.created_at),
            SortKey::LastUpdated => b.updated_at.cmp(&a.updated_at),
            SortKey::FirstUpdated => a.updated_at.cmp(&b.updated_at),
            SortKey::TitleAsc => collate(&a.title, &b.title),
            SortKey::TitleDesc => collate(&b.title, &a.title),
            SortKey::Language => collate(&a.language, &b.language),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s.trim())
            .ok_or_else(|| VaultError::Validation(format!("unknown sort key: {s}")))
    }
}

/// Human ordering for text: case-insensitive first, exact text as tie-break
fn collate(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// The active search text, facet choices, favorites toggle and sort key.
/// Lives only for the session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub search: String,
    /// Case-folded; a snippet must carry every one of them
    pub tags: BTreeSet<String>,
    /// Case-folded; a snippet must match any one of them
    pub languages: BTreeSet<String>,
    pub favorites_only: bool,
    pub sort: SortKey,
}

impl Selection {
    pub fn with_sort(sort: SortKey) -> Self {
        Self {
            sort,
            ..Default::default()
        }
    }

    pub fn set_search(&mut self, query: impl Into<String>) {
        self.search = query.into();
    }

    /// Adds the tag if absent, removes it if present
    pub fn toggle_tag(&mut self, tag: &str) {
        toggle(&mut self.tags, tag.to_lowercase());
    }

    pub fn toggle_language(&mut self, language: &str) {
        toggle(&mut self.languages, language.to_lowercase());
    }

    pub fn set_languages<I, S>(&mut self, languages: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.languages = languages
            .into_iter()
            .map(|l| l.as_ref().to_lowercase())
            .collect();
    }

    pub fn toggle_favorites(&mut self) {
        self.favorites_only = !self.favorites_only;
    }

    pub fn set_sort(&mut self, sort: SortKey) {
        self.sort = sort;
    }

    /// Resets every filter. The sort key is kept.
    pub fn clear_filters(&mut self) {
        *self = Self::with_sort(self.sort);
    }

    pub fn has_active_filters(&self) -> bool {
        !self.search.trim().is_empty()
            || !self.tags.is_empty()
            || !self.languages.is_empty()
            || self.favorites_only
    }

    /// Whether `snippet` passes every active filter
    pub fn matches(&self, snippet: &Snippet) -> bool {
        if self.favorites_only && !snippet.is_favorite {
            return false;
        }

        let query = self.search.trim().to_lowercase();
        if !query.is_empty() && !matches_text(snippet, &query) {
            return false;
        }

        if !self.tags.iter().all(|tag| snippet.has_tag(tag)) {
            return false;
        }

        self.languages.is_empty() || self.languages.contains(&snippet.language.to_lowercase())
    }
}

fn toggle(set: &mut BTreeSet<String>, value: String) {
    if !set.remove(&value) {
        set.insert(value);
    }
}

fn matches_text(snippet: &Snippet, query: &str) -> bool {
    snippet.title.to_lowercase().contains(query)
        || snippet.description.to_lowercase().contains(query)
        || snippet.language.to_lowercase().contains(query)
        || snippet.tags.iter().any(|tag| tag.to_lowercase().contains(query))
}

/// Filters and orders `snippets` according to `selection`. The sort is
/// stable, so ties keep their order in the collection.
pub fn derive_view<'a>(snippets: &'a [Snippet], selection: &Selection) -> Vec<&'a Snippet> {
    let mut view: Vec<&Snippet> = snippets.iter().filter(|s| selection.matches(s)).collect();
    view.sort_by(|a, b| selection.sort.compare(a, b));
    view
}
