use std::collections::BTreeMap;

use crate::models::Snippet;

/// Canonical form of a single tag: trimmed, without a leading `#`, lower-cased
pub fn normalize_tag(name: &str) -> String {
    let name = name.trim();
    let clean_name = name.strip_prefix('#').unwrap_or(name);
    clean_name.trim().to_lowercase()
}

/// Normalizes every tag, dropping blanks and later duplicates
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut normalized: Vec<String> = Vec::new();
    for tag in tags {
        let tag = normalize_tag(tag.as_ref());
        if !tag.is_empty() && !normalized.contains(&tag) {
            normalized.push(tag);
        }
    }
    normalized
}

/// Splits comma separated user input into normalized tags
pub fn parse_tag_list(raw: &str) -> Vec<String> {
    normalize_tags(raw.split(','))
}

/// A facet value with the number of snippets carrying it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetCount {
    pub value: String,
    pub count: usize,
}

/// Distinct tags and languages present in a collection, used to offer filter
/// choices. Values are case-folded so `React` and `react` share one entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Facets {
    pub tags: Vec<FacetCount>,
    pub languages: Vec<FacetCount>,
}

impl Facets {
    pub fn collect(snippets: &[Snippet]) -> Self {
        let mut tags: BTreeMap<String, usize> = BTreeMap::new();
        let mut languages: BTreeMap<String, usize> = BTreeMap::new();

        for snippet in snippets {
            // Count each tag once per snippet even if stored twice
            for tag in normalize_tags(&snippet.tags) {
                *tags.entry(tag).or_insert(0) += 1;
            }
            *languages.entry(snippet.language.to_lowercase()).or_insert(0) += 1;
        }

        Self {
            tags: into_counts(tags),
            languages: into_counts(languages),
        }
    }

    /// Find tags that match a query string
    pub fn find_tags_by_name(&self, query: &str) -> Vec<&FacetCount> {
        let query = query.to_lowercase();
        self.tags
            .iter()
            .filter(|facet| facet.value.contains(&query))
            .collect()
    }
}

fn into_counts(map: BTreeMap<String, usize>) -> Vec<FacetCount> {
    map.into_iter()
        .map(|(value, count)| FacetCount { value, count })
        .collect()
}
