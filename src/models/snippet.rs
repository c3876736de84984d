use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, VaultError};
use crate::models::tags::normalize_tags;

pub const DEFAULT_CATEGORY: &str = "Other";

/// A single stored code excerpt. Field names serialize in camelCase so that
/// stored collections and export documents share one shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub code: String,
    pub language: String,
    pub tags: Vec<String>,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

/// Current time at the precision timestamps are stored with
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

impl Snippet {
    /// Builds a new snippet from already validated input, assigning a fresh id
    /// and identical creation/update timestamps.
    pub fn from_input(input: SnippetInput) -> Self {
        let now = now();

        Self {
            id: Uuid::new_v4().to_string(),
            title: input.title,
            description: input.description,
            code: input.code,
            language: input.language,
            tags: normalize_tags(input.tags),
            category: input.category,
            is_favorite: input.is_favorite,
            created_at: now,
            updated_at: now,
        }
    }

    /// Shallow-merges the patch over this snippet. `id` and `created_at` are
    /// never touched; `updated_at` always moves forward.
    pub fn apply(&mut self, patch: SnippetPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(code) = patch.code {
            self.code = code;
        }
        if let Some(language) = patch.language {
            self.language = language;
        }
        if let Some(tags) = patch.tags {
            self.tags = normalize_tags(tags);
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(is_favorite) = patch.is_favorite {
            self.is_favorite = is_favorite;
        }
        self.touch();
    }

    /// Refreshes `updated_at`, keeping it strictly increasing even when two
    /// mutations land within the same millisecond.
    pub fn touch(&mut self) {
        let now = now();
        self.updated_at = if now > self.updated_at {
            now
        } else {
            self.updated_at + Duration::milliseconds(1)
        };
    }

    pub fn get_line_count(&self) -> usize {
        self.code.lines().count()
    }

    /// Case-insensitive tag membership
    pub fn has_tag(&self, tag: &str) -> bool {
        let tag = tag.to_lowercase();
        self.tags.iter().any(|t| t.to_lowercase() == tag)
    }
}

/// User-editable fields for a new snippet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnippetInput {
    pub title: String,
    pub description: String,
    pub code: String,
    pub language: String,
    pub tags: Vec<String>,
    pub category: String,
    pub is_favorite: bool,
}

impl Default for SnippetInput {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            code: String::new(),
            language: String::new(),
            tags: Vec::new(),
            category: default_category(),
            is_favorite: false,
        }
    }
}

impl SnippetInput {
    /// Trims the free-text fields and rejects input missing a title, code or
    /// language.
    pub fn validated(self) -> Result<Self> {
        let title = required("title", &self.title)?;
        let code = required("code", &self.code)?;
        let language = required("language", &self.language)?;
        let category = match self.category.trim() {
            "" => default_category(),
            category => category.to_string(),
        };

        Ok(Self {
            title,
            description: self.description.trim().to_string(),
            code,
            language,
            tags: self.tags,
            category,
            is_favorite: self.is_favorite,
        })
    }
}

/// Partial field set merged over an existing snippet by an update
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnippetPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub code: Option<String>,
    pub language: Option<String>,
    pub tags: Option<Vec<String>>,
    pub category: Option<String>,
    pub is_favorite: Option<bool>,
}

impl SnippetPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Applies the same trimming and required-field rules as
    /// [`SnippetInput::validated`] to whichever fields are present.
    pub fn validated(self) -> Result<Self> {
        Ok(Self {
            title: self.title.as_deref().map(|t| required("title", t)).transpose()?,
            description: self.description.map(|d| d.trim().to_string()),
            code: self.code.as_deref().map(|c| required("code", c)).transpose()?,
            language: self
                .language
                .as_deref()
                .map(|l| required("language", l))
                .transpose()?,
            tags: self.tags,
            category: self.category.map(|c| match c.trim() {
                "" => default_category(),
                category => category.to_string(),
            }),
            is_favorite: self.is_favorite,
        })
    }
}

fn required(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(VaultError::Validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

/// Languages offered when creating a snippet. The `language` field itself is
/// a plain string, so anything outside this list survives as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SnippetLanguage {
    JavaScript,
    TypeScript,
    Python,
    Java,
    CSharp,
    Go,
    Rust,
    PHP,
    Ruby,
    HTML,
    CSS,
    SQL,
    Bash,
    Json,
    Yaml,
    Markdown,
    Other(String),
}

impl SnippetLanguage {
    pub const KNOWN: [SnippetLanguage; 16] = [
        SnippetLanguage::JavaScript,
        SnippetLanguage::TypeScript,
        SnippetLanguage::Python,
        SnippetLanguage::Java,
        SnippetLanguage::CSharp,
        SnippetLanguage::Go,
        SnippetLanguage::Rust,
        SnippetLanguage::PHP,
        SnippetLanguage::Ruby,
        SnippetLanguage::HTML,
        SnippetLanguage::CSS,
        SnippetLanguage::SQL,
        SnippetLanguage::Bash,
        SnippetLanguage::Json,
        SnippetLanguage::Yaml,
        SnippetLanguage::Markdown,
    ];

    /// Resolves a language name or common alias, case-insensitively
    pub fn parse(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "javascript" | "js" | "jsx" => SnippetLanguage::JavaScript,
            "typescript" | "ts" | "tsx" => SnippetLanguage::TypeScript,
            "python" | "py" => SnippetLanguage::Python,
            "java" => SnippetLanguage::Java,
            "csharp" | "c#" | "cs" => SnippetLanguage::CSharp,
            "go" | "golang" => SnippetLanguage::Go,
            "rust" | "rs" => SnippetLanguage::Rust,
            "php" => SnippetLanguage::PHP,
            "ruby" | "rb" => SnippetLanguage::Ruby,
            "html" | "htm" => SnippetLanguage::HTML,
            "css" => SnippetLanguage::CSS,
            "sql" => SnippetLanguage::SQL,
            "bash" | "sh" | "shell" => SnippetLanguage::Bash,
            "json" => SnippetLanguage::Json,
            "yaml" | "yml" => SnippetLanguage::Yaml,
            "markdown" | "md" => SnippetLanguage::Markdown,
            other => SnippetLanguage::Other(other.to_string()),
        }
    }

    /// Identifier stored in [`Snippet::language`]
    pub fn as_str(&self) -> &str {
        match self {
            SnippetLanguage::JavaScript => "javascript",
            SnippetLanguage::TypeScript => "typescript",
            SnippetLanguage::Python => "python",
            SnippetLanguage::Java => "java",
            SnippetLanguage::CSharp => "csharp",
            SnippetLanguage::Go => "go",
            SnippetLanguage::Rust => "rust",
            SnippetLanguage::PHP => "php",
            SnippetLanguage::Ruby => "ruby",
            SnippetLanguage::HTML => "html",
            SnippetLanguage::CSS => "css",
            SnippetLanguage::SQL => "sql",
            SnippetLanguage::Bash => "bash",
            SnippetLanguage::Json => "json",
            SnippetLanguage::Yaml => "yaml",
            SnippetLanguage::Markdown => "markdown",
            SnippetLanguage::Other(name) => name,
        }
    }

    /// Extension for saving the code to a file, without the dot. Languages
    /// outside the known list are treated as plain text.
    pub fn file_extension(&self) -> &'static str {
        match self {
            SnippetLanguage::JavaScript => "js",
            SnippetLanguage::TypeScript => "ts",
            SnippetLanguage::Python => "py",
            SnippetLanguage::Java => "java",
            SnippetLanguage::CSharp => "cs",
            SnippetLanguage::Go => "go",
            SnippetLanguage::Rust => "rs",
            SnippetLanguage::PHP => "php",
            SnippetLanguage::Ruby => "rb",
            SnippetLanguage::HTML => "html",
            SnippetLanguage::CSS => "css",
            SnippetLanguage::SQL => "sql",
            SnippetLanguage::Bash => "sh",
            SnippetLanguage::Json => "json",
            SnippetLanguage::Yaml => "yaml",
            SnippetLanguage::Markdown => "md",
            SnippetLanguage::Other(_) => "txt",
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            SnippetLanguage::JavaScript => "JavaScript",
            SnippetLanguage::TypeScript => "TypeScript",
            SnippetLanguage::Python => "Python",
            SnippetLanguage::Java => "Java",
            SnippetLanguage::CSharp => "C#",
            SnippetLanguage::Go => "Go",
            SnippetLanguage::Rust => "Rust",
            SnippetLanguage::PHP => "PHP",
            SnippetLanguage::Ruby => "Ruby",
            SnippetLanguage::HTML => "HTML",
            SnippetLanguage::CSS => "CSS",
            SnippetLanguage::SQL => "SQL",
            SnippetLanguage::Bash => "Bash",
            SnippetLanguage::Json => "JSON",
            SnippetLanguage::Yaml => "YAML",
            SnippetLanguage::Markdown => "Markdown",
            SnippetLanguage::Other(name) => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Category {
    Algorithm,
    Component,
    Hook,
    Utility,
    Config,
    API,
    Database,
    Testing,
    Other(String),
}

impl Category {
    pub const KNOWN: [Category; 8] = [
        Category::Algorithm,
        Category::Component,
        Category::Hook,
        Category::Utility,
        Category::Config,
        Category::API,
        Category::Database,
        Category::Testing,
    ];

    /// Matches a known category case-insensitively; free-form names are kept
    /// as typed, and a blank name falls back to "Other".
    pub fn parse(name: &str) -> Self {
        let name = name.trim();
        if name.is_empty() || name.eq_ignore_ascii_case(DEFAULT_CATEGORY) {
            return Category::Other(DEFAULT_CATEGORY.to_string());
        }
        Self::KNOWN
            .into_iter()
            .find(|known| known.as_str().eq_ignore_ascii_case(name))
            .unwrap_or_else(|| Category::Other(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Category::Algorithm => "Algorithm",
            Category::Component => "Component",
            Category::Hook => "Hook",
            Category::Utility => "Utility",
            Category::Config => "Config",
            Category::API => "API",
            Category::Database => "Database",
            Category::Testing => "Testing",
            Category::Other(name) => name,
        }
    }
}

/// RFC 3339 timestamps with millisecond precision and a `Z` suffix
pub mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn format(ts: &DateTime<Utc>) -> String {
        ts.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|ts| ts.with_timezone(&Utc))
    }

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| D::Error::custom(format!("invalid timestamp: {raw}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> SnippetInput {
        SnippetInput {
            title: "  Debounce Hook ".to_string(),
            description: " delays a callback ".to_string(),
            code: "function f(){}\n".to_string(),
            language: "javascript".to_string(),
            tags: vec!["hooks".to_string()],
            category: "Hook".to_string(),
            is_favorite: false,
        }
    }

    #[test]
    fn validated_input_is_trimmed() {
        let input = input().validated().unwrap();
        assert_eq!(input.title, "Debounce Hook");
        assert_eq!(input.description, "delays a callback");
        assert_eq!(input.code, "function f(){}");
    }

    #[test]
    fn blank_required_fields_are_rejected() {
        for broken in [
            SnippetInput { title: "   ".into(), ..input() },
            SnippetInput { code: "\n\t".into(), ..input() },
            SnippetInput { language: String::new(), ..input() },
        ] {
            assert!(matches!(broken.validated(), Err(VaultError::Validation(_))));
        }
    }

    #[test]
    fn blank_category_defaults_to_other() {
        let input = SnippetInput { category: " ".into(), ..input() }.validated().unwrap();
        assert_eq!(input.category, DEFAULT_CATEGORY);
    }

    #[test]
    fn new_snippet_has_equal_timestamps() {
        let snippet = Snippet::from_input(input().validated().unwrap());
        assert_eq!(snippet.created_at, snippet.updated_at);
        assert!(!snippet.id.is_empty());
        assert_eq!(snippet.tags, vec!["hooks"]);
    }

    #[test]
    fn apply_merges_only_present_fields() {
        let original = Snippet::from_input(input().validated().unwrap());
        let mut updated = original.clone();
        updated.apply(SnippetPatch {
            title: Some("Throttle Hook".into()),
            ..Default::default()
        });

        assert_eq!(updated.title, "Throttle Hook");
        assert!(updated.updated_at > original.updated_at);
        assert_eq!(
            Snippet {
                title: original.title.clone(),
                updated_at: original.updated_at,
                ..updated
            },
            original
        );
    }

    #[test]
    fn touch_is_strictly_monotonic() {
        let mut snippet = Snippet::from_input(input().validated().unwrap());
        let mut previous = snippet.updated_at;
        for _ in 0..5 {
            snippet.touch();
            assert!(snippet.updated_at > previous);
            previous = snippet.updated_at;
        }
    }

    #[test]
    fn patch_rejects_blanked_title() {
        let patch = SnippetPatch { title: Some(" ".into()), ..Default::default() };
        assert!(patch.validated().is_err());
        assert!(SnippetPatch::default().is_empty());
    }

    #[test]
    fn timestamps_serialize_with_milliseconds() {
        let snippet = Snippet::from_input(input().validated().unwrap());
        let json = serde_json::to_value(&snippet).unwrap();
        let created = json["createdAt"].as_str().unwrap();
        assert!(created.ends_with('Z'));
        assert_eq!(created.len(), "2024-01-01T00:00:00.000Z".len());
        assert_eq!(json["isFavorite"], false);
    }

    #[test]
    fn missing_optional_fields_take_defaults() {
        let snippet: Snippet = serde_json::from_str(
            r#"{"id":"1","title":"t","code":"c","language":"go","tags":[],
                "createdAt":"2024-01-01T00:00:00.000Z","updatedAt":"2024-01-02T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(snippet.description, "");
        assert_eq!(snippet.category, DEFAULT_CATEGORY);
        assert!(!snippet.is_favorite);
    }

    #[test]
    fn language_aliases_resolve() {
        assert_eq!(SnippetLanguage::parse("JS"), SnippetLanguage::JavaScript);
        assert_eq!(SnippetLanguage::parse("yml").as_str(), "yaml");
        assert_eq!(SnippetLanguage::parse("Zig").as_str(), "zig");
        assert_eq!(SnippetLanguage::parse("csharp").display_name(), "C#");
    }

    #[test]
    fn category_parse_keeps_custom_names() {
        assert_eq!(Category::parse("hook"), Category::Hook);
        assert_eq!(Category::parse("Snippets").as_str(), "Snippets");
        assert_eq!(Category::parse("").as_str(), DEFAULT_CATEGORY);
    }

    #[test]
    fn other_category_is_case_insensitive() {
        for name in ["other", "OTHER", " Other "] {
            assert_eq!(Category::parse(name).as_str(), DEFAULT_CATEGORY);
        }
    }

    #[test]
    fn file_extensions_cover_known_languages() {
        assert_eq!(SnippetLanguage::parse("ts").file_extension(), "ts");
        assert_eq!(SnippetLanguage::Bash.file_extension(), "sh");
        assert_eq!(SnippetLanguage::Markdown.file_extension(), "md");
        assert_eq!(SnippetLanguage::parse("zig").file_extension(), "txt");
        for language in SnippetLanguage::KNOWN {
            assert!(!language.file_extension().is_empty());
            assert_ne!(language.file_extension(), "txt");
        }
    }
}
