use crate::app::App;
use crate::cli::ParsedArgs;
use crate::filter::SortKey;
use crate::models::snippet::timestamp;
use crate::models::tags::parse_tag_list;
use crate::models::{Category, Snippet, SnippetInput, SnippetLanguage, SnippetPatch};
use colored::Colorize;
use std::error::Error;
use std::io::{self, Read};
use std::path::Path;

/// Lists the snippets passing the filters given on the command line
pub fn list_snippets(app: &mut App, args: &ParsedArgs) -> Result<(), Box<dyn Error>> {
    if let Some(sort) = args.value("sort") {
        match sort.parse::<SortKey>() {
            Ok(sort) => app.selection.set_sort(sort),
            Err(err) => {
                println!("{}  {}", "┃".bright_magenta(), err);
                let keys: Vec<&str> = SortKey::ALL.iter().map(|k| k.as_str()).collect();
                println!("{}  Available: {}", "┃".bright_magenta(), keys.join(", "));
                return Ok(());
            }
        }
    }

    app.selection.set_search(args.positional.join(" "));
    app.selection.tags.extend(
        args.values("tag")
            .into_iter()
            .flat_map(parse_tag_list),
    );
    let languages = args.values("lang");
    if !languages.is_empty() {
        app.selection.set_languages(languages);
    }
    if args.has("fav") && !app.selection.favorites_only {
        app.selection.toggle_favorites();
    }

    let snippets = app.filtered_snippets();
    let total = app.snippets().len();

    println!(
        "{}  {} {}",
        "┃".bright_magenta(),
        "SNIPPETS".bright_green().bold(),
        format!("({} of {}, {})", snippets.len(), total, app.selection.sort.label()).dimmed()
    );
    println!("{}", "─".repeat(60).bright_magenta());

    if snippets.is_empty() {
        let hint = if app.selection.has_active_filters() {
            "No snippets match the current filters"
        } else {
            "No snippets yet. Create one with: snipvault add --title T --lang L <CODE>"
        };
        println!("{}  {}", "┃".bright_magenta(), hint);
        return Ok(());
    }

    for snippet in &snippets {
        print_snippet_line(snippet);
    }

    Ok(())
}

fn print_snippet_line(snippet: &Snippet) {
    let star = if snippet.is_favorite { "★" } else { " " };
    let language = SnippetLanguage::parse(&snippet.language);
    let tags = snippet
        .tags
        .iter()
        .map(|t| format!("#{t}"))
        .collect::<Vec<_>>()
        .join(" ");

    println!(
        "{}  {} {} {} {} {}",
        "┃".bright_magenta(),
        star.bright_yellow(),
        short_id(&snippet.id).dimmed(),
        snippet.title.bright_white(),
        format!("[{}]", language.display_name()).bright_blue(),
        tags.cyan()
    );
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// Shortest id prefix accepted in place of a full id
const MIN_ID_PREFIX: usize = 4;

#[derive(Debug)]
enum Lookup {
    Found(Snippet),
    Missing,
    Ambiguous(Vec<Snippet>),
}

/// Finds a snippet by exact id, then exact title, then id prefix, then
/// partial title. The first step with any match decides; more than one
/// match there is ambiguous rather than a guess.
fn lookup_snippet(app: &App, name_or_id: &str) -> Lookup {
    let needle = name_or_id.trim();
    if needle.is_empty() {
        return Lookup::Missing;
    }
    if let Some(snippet) = app.get_snippet_by_id(needle) {
        return Lookup::Found(snippet);
    }

    let name = needle.to_lowercase();
    let snippets = app.snippets();
    let steps: [&dyn Fn(&Snippet) -> bool; 3] = [
        &|s| s.title.to_lowercase() == name,
        &|s| needle.len() >= MIN_ID_PREFIX && s.id.starts_with(needle),
        &|s| s.title.to_lowercase().contains(&name),
    ];

    for step in steps {
        let mut found: Vec<Snippet> = snippets.iter().filter(|s| step(*s)).cloned().collect();
        match found.len() {
            0 => continue,
            1 => return Lookup::Found(found.remove(0)),
            _ => return Lookup::Ambiguous(found),
        }
    }
    Lookup::Missing
}

/// Resolves `name_or_id`, printing why when it does not name exactly one
/// snippet
fn resolve_snippet(app: &App, name_or_id: &str) -> Option<Snippet> {
    match lookup_snippet(app, name_or_id) {
        Lookup::Found(snippet) => Some(snippet),
        Lookup::Missing => {
            report_missing(app, name_or_id);
            None
        }
        Lookup::Ambiguous(candidates) => {
            report_ambiguous(name_or_id, &candidates);
            None
        }
    }
}

fn report_ambiguous(name_or_id: &str, candidates: &[Snippet]) {
    println!(
        "{}  '{}' matches {} snippets; use a longer id or the full title:",
        "┃".bright_magenta(),
        name_or_id,
        candidates.len()
    );
    for snippet in candidates {
        print_snippet_line(snippet);
    }
}

fn report_missing(app: &App, name_or_id: &str) {
    println!(
        "{}  No snippet found with name: {}",
        "┃".bright_magenta(),
        name_or_id
    );

    let snippets = app.snippets();
    if snippets.is_empty() {
        return;
    }

    println!("{}  Available snippets:", "┃".bright_magenta());
    println!("{}", "─".repeat(60).bright_magenta());
    for (idx, snippet) in snippets.iter().enumerate().take(10) {
        println!(
            "{}  {}. {}",
            "┃".bright_magenta(),
            (idx + 1).to_string().yellow(),
            snippet.title.bright_white()
        );
    }
    if snippets.len() > 10 {
        println!(
            "{}  ... and {} more",
            "┃".bright_magenta(),
            snippets.len() - 10
        );
    }
}

/// Shows the content of a specific snippet by ID or name
pub fn show_snippet(app: &App, name_or_id: &str) {
    let Some(snippet) = resolve_snippet(app, name_or_id) else {
        return;
    };

    let language = SnippetLanguage::parse(&snippet.language);

    println!(
        "{}  {} {}",
        "┃".bright_magenta(),
        "SNIPPET".bright_green().bold(),
        snippet.title.bold()
    );
    println!("{}", "─".repeat(60).bright_magenta());

    let fields = [
        ("ID", snippet.id.clone()),
        ("Language", language.display_name().to_string()),
        ("Extension", format!(".{}", language.file_extension())),
        ("Category", snippet.category.clone()),
        ("Tags", snippet.tags.join(", ")),
        ("Favorite", if snippet.is_favorite { "yes" } else { "no" }.to_string()),
        ("Created", timestamp::format(&snippet.created_at)),
        ("Updated", timestamp::format(&snippet.updated_at)),
        ("Lines", snippet.get_line_count().to_string()),
    ];
    for (label, value) in fields {
        println!("{}  {}: {}", "┃".bright_magenta(), label.bright_blue(), value);
    }

    if !snippet.description.is_empty() {
        println!("{}", "─".repeat(60).bright_magenta());
        println!("{}  {}", "┃".bright_magenta(), snippet.description.italic());
    }

    println!("{}", "─".repeat(60).bright_magenta());
    let width = snippet.get_line_count().to_string().len();
    for (i, line) in snippet.code.lines().enumerate() {
        println!(
            "{} {:>width$} │ {}",
            "┃".bright_magenta(),
            (i + 1).to_string().dimmed(),
            line,
            width = width
        );
    }
}

/// Reads `-` as standard input, anything else as the literal code
fn read_code(arg: &str) -> io::Result<String> {
    if arg != "-" {
        return Ok(arg.to_string());
    }
    let mut code = String::new();
    io::stdin().read_to_string(&mut code)?;
    Ok(code)
}

fn collect_tags(args: &ParsedArgs) -> Vec<String> {
    args.values("tag")
        .into_iter()
        .flat_map(parse_tag_list)
        .collect()
}

pub fn add_snippet(app: &mut App, args: &ParsedArgs) -> Result<(), Box<dyn Error>> {
    let Some(code_arg) = args.positional.first() else {
        println!("{}  Error: Missing snippet code", "┃".bright_magenta());
        println!(
            "{}  Usage: snipvault add --title T --lang L [--tag T] [--category C] <CODE|->",
            "┃".bright_magenta()
        );
        return Ok(());
    };

    let input = SnippetInput {
        title: args.value("title").unwrap_or_default().to_string(),
        description: args.value("description").unwrap_or_default().to_string(),
        code: read_code(code_arg)?,
        language: SnippetLanguage::parse(args.value("lang").unwrap_or_default())
            .as_str()
            .to_string(),
        tags: collect_tags(args),
        category: Category::parse(args.value("category").unwrap_or_default())
            .as_str()
            .to_string(),
        is_favorite: args.has("fav"),
    };

    if let SnippetLanguage::Other(name) = SnippetLanguage::parse(&input.language) {
        if !name.is_empty() {
            let known: Vec<&str> = SnippetLanguage::KNOWN.iter().map(|l| l.as_str()).collect();
            println!(
                "{}  Note: '{}' is not a known language ({})",
                "┃".bright_magenta(),
                name,
                known.join(", ")
            );
        }
    }

    if let Ok(snippet) = app.create_snippet(input) {
        print_snippet_line(&snippet);
    }
    Ok(())
}

pub fn edit_snippet(app: &mut App, name_or_id: &str, args: &ParsedArgs) -> Result<(), Box<dyn Error>> {
    let Some(snippet) = resolve_snippet(app, name_or_id) else {
        return Ok(());
    };

    let tags = collect_tags(args);
    let patch = SnippetPatch {
        title: args.value("title").map(str::to_string),
        description: args.value("description").map(str::to_string),
        code: args.positional.get(1).map(|arg| read_code(arg)).transpose()?,
        language: args
            .value("lang")
            .map(|l| SnippetLanguage::parse(l).as_str().to_string()),
        tags: (!tags.is_empty()).then_some(tags),
        category: args
            .value("category")
            .map(|c| Category::parse(c).as_str().to_string()),
        is_favorite: if args.has("fav") {
            Some(true)
        } else if args.has("no-fav") {
            Some(false)
        } else {
            None
        },
    };

    if patch.is_empty() {
        println!("{}  Nothing to change", "┃".bright_magenta());
        return Ok(());
    }

    if let Ok(updated) = app.update_snippet(&snippet.id, patch) {
        print_snippet_line(&updated);
    }
    Ok(())
}

pub fn toggle_favorite(app: &mut App, name_or_id: &str) {
    if let Some(snippet) = resolve_snippet(app, name_or_id)
        && let Ok(updated) = app.toggle_favorite(&snippet.id)
    {
        print_snippet_line(&updated);
    }
}

pub fn delete_snippet(app: &mut App, name_or_id: &str) {
    if let Some(snippet) = resolve_snippet(app, name_or_id) {
        app.delete_snippet(&snippet.id);
    }
}

/// Lists tags (optionally only those matching `query`) and languages in use
/// with their snippet counts
pub fn list_facets(app: &App, query: Option<&str>) {
    let facets = app.facets();
    let tags = match query {
        Some(query) => facets.find_tags_by_name(query),
        None => facets.tags.iter().collect(),
    };

    println!("{}  {}", "┃".bright_magenta(), "TAGS".bright_green().bold());
    println!("{}", "─".repeat(60).bright_magenta());
    if tags.is_empty() {
        println!("{}  (none)", "┃".bright_magenta());
    }
    for tag in tags {
        println!(
            "{}  {} {}",
            "┃".bright_magenta(),
            format!("#{}", tag.value).cyan(),
            format!("({})", tag.count).dimmed()
        );
    }

    println!("{}  {}", "┃".bright_magenta(), "LANGUAGES".bright_green().bold());
    println!("{}", "─".repeat(60).bright_magenta());
    for language in &facets.languages {
        println!(
            "{}  {} {}",
            "┃".bright_magenta(),
            SnippetLanguage::parse(&language.value).display_name().bright_blue(),
            format!("({})", language.count).dimmed()
        );
    }
}

pub fn clear_snippets(app: &mut App, confirmed: bool) {
    if !confirmed {
        println!(
            "{}  This deletes all {} snippets. Re-run with --yes to confirm",
            "┃".bright_magenta(),
            app.snippets().len()
        );
        return;
    }
    app.clear_all();
}

/// Failures are already queued as notices; the error is returned so the
/// process exits non-zero
pub fn export_snippets(app: &mut App, dir: Option<&str>) -> Result<(), Box<dyn Error>> {
    let dir = Path::new(dir.unwrap_or("."));
    app.export_to_dir(dir)?;
    Ok(())
}

pub fn import_snippets(app: &mut App, path: &str) -> Result<(), Box<dyn Error>> {
    app.import_file(Path::new(path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::MemoryBackend;
    use std::sync::Arc;

    fn app_with(titles: &[&str]) -> App {
        let mut app = App::new(Arc::new(MemoryBackend::new()), &Config::default());
        for title in titles {
            app.create_snippet(SnippetInput {
                title: title.to_string(),
                code: "body".into(),
                language: "go".into(),
                ..Default::default()
            })
            .unwrap();
        }
        app.take_notices();
        app
    }

    #[tokio::test(start_paused = true)]
    async fn blank_names_match_nothing() {
        let mut app = app_with(&["Only snippet"]);

        delete_snippet(&mut app, "");
        delete_snippet(&mut app, "   ");
        toggle_favorite(&mut app, "");

        assert!(matches!(lookup_snippet(&app, " "), Lookup::Missing));
        let remaining = app.snippets();
        assert_eq!(remaining.len(), 1);
        assert!(!remaining[0].is_favorite);
    }

    #[tokio::test(start_paused = true)]
    async fn short_id_prefixes_are_ignored() {
        let app = app_with(&["alpha"]);
        let id = app.snippets()[0].id.clone();

        assert!(matches!(lookup_snippet(&app, &id[..MIN_ID_PREFIX - 1]), Lookup::Missing));
        assert!(matches!(
            lookup_snippet(&app, &id[..MIN_ID_PREFIX]),
            Lookup::Found(s) if s.id == id
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn exact_title_wins_over_partial_matches() {
        let app = app_with(&["Hook", "Hook helpers"]);
        assert!(matches!(lookup_snippet(&app, "hook"), Lookup::Found(s) if s.title == "Hook"));
    }

    #[tokio::test(start_paused = true)]
    async fn ambiguous_partial_title_deletes_nothing() {
        let mut app = app_with(&["Debounce hook", "Throttle hook"]);

        assert!(matches!(lookup_snippet(&app, "hook"), Lookup::Ambiguous(c) if c.len() == 2));
        delete_snippet(&mut app, "hook");
        assert_eq!(app.snippets().len(), 2);

        delete_snippet(&mut app, "throttle");
        let remaining = app.snippets();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].title, "Debounce hook");
    }

    #[tokio::test(start_paused = true)]
    async fn failed_import_is_returned_as_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(&[]);

        assert!(import_snippets(&mut app, &dir.path().join("missing.json").to_string_lossy()).is_err());

        let export_dir = dir.path().to_string_lossy().into_owned();
        export_snippets(&mut app, Some(&export_dir)).unwrap();
    }
}
