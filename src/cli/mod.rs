//! CLI Module for snipvault
//! This module provides the command-line front end, letting users browse,
//! filter and edit their vault directly from the terminal.

pub mod commands;

use crate::app::{App, Notice, NoticeLevel};
use colored::Colorize;
use std::error::Error;

/// Flags that never take a value
const SWITCHES: [&str; 4] = ["fav", "no-fav", "yes", "help"];

/// Command arguments split into positionals, `--key value` options and
/// bare `--switch`es
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ParsedArgs {
    pub positional: Vec<String>,
    pub options: Vec<(String, String)>,
    pub switches: Vec<String>,
}

impl ParsedArgs {
    pub fn parse(args: &[String]) -> Result<Self, String> {
        let mut parsed = Self::default();
        let mut iter = args.iter();

        while let Some(arg) = iter.next() {
            let Some(name) = arg.strip_prefix("--") else {
                parsed.positional.push(arg.clone());
                continue;
            };

            if let Some((key, value)) = name.split_once('=') {
                parsed.options.push((key.to_string(), value.to_string()));
            } else if SWITCHES.contains(&name) {
                parsed.switches.push(name.to_string());
            } else {
                let value = iter
                    .next()
                    .ok_or_else(|| format!("Missing value for --{name}"))?;
                parsed.options.push((name.to_string(), value.clone()));
            }
        }

        Ok(parsed)
    }

    /// Last value given for `key`
    pub fn value(&self, key: &str) -> Option<&str> {
        self.options
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Every value given for a repeatable `key`
    pub fn values(&self, key: &str) -> Vec<&str> {
        self.options
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn has(&self, switch: &str) -> bool {
        self.switches.iter().any(|s| s == switch)
    }
}

/// Executes CLI commands based on the provided arguments
pub fn execute_cli(app: &mut App, args: &[String]) -> Result<(), Box<dyn Error>> {
    if args.is_empty() {
        commands::list_snippets(app, &ParsedArgs::default())?;
        return Ok(());
    }

    let parsed = match ParsedArgs::parse(&args[1..]) {
        Ok(parsed) => parsed,
        Err(message) => {
            println!("{}  Error: {}", "┃".bright_magenta(), message);
            return Ok(());
        }
    };

    match args[0].as_str() {
        "list" | "ls" | "search" | "find" => commands::list_snippets(app, &parsed)?,
        "show" | "view" | "cat" => match parsed.positional.first() {
            Some(name) => commands::show_snippet(app, name),
            None => usage("show <SNIPPET_ID_OR_TITLE>"),
        },
        "add" | "new" => commands::add_snippet(app, &parsed)?,
        "edit" => match parsed.positional.first() {
            Some(name) => commands::edit_snippet(app, name, &parsed)?,
            None => usage("edit <SNIPPET_ID_OR_TITLE> [--title T] [--lang L] ..."),
        },
        "favorite" | "fav" => match parsed.positional.first() {
            Some(name) => commands::toggle_favorite(app, name),
            None => usage("fav <SNIPPET_ID_OR_TITLE>"),
        },
        "rm" | "delete" => match parsed.positional.first() {
            Some(name) => commands::delete_snippet(app, name),
            None => usage("rm <SNIPPET_ID_OR_TITLE>"),
        },
        "tags" | "facets" => {
            commands::list_facets(app, parsed.positional.first().map(String::as_str))
        }
        "clear" => commands::clear_snippets(app, parsed.has("yes")),
        "export" => {
            commands::export_snippets(app, parsed.positional.first().map(String::as_str))?
        }
        "import" => match parsed.positional.first() {
            Some(path) => commands::import_snippets(app, path)?,
            None => usage("import <FILE>"),
        },
        "help" => print_help(),
        other => {
            println!("{}  Unknown command: {}", "┃".bright_magenta(), other);
            print_help();
        }
    }

    print_notices(app.take_notices());
    Ok(())
}

/// Prints queued notices, colored by level
pub fn print_notices(notices: Vec<Notice>) {
    for notice in notices {
        let marker = match notice.level {
            NoticeLevel::Success => "✓".bright_green(),
            NoticeLevel::Info => "i".bright_blue(),
            NoticeLevel::Warning => "!".bright_yellow(),
            NoticeLevel::Error => "✗".bright_red(),
        };
        println!("{}  {} {}", "┃".bright_magenta(), marker, notice.message);
    }
}

fn usage(text: &str) {
    println!("{}  Error: Missing argument", "┃".bright_magenta());
    println!("{}  Usage: snipvault {}", "┃".bright_magenta(), text);
}

/// Prints the help message with available commands
fn print_help() {
    println!(
        "{}  {}",
        "┃".bright_magenta(),
        "SNIPVAULT - CODE SNIPPET MANAGER".bold()
    );

    println!("{}  {}", "┃".bright_magenta(), "USAGE:".bright_yellow());
    println!("{}  snipvault [COMMAND] [ARGS]", "┃".bright_magenta());
    println!("{}  {}", "┃".bright_magenta(), "COMMANDS:".bright_yellow());

    let commands = [
        ("list, ls [QUERY]", "List snippets matching the query and filters"),
        ("  --tag T, --lang L", "Require tag T (all given) / language L (any given)"),
        ("  --fav, --sort KEY", "Favorites only / sort order (newest, title-asc, ...)"),
        ("show <ID|TITLE>", "Display a snippet (partial title works)"),
        ("add --title T --lang L", "Create a snippet from CODE or '-' for stdin"),
        ("edit <ID|TITLE> [FLAGS]", "Change the given fields of a snippet"),
        ("fav <ID|TITLE>", "Toggle the favorite flag"),
        ("rm <ID|TITLE>", "Delete a snippet"),
        ("tags [QUERY]", "Show tags and languages in use"),
        ("export [DIR]", "Write all snippets to a dated JSON file"),
        ("import <FILE>", "Add snippets from an export file"),
        ("clear --yes", "Delete every snippet"),
        ("help", "Display this help message"),
    ];
    for (command, description) in commands {
        println!(
            "{}  {:<27} {}",
            "┃".bright_magenta(),
            command.bright_white(),
            description
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_options_switches_and_positionals() {
        let parsed = ParsedArgs::parse(&args(&[
            "hooks", "--tag", "a", "--fav", "--tag=b", "--sort", "title-asc",
        ]))
        .unwrap();

        assert_eq!(parsed.positional, vec!["hooks"]);
        assert_eq!(parsed.values("tag"), vec!["a", "b"]);
        assert_eq!(parsed.value("sort"), Some("title-asc"));
        assert!(parsed.has("fav"));
        assert!(!parsed.has("no-fav"));
    }

    #[test]
    fn option_without_value_is_an_error() {
        assert!(ParsedArgs::parse(&args(&["--lang"])).is_err());
    }

    #[test]
    fn later_values_win() {
        let parsed = ParsedArgs::parse(&args(&["--title", "a", "--title", "b"])).unwrap();
        assert_eq!(parsed.value("title"), Some("b"));
    }
}
