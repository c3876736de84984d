use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde_json::Value;

use crate::error::{Result, VaultError};
use crate::models::Snippet;

/// Fields every imported record must carry with a non-empty string value
const REQUIRED_TEXT_FIELDS: [&str; 6] = ["id", "title", "code", "language", "createdAt", "updatedAt"];

/// Pretty-printed JSON array of the full snippet records
pub fn export_document(snippets: &[Snippet]) -> Result<String> {
    serde_json::to_string_pretty(snippets)
        .map_err(|e| VaultError::Validation(format!("failed to serialize snippets: {e}")))
}

/// `snippetvault-export-YYYY-MM-DD.json`
pub fn export_file_name(date: NaiveDate) -> String {
    format!("snippetvault-export-{}.json", date.format("%Y-%m-%d"))
}

/// Writes the export document into `dir` under the dated file name
pub fn write_export(dir: &Path, snippets: &[Snippet], date: NaiveDate) -> Result<PathBuf> {
    let document = export_document(snippets)?;
    fs::create_dir_all(dir)?;
    let path = dir.join(export_file_name(date));
    fs::write(&path, document)?;
    Ok(path)
}

/// Import from a file
pub fn read_import_file(path: &Path) -> Result<Vec<Snippet>> {
    let contents = fs::read_to_string(path)?;
    parse_import_document(&contents)
}

/// Parses an import document. The whole batch is rejected when the text is
/// not a JSON array or when any record lacks a required field.
pub fn parse_import_document(raw: &str) -> Result<Vec<Snippet>> {
    let document: Value =
        serde_json::from_str(raw).map_err(|e| VaultError::ImportParse(e.to_string()))?;

    let Value::Array(records) = document else {
        return Err(VaultError::ImportParse("expected a top-level array".into()));
    };

    for (index, record) in records.iter().enumerate() {
        validate_record(index, record)?;
    }

    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            serde_json::from_value(record)
                .map_err(|e| VaultError::Validation(format!("record {index}: {e}")))
        })
        .collect()
}

fn validate_record(index: usize, record: &Value) -> Result<()> {
    let Some(fields) = record.as_object() else {
        return Err(VaultError::Validation(format!("record {index} is not an object")));
    };

    for name in REQUIRED_TEXT_FIELDS {
        let present = fields
            .get(name)
            .and_then(Value::as_str)
            .is_some_and(|value| !value.trim().is_empty());
        if !present {
            return Err(VaultError::Validation(format!(
                "record {index} is missing required field `{name}`"
            )));
        }
    }

    if !fields.get("tags").is_some_and(Value::is_array) {
        return Err(VaultError::Validation(format!(
            "record {index} is missing its `tags` list"
        )));
    }

    Ok(())
}
