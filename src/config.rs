use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::filter::SortKey;

pub const APP_DIR: &str = "snipvault";
pub const CONFIG_FILENAME: &str = "config.toml";
pub const DATA_DIR_ENV: &str = "SNIPVAULT_DATA_DIR";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the stored collection
    pub data_dir: PathBuf,
    /// Quiet period before changes are written to disk
    pub debounce_ms: u64,
    pub default_sort: SortKey,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            debounce_ms: 300,
            default_sort: SortKey::Newest,
        }
    }
}

impl Config {
    /// Loads the user's config file, falling back to defaults when it does not
    /// exist, then applies environment overrides.
    pub fn load() -> Result<Self> {
        let config = match get_config_file_path() {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };

        Ok(config.with_data_dir_override(env::var(DATA_DIR_ENV).ok()))
    }

    /// Replaces the data directory with `dir` unless it is unset or blank
    pub fn with_data_dir_override(mut self, dir: Option<String>) -> Self {
        if let Some(dir) = dir
            && !dir.trim().is_empty()
        {
            self.data_dir = PathBuf::from(dir);
        }
        self
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Get the snipvault configuration file path
pub fn get_config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILENAME))
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
    }

    #[test]
    fn fields_override_defaults() {
        let config = Config::parse(
            r#"
            data_dir = "/tmp/vault"
            debounce_ms = 50
            default_sort = "title-asc"
            "#,
        )
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/vault"));
        assert_eq!(config.debounce(), Duration::from_millis(50));
        assert_eq!(config.default_sort, SortKey::TitleAsc);
    }

    #[test]
    fn invalid_sort_is_an_error() {
        assert!(Config::parse(r#"default_sort = "random""#).is_err());
    }

    #[test]
    fn data_dir_override_ignores_blank_values() {
        let config = Config::default();
        let default_dir = config.data_dir.clone();

        assert_eq!(config.clone().with_data_dir_override(None).data_dir, default_dir);
        assert_eq!(
            config.clone().with_data_dir_override(Some("  ".into())).data_dir,
            default_dir
        );
        assert_eq!(
            config.with_data_dir_override(Some("/srv/vault".into())).data_dir,
            PathBuf::from("/srv/vault")
        );
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::from_file(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }
}
