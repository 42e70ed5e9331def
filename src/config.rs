//! Application configuration
//!
//! Read from `<config_dir>/weather-tui/config.toml`. Every field is optional;
//! a missing file yields the defaults. `WEATHER_TUI_API_KEY` and
//! `WEATHER_TUI_DATA_FILE` override the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::model::SearchSettings;

const APP_DIR: &str = "weather-tui";
const CONFIG_FILE: &str = "config.toml";

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub debounce_ms: u64,
    pub min_query_len: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 200,
            min_query_len: 2,
        }
    }
}

impl SearchConfig {
    pub fn settings(&self) -> SearchSettings {
        SearchSettings {
            debounce: Duration::from_millis(self.debounce_ms),
            min_query_len: self.min_query_len,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub autocomplete_url: String,
    pub weather_url: String,
    pub api_key: String,
    pub request_timeout_secs: u64,
    pub search: SearchConfig,
    pub data_file: PathBuf,
    pub log_dir: PathBuf,
}

fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            autocomplete_url: "http://gd.geobytes.com/AutoCompleteCity".to_string(),
            weather_url: "https://api.openweathermap.org/data/2.5/weather".to_string(),
            api_key: String::new(),
            request_timeout_secs: 10,
            search: SearchConfig::default(),
            data_file: data_dir().join("favorites.json"),
            log_dir: data_dir().join("logs"),
        }
    }
}

impl AppConfig {
    /// Default location of the configuration file, if the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Load from the default location and apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::default_path() {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse `path`, falling back to defaults when it does not exist.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.display().to_string(),
                    source,
                });
            }
        };

        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(key) = var("WEATHER_TUI_API_KEY") {
            self.api_key = key;
        }
        if let Some(file) = var("WEATHER_TUI_DATA_FILE") {
            self.data_file = PathBuf::from(file);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::from_file(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.search.settings(), SearchSettings::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "api_key = \"abc123\"\n\n[search]\ndebounce_ms = 350\n"
        )
        .unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.api_key, "abc123");
        assert_eq!(config.search.debounce_ms, 350);
        assert_eq!(config.search.min_query_len, 2);
        assert_eq!(config.request_timeout_secs, 10);
    }

    #[test]
    fn invalid_toml_is_reported_with_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "request_timeout_secs = \"soon\"").unwrap();

        let err = AppConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { ref path, .. } if *path == file.path().display().to_string()));
    }

    #[test]
    fn environment_overrides_file_values() {
        let mut config = AppConfig {
            api_key: "from-file".into(),
            ..AppConfig::default()
        };
        config.apply_overrides(|key| match key {
            "WEATHER_TUI_API_KEY" => Some("from-env".into()),
            "WEATHER_TUI_DATA_FILE" => Some("/tmp/cities.json".into()),
            _ => None,
        });
        assert_eq!(config.api_key, "from-env");
        assert_eq!(config.data_file, PathBuf::from("/tmp/cities.json"));
    }
}
