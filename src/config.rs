use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow};

use crate::chart::RedrawPolicy;
use crate::client::BackendKind;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Environment variable that overrides the configured base URL
pub const API_URL_ENV: &str = "SPENDCHAT_API_URL";

/// Language of the fixed user-facing error text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Es,
}

impl Locale {
    pub fn error_text(&self) -> &'static str {
        match self {
            Locale::En => "Sorry, something went wrong. Please try again.",
            Locale::Es => "Lo siento, algo salió mal. Por favor, inténtalo de nuevo.",
        }
    }
}

/// On-disk config file. Every field is optional.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub base_url: Option<String>,
    pub backend: Option<BackendKind>,
    pub locale: Option<Locale>,
    pub redraw: Option<RedrawPolicy>,
}

/// Values given on the command line; these win over everything else
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub backend: Option<BackendKind>,
    pub locale: Option<Locale>,
    pub redraw: Option<RedrawPolicy>,
}

/// Fully resolved settings the app runs with
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settings {
    pub base_url: String,
    pub backend: BackendKind,
    pub locale: Locale,
    pub redraw: RedrawPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Config::new().resolve(Overrides::default(), None)
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from the user config dir; a missing file means defaults
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)
            .map_err(|e| anyhow!("Invalid config file {}: {}", path.display(), e))?;
        Ok(config)
    }

    pub fn save(&self) -> Result<PathBuf> {
        let config_path = Self::get_config_path()?;
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    /// Merge with CLI overrides and the environment: CLI, then env, then file,
    /// then built-in defaults.
    pub fn resolve(self, overrides: Overrides, env_base_url: Option<String>) -> Settings {
        let base_url = overrides
            .base_url
            .or(env_base_url.filter(|url| !url.trim().is_empty()))
            .or(self.base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Settings {
            base_url,
            backend: overrides.backend.or(self.backend).unwrap_or_default(),
            locale: overrides.locale.or(self.locale).unwrap_or_default(),
            redraw: overrides.redraw.or(self.redraw).unwrap_or_default(),
        }
    }

    /// File values with CLI overrides applied, for writing back to disk.
    /// The environment is left out so one-off values are not persisted.
    pub fn with_overrides(self, overrides: Overrides) -> Config {
        Config {
            base_url: overrides.base_url.or(self.base_url),
            backend: overrides.backend.or(self.backend),
            locale: overrides.locale.or(self.locale),
            redraw: overrides.redraw.or(self.redraw),
        }
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("spendchat").join("config.json"))
    }
}

/// Log file location; the terminal is taken by the UI
pub fn log_path() -> Result<PathBuf> {
    let data_dir = dirs::data_local_dir()
        .or_else(dirs::cache_dir)
        .ok_or_else(|| anyhow!("Could not determine data directory"))?;

    Ok(data_dir.join("spendchat").join("spendchat.log"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::new());

        let settings = config.resolve(Overrides::default(), None);
        assert_eq!(settings.base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.backend, BackendKind::Remote);
        assert_eq!(settings.locale, Locale::En);
        assert_eq!(settings.redraw, RedrawPolicy::Transcript);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            base_url: Some("http://chat.internal:9000".to_string()),
            backend: Some(BackendKind::Echo),
            locale: Some(Locale::Es),
            redraw: Some(RedrawPolicy::Data),
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains(r#""backend": "echo""#));
    }

    #[test]
    fn test_partial_file_is_accepted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "locale": "es" }"#).unwrap();

        let settings = Config::load_from(&path)
            .unwrap()
            .resolve(Overrides::default(), None);
        assert_eq!(settings.locale, Locale::Es);
        assert_eq!(settings.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_precedence_cli_env_file_default() {
        let file = Config {
            base_url: Some("http://file".to_string()),
            backend: Some(BackendKind::Echo),
            ..Config::new()
        };

        let from_file = file.clone().resolve(Overrides::default(), None);
        assert_eq!(from_file.base_url, "http://file");

        let from_env = file
            .clone()
            .resolve(Overrides::default(), Some("http://env".to_string()));
        assert_eq!(from_env.base_url, "http://env");

        let blank_env = file
            .clone()
            .resolve(Overrides::default(), Some("  ".to_string()));
        assert_eq!(blank_env.base_url, "http://file");

        let from_cli = file.resolve(
            Overrides {
                base_url: Some("http://cli".to_string()),
                backend: Some(BackendKind::Remote),
                ..Overrides::default()
            },
            Some("http://env".to_string()),
        );
        assert_eq!(from_cli.base_url, "http://cli");
        assert_eq!(from_cli.backend, BackendKind::Remote);
    }

    #[test]
    fn test_with_overrides_keeps_unset_fields_empty() {
        let file = Config {
            base_url: Some("http://file".to_string()),
            redraw: Some(RedrawPolicy::Data),
            ..Config::new()
        };

        let merged = file.with_overrides(Overrides {
            base_url: Some("http://cli".to_string()),
            backend: Some(BackendKind::Echo),
            ..Overrides::default()
        });
        assert_eq!(
            merged,
            Config {
                base_url: Some("http://cli".to_string()),
                backend: Some(BackendKind::Echo),
                locale: None,
                redraw: Some(RedrawPolicy::Data),
            }
        );
    }

    #[test]
    fn test_error_text_per_locale() {
        assert_ne!(Locale::En.error_text(), Locale::Es.error_text());
        assert!(Locale::Es.error_text().starts_with("Lo siento"));
    }
}
