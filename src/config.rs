//! Configuration management using the prefer crate.
//!
//! Every section has a full default, so a config file only needs the keys it
//! changes.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::models::RecordVariant;
use crate::scrapers::browser::BrowserEngineConfig;
use crate::scrapers::config::{ExtractionConfig, PacingConfig};

/// Marketplace searched when none is configured.
pub const DEFAULT_BASE_URL: &str = "https://www.carousell.sg";

/// Result cap used when the caller does not pass one.
pub const DEFAULT_MAX_RESULTS: usize = 20;

/// Configuration file structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Marketplace root; search URLs are `{base_url}/search/{query}`.
    pub base_url: String,
    /// Default result cap for `search`.
    pub max_results: usize,
    /// Keys each record carries.
    pub record: RecordVariant,
    pub browser: BrowserEngineConfig,
    pub pacing: PacingConfig,
    pub extraction: ExtractionConfig,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            max_results: DEFAULT_MAX_RESULTS,
            record: RecordVariant::default(),
            browser: BrowserEngineConfig::default(),
            pacing: PacingConfig::default(),
            extraction: ExtractionConfig::default(),
            source_path: None,
        }
    }
}

impl Config {
    /// Load configuration using prefer for discovery.
    /// Falls back to defaults when no marketscrape config file is found.
    pub async fn load() -> Self {
        match prefer::load("marketscrape").await {
            Ok(pref_config) => {
                if let Some(path) = pref_config.source_path() {
                    match Self::load_from_path(path).await {
                        Ok(config) => config,
                        Err(e) => {
                            tracing::warn!("Ignoring config file {}: {}", path.display(), e);
                            Self::default_with_env()
                        }
                    }
                } else {
                    Self::default_with_env()
                }
            }
            Err(_) => Self::default_with_env(),
        }
    }

    /// Defaults with environment variable overrides applied.
    pub fn default_with_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Load configuration from a specific file path.
    /// Supports JSON, TOML and YAML based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

        let mut config: Config = match ext {
            "toml" => toml::from_str(&contents)
                .map_err(|e| format!("Failed to parse TOML config: {}", e))?,
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .map_err(|e| format!("Failed to parse YAML config: {}", e))?,
            _ => serde_json::from_str(&contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e))?,
        };

        config.source_path = Some(path.to_path_buf());
        config.validate()?;
        Ok(config.with_env_overrides())
    }

    /// Apply environment variable overrides.
    ///
    /// - `MARKETSCRAPE_BASE_URL` - Marketplace root URL
    /// - `BROWSER_URL`, `MARKETSCRAPE_HEADLESS` - see [`BrowserEngineConfig`]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("MARKETSCRAPE_BASE_URL") {
            if !val.trim().is_empty() {
                self.base_url = val.trim().to_string();
            }
        }
        self.browser = self.browser.with_env_overrides();
        self
    }

    /// Parsed base URL.
    pub fn base(&self) -> Result<Url, String> {
        Url::parse(&self.base_url).map_err(|e| format!("Invalid base_url '{}': {}", self.base_url, e))
    }

    fn validate(&self) -> Result<(), String> {
        self.base()?;
        if self.max_results == 0 {
            return Err("max_results must be positive".to_string());
        }
        Ok(())
    }

    /// Render as TOML, as printed by `mscrape config`.
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize config: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::scrapers::config::StrategyKind;

    fn write_config(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn loads_partial_toml() {
        let file = write_config(
            ".toml",
            r#"
            base_url = "https://www.carousell.com.my"
            record = "minimal"

            [pacing]
            settle_ms = 0

            [extraction]
            cascade = ["line-position"]
            "#,
        );
        let config = Config::load_from_path(file.path()).await.unwrap();
        assert_eq!(config.base_url, "https://www.carousell.com.my");
        assert_eq!(config.record, RecordVariant::Minimal);
        assert_eq!(config.pacing.settle_ms, 0);
        assert_eq!(config.pacing.min_scrolls, 2);
        assert_eq!(config.extraction.cascade, vec![StrategyKind::LinePosition]);
        assert_eq!(config.max_results, DEFAULT_MAX_RESULTS);
        assert_eq!(config.source_path.as_deref(), Some(file.path()));
    }

    #[tokio::test]
    async fn loads_yaml_and_json() {
        let yaml = write_config(".yaml", "max_results: 5\nbrowser:\n  timeout: 60\n");
        let config = Config::load_from_path(yaml.path()).await.unwrap();
        assert_eq!(config.max_results, 5);
        assert_eq!(config.browser.timeout, 60);

        let json = write_config(".json", r#"{"extraction": {"min_container_lines": 4}}"#);
        let config = Config::load_from_path(json.path()).await.unwrap();
        assert_eq!(config.extraction.min_container_lines, 4);
    }

    #[tokio::test]
    async fn rejects_invalid_values() {
        let file = write_config(".toml", "base_url = \"not a url\"\n");
        let err = Config::load_from_path(file.path()).await.unwrap_err();
        assert!(err.contains("Invalid base_url"));

        let file = write_config(".toml", "max_results = 0\n");
        assert!(Config::load_from_path(file.path()).await.is_err());

        let file = write_config(".toml", "max_results = [\n");
        let err = Config::load_from_path(file.path()).await.unwrap_err();
        assert!(err.contains("TOML"));
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load_from_path(&dir.path().join("absent.toml"))
            .await
            .unwrap_err();
        assert!(err.contains("Failed to read"));
    }

    #[test]
    fn toml_output_round_trips() {
        let config = Config::default();
        let rendered = config.to_toml().unwrap();
        let parsed: Config = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, config);
    }
}
