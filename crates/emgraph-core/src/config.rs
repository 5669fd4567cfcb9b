//! Configuration for emgraph services.
//!
//! Configuration is loaded from (in priority order):
//! 1. Environment variables (`EMGRAPH__` prefix, `__` separator)
//! 2. Config file (`emgraph.toml`, sections `[client]` and `[collector]`)
//! 3. Defaults

use serde::Deserialize;

use crate::error::ConfigError;

/// Connection settings for the EM-Infra REST API.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the API, e.g. `https://services.apps.mow.vlaanderen.be/eminfra`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token. Obtaining it is the caller's concern.
    #[serde(default)]
    pub token: Option<String>,

    /// Records requested per search page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Behaviour of the pattern collector.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectorConfig {
    /// Maximum uuids per remote call.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Skip entities that are already stored instead of failing (first write wins).
    #[serde(default = "default_true")]
    pub ignore_duplicates: bool,

    /// Include traversed relations in filter results.
    #[serde(default = "default_true")]
    pub include_relations: bool,
}

/// Top-level settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub collector: CollectorConfig,
}

fn default_base_url() -> String {
    "https://services.apps.mow.vlaanderen.be/eminfra".to_string()
}

fn default_page_size() -> usize {
    100
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_batch_size() -> usize {
    10_000
}

fn default_true() -> bool {
    true
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
            page_size: default_page_size(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            ignore_duplicates: true,
            include_relations: true,
        }
    }
}

impl Settings {
    /// Load settings from `{file_prefix}.toml` (optional) and the environment.
    pub fn load(file_prefix: &str) -> Result<Self, ConfigError> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(file_prefix).required(false))
            .add_source(
                config::Environment::with_prefix("EMGRAPH")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = cfg.try_deserialize()?;
        settings.validate()?;
        tracing::debug!(base_url = %settings.client.base_url, "Settings loaded");
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.client.page_size == 0 {
            return Err(ConfigError::Invalid("client.page_size must be > 0".to_string()));
        }
        if self.collector.batch_size == 0 {
            return Err(ConfigError::Invalid("collector.batch_size must be > 0".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.client.page_size, 100);
        assert_eq!(settings.client.timeout_secs, 60);
        assert!(settings.client.token.is_none());
        assert_eq!(settings.collector.batch_size, 10_000);
        assert!(settings.collector.ignore_duplicates);
        assert!(settings.collector.include_relations);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("emgraph.toml"),
            r#"
[client]
base_url = "https://example.test/eminfra"
page_size = 50

[collector]
batch_size = 500
ignore_duplicates = false
"#,
        )
        .unwrap();

        let prefix = dir.path().join("emgraph");
        let settings = Settings::load(prefix.to_str().unwrap()).unwrap();
        assert_eq!(settings.client.base_url, "https://example.test/eminfra");
        assert_eq!(settings.client.page_size, 50);
        assert_eq!(settings.client.timeout_secs, 60);
        assert_eq!(settings.collector.batch_size, 500);
        assert!(!settings.collector.ignore_duplicates);
        assert!(settings.collector.include_relations);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("absent");
        let settings = Settings::load(prefix.to_str().unwrap()).unwrap();
        assert_eq!(settings.collector.batch_size, 10_000);
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let mut settings = Settings::default();
        settings.collector.batch_size = 0;
        assert!(matches!(settings.validate(), Err(ConfigError::Invalid(_))));
    }
}
