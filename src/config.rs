use crate::constants;
use crate::error::{EtlError, Result};
use crate::infra::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

const PASSWORD_ENV: &str = "MUSEUM_ETL_DATABASE_PASSWORD";
const CONCURRENCY_ENV: &str = "MUSEUM_ETL_CONCURRENCY";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub sources: SourcesConfig,
    pub fetch: FetchConfig,
    pub sink: SinkConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Prefix for the relative hrefs found in list tables
    pub site_origin: String,
    pub museums_url: String,
    pub museums_table_class: String,
    pub cities_url: String,
    pub cities_table_class: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            site_origin: constants::SITE_ORIGIN.to_string(),
            museums_url: constants::MUSEUMS_URL.to_string(),
            museums_table_class: constants::MUSEUMS_TABLE_CLASS.to_string(),
            cities_url: constants::CITIES_URL.to_string(),
            cities_table_class: constants::CITIES_TABLE_CLASS.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_seconds: u64,
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    /// Pages fetched at once during the per-museum and per-city stages
    pub concurrency: usize,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            max_attempts: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 8_000,
            concurrency: 8,
            user_agent: constants::USER_AGENT.to_string(),
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_delay: Duration::from_millis(self.initial_backoff_ms),
            max_delay: Duration::from_millis(self.max_backoff_ms),
            ..RetryPolicy::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkDriver {
    Sqlite,
    Json,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SinkConfig {
    pub driver: SinkDriver,
    /// Host of a remote database; unused by the local drivers
    pub database_address: Option<String>,
    /// SQLite file path for the `sqlite` driver
    pub database_name: String,
    pub database_username: Option<String>,
    pub database_password: Option<String>,
    pub table_name: String,
    /// Directory for the `json` driver
    pub output_dir: String,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            driver: SinkDriver::Json,
            database_address: None,
            database_name: "museums.db".to_string(),
            database_username: None,
            database_password: None,
            table_name: "museums".to_string(),
            output_dir: "output".to_string(),
        }
    }
}

impl Config {
    /// Load from a TOML file, falling back to defaults when the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| {
                EtlError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
            })?;
            Self::from_toml_str(&content)?
        } else {
            warn!("Config file '{}' not found, using defaults", path.display());
            Self::default()
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(password) = std::env::var(PASSWORD_ENV) {
            self.sink.database_password = Some(password);
        }
        if let Ok(raw) = std::env::var(CONCURRENCY_ENV) {
            self.fetch.concurrency = raw
                .trim()
                .parse()
                .map_err(|_| EtlError::Config(format!("{CONCURRENCY_ENV} must be a positive integer, got '{raw}'")))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.fetch.concurrency == 0 {
            return Err(EtlError::Config("fetch.concurrency must be at least 1".to_string()));
        }
        if self.fetch.max_attempts == 0 {
            return Err(EtlError::Config("fetch.max_attempts must be at least 1".to_string()));
        }
        let urls = [
            ("sources.museums_url", &self.sources.museums_url),
            ("sources.cities_url", &self.sources.cities_url),
        ];
        for (key, url) in urls {
            if url.trim().is_empty() {
                return Err(EtlError::Config(format!("{key} must not be empty")));
            }
        }
        if !self
            .sink
            .table_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
            || self.sink.table_name.is_empty()
        {
            return Err(EtlError::Config(format!(
                "sink.table_name '{}' must be a plain identifier",
                self.sink.table_name
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            [fetch]
            concurrency = 2

            [sink]
            driver = "sqlite"
            database_name = "/tmp/museums.db"
            "#,
        )
        .unwrap();

        assert_eq!(config.fetch.concurrency, 2);
        assert_eq!(config.fetch.max_attempts, 3);
        assert_eq!(config.sink.driver, SinkDriver::Sqlite);
        assert_eq!(config.sink.table_name, "museums");
        assert_eq!(config.sources.cities_table_class, "sortable wikitable mw-datatable");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = Config::default();
        config.fetch.concurrency = 0;
        assert!(matches!(config.validate(), Err(EtlError::Config(_))));

        let mut config = Config::default();
        config.sink.table_name = "museums; DROP TABLE x".to_string();
        assert!(matches!(config.validate(), Err(EtlError::Config(_))));

        let mut config = Config::default();
        config.sources.museums_url = " ".to_string();
        assert!(matches!(config.validate(), Err(EtlError::Config(_))));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.sources.museums_url, constants::MUSEUMS_URL);
    }

    #[test]
    fn test_retry_policy_from_fetch_config() {
        let fetch = FetchConfig {
            max_attempts: 5,
            initial_backoff_ms: 10,
            max_backoff_ms: 40,
            ..FetchConfig::default()
        };
        let policy = fetch.retry_policy();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.initial_delay, Duration::from_millis(10));
        assert_eq!(policy.max_delay, Duration::from_millis(40));
    }
}
