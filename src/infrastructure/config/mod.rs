//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::application::errors::ConfigError;
use crate::domain::entities::{EventContext, LibraryInfo};

/// Service configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub providers: ProvidersConfig,
    pub analytics: AnalyticsConfig,
    pub logging: LoggingConfig,
    pub tournaments: TournamentsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ServiceConfig {
    pub name: String,
    pub environment: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct StorageConfig {
    /// SQLite file holding bot commands
    pub database: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProvidersConfig {
    /// Deadline for every backend call; 0 disables it
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct AnalyticsConfig {
    pub library_name: String,
    pub library_version: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct TournamentsConfig {
    pub default_list_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                name: "arena-core".to_string(),
                environment: "development".to_string(),
            },
            storage: StorageConfig {
                database: PathBuf::from("arena.db"),
            },
            providers: ProvidersConfig { timeout_ms: 5_000 },
            analytics: AnalyticsConfig {
                library_name: env!("CARGO_PKG_NAME").to_string(),
                library_version: env!("CARGO_PKG_VERSION").to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
            tournaments: TournamentsConfig {
                default_list_limit: 100,
            },
        }
    }
}

impl Config {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read config: {}", e)))?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by `ARENA_*` environment variables
    pub fn load_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Ok(env) = std::env::var("ARENA_ENVIRONMENT") {
            config.service.environment = env;
        }
        if let Ok(path) = std::env::var("ARENA_DATABASE") {
            config.storage.database = PathBuf::from(path);
        }
        if let Ok(raw) = std::env::var("ARENA_PROVIDER_TIMEOUT_MS") {
            config.providers.timeout_ms = raw.parse().map_err(|_| {
                ConfigError::InvalidValue(format!("ARENA_PROVIDER_TIMEOUT_MS={}", raw))
            })?;
        }
        if let Ok(level) = std::env::var("ARENA_LOG_LEVEL") {
            config.logging.level = level;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self)
            .map_err(|e| ConfigError::Parse(format!("Failed to render config: {}", e)))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service.name.trim().is_empty() {
            return Err(ConfigError::MissingField("service.name".to_string()));
        }
        if self.storage.database.as_os_str().is_empty() {
            return Err(ConfigError::MissingField("storage.database".to_string()));
        }
        if self.analytics.library_name.trim().is_empty() {
            return Err(ConfigError::MissingField("analytics.library-name".to_string()));
        }
        if self.tournaments.default_list_limit == 0 {
            return Err(ConfigError::InvalidValue(
                "tournaments.default-list-limit must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.providers.timeout_ms)
    }

    pub fn event_context(&self) -> EventContext {
        EventContext {
            direct: true,
            library: LibraryInfo {
                name: self.analytics.library_name.clone(),
                version: self.analytics.library_version.clone(),
            },
        }
    }
}
