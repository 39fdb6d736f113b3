use serde::Deserialize;

use crate::infrastructure::storage::{PostgresConfig, StorageConfig, StorageType};

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub storage: StorageSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Storage backend selection and pool tuning
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// `memory` or `postgres`
    pub backend: String,
    /// Falls back to the `DATABASE_URL` environment variable
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        let pool = PostgresConfig::default();

        Self {
            backend: "memory".to_string(),
            database_url: None,
            max_connections: pool.max_connections,
            min_connections: pool.min_connections,
            connect_timeout_secs: pool.connect_timeout_secs,
            idle_timeout_secs: pool.idle_timeout_secs,
        }
    }
}

impl StorageSettings {
    /// Resolve the settings into a concrete storage configuration
    pub fn resolve(&self) -> Result<StorageConfig, config::ConfigError> {
        self.resolve_with_env_url(std::env::var("DATABASE_URL").ok())
    }

    /// PostgreSQL pool settings; `url` takes precedence over the configured one
    pub fn postgres_config(&self, url: Option<String>) -> Result<PostgresConfig, config::ConfigError> {
        self.postgres_config_with_env_url(url, std::env::var("DATABASE_URL").ok())
    }

    fn resolve_with_env_url(&self, env_url: Option<String>) -> Result<StorageConfig, config::ConfigError> {
        let storage_type = StorageType::from_str(&self.backend).ok_or_else(|| {
            config::ConfigError::Message(format!("Unknown storage backend '{}'", self.backend))
        })?;

        match storage_type {
            StorageType::InMemory => Ok(StorageConfig::in_memory()),
            StorageType::Postgres => Ok(StorageConfig::postgres(
                self.postgres_config_with_env_url(None, env_url)?,
            )),
        }
    }

    fn postgres_config_with_env_url(
        &self,
        url: Option<String>,
        env_url: Option<String>,
    ) -> Result<PostgresConfig, config::ConfigError> {
        let url = url
            .or_else(|| self.database_url.clone())
            .filter(|url| !url.trim().is_empty())
            .or(env_url)
            .ok_or_else(|| {
                config::ConfigError::Message(
                    "storage.database_url or DATABASE_URL is required for postgres".to_string(),
                )
            })?;

        Ok(PostgresConfig::new(url)
            .with_max_connections(self.max_connections)
            .with_min_connections(self.min_connections)
            .with_connect_timeout(self.connect_timeout_secs)
            .with_idle_timeout(self.idle_timeout_secs))
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.storage.backend, "memory");
    }

    #[test]
    fn test_partial_sources_keep_defaults() {
        let config: AppConfig = config::Config::builder()
            .set_override("server.port", 9090)
            .unwrap()
            .set_override("logging.format", "json")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.storage.backend, "memory");
    }

    #[test]
    fn test_resolve_memory() {
        let settings = StorageSettings::default();
        let resolved = settings.resolve_with_env_url(None).unwrap();
        assert_eq!(resolved.storage_type(), StorageType::InMemory);
    }

    #[test]
    fn test_resolve_postgres_prefers_configured_url() {
        let settings = StorageSettings {
            backend: "postgres".to_string(),
            database_url: Some("postgres://db/escola".to_string()),
            max_connections: 4,
            ..Default::default()
        };

        let resolved = settings
            .resolve_with_env_url(Some("postgres://env/other".to_string()))
            .unwrap();
        match resolved {
            StorageConfig::Postgres(pg) => {
                assert_eq!(pg.url, "postgres://db/escola");
                assert_eq!(pg.max_connections, 4);
            }
            other => panic!("expected postgres config, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_postgres_falls_back_to_env_url() {
        let settings = StorageSettings {
            backend: "postgres".to_string(),
            ..Default::default()
        };

        match settings.resolve_with_env_url(Some("postgres://env/escola".to_string())) {
            Ok(StorageConfig::Postgres(pg)) => assert_eq!(pg.url, "postgres://env/escola"),
            other => panic!("expected postgres config, got {:?}", other),
        }

        assert!(settings.resolve_with_env_url(None).is_err());
    }

    #[test]
    fn test_postgres_config_override_url() {
        let settings = StorageSettings {
            database_url: Some("postgres://db/escola".to_string()),
            ..Default::default()
        };

        let pg = settings
            .postgres_config_with_env_url(Some("postgres://cli/escola".to_string()), None)
            .unwrap();
        assert_eq!(pg.url, "postgres://cli/escola");
    }

    #[test]
    fn test_resolve_unknown_backend() {
        let settings = StorageSettings {
            backend: "sqlite".to_string(),
            ..Default::default()
        };

        assert!(settings.resolve_with_env_url(None).is_err());
    }
}
