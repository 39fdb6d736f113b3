//! Storage factory for runtime backend selection

use std::sync::Arc;

use tracing::info;

use crate::domain::storage::SchoolStore;
use crate::domain::DomainError;

use super::in_memory::InMemorySchoolStore;
use super::postgres::{PostgresConfig, PostgresSchoolStore};

/// Supported storage backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
    /// Process-local tables, lost on restart
    InMemory,
    Postgres,
}

impl StorageType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "memory" | "inmemory" | "in-memory" | "in_memory" => Some(Self::InMemory),
            "postgres" | "postgresql" | "pg" => Some(Self::Postgres),
            _ => None,
        }
    }
}

/// Resolved storage configuration
#[derive(Debug, Clone)]
pub enum StorageConfig {
    InMemory,
    Postgres(PostgresConfig),
}

impl StorageConfig {
    pub fn in_memory() -> Self {
        Self::InMemory
    }

    pub fn postgres(config: PostgresConfig) -> Self {
        Self::Postgres(config)
    }

    pub fn postgres_url(url: impl Into<String>) -> Self {
        Self::Postgres(PostgresConfig::new(url))
    }

    pub fn storage_type(&self) -> StorageType {
        match self {
            Self::InMemory => StorageType::InMemory,
            Self::Postgres(_) => StorageType::Postgres,
        }
    }
}

/// Factory for creating store instances
#[derive(Debug)]
pub struct StorageFactory;

impl StorageFactory {
    /// Creates the store for `config`; PostgreSQL stores are migrated before use
    pub async fn create(config: &StorageConfig) -> Result<Arc<dyn SchoolStore>, DomainError> {
        match config {
            StorageConfig::InMemory => {
                info!("Using in-memory storage");
                let store: Arc<dyn SchoolStore> = Self::create_in_memory();
                Ok(store)
            }
            StorageConfig::Postgres(pg_config) => {
                let store: Arc<dyn SchoolStore> = Self::create_postgres(pg_config).await?;
                Ok(store)
            }
        }
    }

    pub fn create_in_memory() -> Arc<InMemorySchoolStore> {
        Arc::new(InMemorySchoolStore::new())
    }

    pub async fn create_postgres(
        config: &PostgresConfig,
    ) -> Result<Arc<PostgresSchoolStore>, DomainError> {
        info!(
            max_connections = config.max_connections,
            "Connecting to PostgreSQL storage"
        );

        let store = PostgresSchoolStore::connect(config).await?;
        store.migrate().await?;
        Ok(Arc::new(store))
    }
}
