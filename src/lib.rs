//! Language course enrollment service
//!
//! Students (alunos) enroll in language classes (turmas) with a fixed number
//! of seats. Storage is either in-memory or PostgreSQL.

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use tokio_util::sync::CancellationToken;
use tracing::info;

use api::state::AppState;
use infrastructure::storage::StorageFactory;

/// Create the application state with default configuration
pub async fn create_app_state(shutdown: CancellationToken) -> anyhow::Result<AppState> {
    create_app_state_with_config(&AppConfig::default(), shutdown).await
}

/// Create the application state with custom configuration
///
/// Connects to and migrates PostgreSQL when that backend is selected.
pub async fn create_app_state_with_config(
    config: &AppConfig,
    shutdown: CancellationToken,
) -> anyhow::Result<AppState> {
    let storage = config.storage.resolve()?;
    info!("Storage backend: {:?}", storage.storage_type());

    let store = StorageFactory::create(&storage).await?;

    Ok(AppState::new(store, shutdown))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_state_uses_memory_store() {
        let state = create_app_state(CancellationToken::new()).await.unwrap();

        assert!(state.store.ping().await.is_ok());
        assert!(!state.shutdown.is_cancelled());
    }
}
