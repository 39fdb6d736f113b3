//! Storage infrastructure - school store implementations

mod factory;
mod in_memory;
pub mod migrations;
mod postgres;

pub use factory::{StorageConfig, StorageFactory, StorageType};
pub use in_memory::InMemorySchoolStore;
pub use migrations::{run_school_migrations, Migration, Migrator, PostgresMigrator};
pub use postgres::{PostgresConfig, PostgresSchoolStore};
