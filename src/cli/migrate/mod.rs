//! Migrate command - applies, reverts or lists PostgreSQL migrations

use clap::Args;
use tracing::info;

use crate::config::AppConfig;
use crate::infrastructure::logging;
use crate::infrastructure::storage::{Migrator, PostgresMigrator, PostgresSchoolStore};

#[derive(Args, Debug, Default)]
pub struct MigrateArgs {
    /// Connection string; defaults to storage.database_url or DATABASE_URL
    #[arg(long)]
    pub database_url: Option<String>,

    /// Revert the most recent migration instead of applying pending ones
    #[arg(long, conflicts_with = "status")]
    pub revert: bool,

    /// Print applied migration versions without changing anything
    #[arg(long)]
    pub status: bool,
}

pub async fn run(args: MigrateArgs) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    logging::init_logging(&config.logging)?;

    let pg_config = config.storage.postgres_config(args.database_url)?;
    let store = PostgresSchoolStore::connect(&pg_config).await?;
    let migrator = PostgresMigrator::new(store.pool().clone());

    if args.status {
        let applied = migrator.applied_versions().await?;
        if applied.is_empty() {
            println!("No migrations applied");
        }
        for version in applied {
            println!("{}", version);
        }
        return Ok(());
    }

    if args.revert {
        migrator.revert().await?;
    } else {
        migrator.run().await?;
    }

    info!(version = ?migrator.version().await?, "Schema is up to date");

    Ok(())
}
