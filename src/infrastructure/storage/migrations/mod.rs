//! Schema migrations for the school tables

use async_trait::async_trait;
use sqlx::Executor;
use sqlx::postgres::PgPool;
use tracing::info;

use crate::domain::DomainError;

/// Trait for running database migrations
#[async_trait]
pub trait Migrator: Send + Sync {
    /// Runs all pending migrations
    async fn run(&self) -> Result<(), DomainError>;

    /// Reverts the last applied migration
    async fn revert(&self) -> Result<(), DomainError>;

    /// Returns the current migration version
    async fn version(&self) -> Result<Option<i64>, DomainError>;
}

/// Applies [`school_migrations`] against a PostgreSQL pool
///
/// Each migration runs in its own transaction together with its bookkeeping row,
/// so a failed migration leaves no partial schema behind.
#[derive(Debug)]
pub struct PostgresMigrator {
    pool: PgPool,
    migrations: Vec<Migration>,
}

impl PostgresMigrator {
    pub fn new(pool: PgPool) -> Self {
        Self::with_migrations(pool, school_migrations())
    }

    pub fn with_migrations(pool: PgPool, migrations: Vec<Migration>) -> Self {
        Self { pool, migrations }
    }

    async fn ensure_migrations_table(&self) -> Result<(), DomainError> {
        sqlx::raw_sql(
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version BIGINT PRIMARY KEY,
                description TEXT NOT NULL,
                installed_on TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to create migrations table: {}", e)))?;

        Ok(())
    }

    async fn is_applied(&self, version: i64) -> Result<bool, DomainError> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM _migrations WHERE version = $1)")
            .bind(version)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to check migration status: {}", e)))
    }

    /// Applies a single migration unless it is already recorded
    pub async fn run_migration(&self, migration: &Migration) -> Result<bool, DomainError> {
        self.ensure_migrations_table().await?;

        if self.is_applied(migration.version).await? {
            return Ok(false);
        }

        let mut tx = self.pool.begin().await.map_err(|e| {
            DomainError::storage(format!("Failed to begin migration {}: {}", migration.version, e))
        })?;

        (&mut *tx)
            .execute(sqlx::raw_sql(&migration.up))
            .await
            .map_err(|e| {
                DomainError::storage(format!(
                    "Failed to run migration {}: {}",
                    migration.version, e
                ))
            })?;

        sqlx::query("INSERT INTO _migrations (version, description) VALUES ($1, $2)")
            .bind(migration.version)
            .bind(&migration.description)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                DomainError::storage(format!(
                    "Failed to record migration {}: {}",
                    migration.version, e
                ))
            })?;

        tx.commit().await.map_err(|e| {
            DomainError::storage(format!("Failed to commit migration {}: {}", migration.version, e))
        })?;

        info!(version = migration.version, description = %migration.description, "Applied migration");
        Ok(true)
    }

    /// Reverts a single migration if it is recorded
    pub async fn revert_migration(&self, migration: &Migration) -> Result<bool, DomainError> {
        self.ensure_migrations_table().await?;

        if !self.is_applied(migration.version).await? {
            return Ok(false);
        }

        let mut tx = self.pool.begin().await.map_err(|e| {
            DomainError::storage(format!("Failed to begin revert {}: {}", migration.version, e))
        })?;

        (&mut *tx)
            .execute(sqlx::raw_sql(&migration.down))
            .await
            .map_err(|e| {
                DomainError::storage(format!(
                    "Failed to revert migration {}: {}",
                    migration.version, e
                ))
            })?;

        sqlx::query("DELETE FROM _migrations WHERE version = $1")
            .bind(migration.version)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                DomainError::storage(format!(
                    "Failed to remove migration record {}: {}",
                    migration.version, e
                ))
            })?;

        tx.commit().await.map_err(|e| {
            DomainError::storage(format!("Failed to commit revert {}: {}", migration.version, e))
        })?;

        info!(version = migration.version, "Reverted migration");
        Ok(true)
    }

    /// Returns all applied migration versions
    pub async fn applied_versions(&self) -> Result<Vec<i64>, DomainError> {
        self.ensure_migrations_table().await?;

        sqlx::query_scalar("SELECT version FROM _migrations ORDER BY version")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to get applied migrations: {}", e)))
    }
}

#[async_trait]
impl Migrator for PostgresMigrator {
    async fn run(&self) -> Result<(), DomainError> {
        for migration in &self.migrations {
            self.run_migration(migration).await?;
        }

        Ok(())
    }

    async fn revert(&self) -> Result<(), DomainError> {
        let Some(current) = self.version().await? else {
            return Ok(());
        };

        match self.migrations.iter().find(|m| m.version == current) {
            Some(migration) => {
                self.revert_migration(migration).await?;
                Ok(())
            }
            None => Err(DomainError::storage(format!(
                "Applied migration {} is unknown to this build",
                current
            ))),
        }
    }

    async fn version(&self) -> Result<Option<i64>, DomainError> {
        self.ensure_migrations_table().await?;

        sqlx::query_scalar("SELECT MAX(version) FROM _migrations")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to get migration version: {}", e)))
    }
}

/// A versioned schema change with its inverse
#[derive(Debug, Clone)]
pub struct Migration {
    pub version: i64,
    pub description: String,
    /// SQL to run when applying the migration
    pub up: String,
    /// SQL to run when reverting the migration
    pub down: String,
}

impl Migration {
    pub fn new(
        version: i64,
        description: impl Into<String>,
        up: impl Into<String>,
        down: impl Into<String>,
    ) -> Self {
        Self {
            version,
            description: description.into(),
            up: up.into(),
            down: down.into(),
        }
    }
}

/// Schema for turmas, alunos and matriculas
pub fn school_migrations() -> Vec<Migration> {
    vec![
        Migration::new(
            1,
            "Create turmas table",
            r#"
            CREATE TABLE IF NOT EXISTS turmas (
                id BIGSERIAL PRIMARY KEY,
                idioma VARCHAR(50) NOT NULL,
                -- case-folded by the application, independent of the database locale
                idioma_key TEXT NOT NULL,
                numero INTEGER NOT NULL CHECK (numero > 0),
                ano_letivo VARCHAR(16) NOT NULL,
                CONSTRAINT uq_turmas_numero_idioma UNIQUE (numero, idioma_key)
            );
            "#,
            r#"
            DROP TABLE IF EXISTS turmas;
            "#,
        ),
        Migration::new(
            2,
            "Create alunos table",
            r#"
            CREATE TABLE IF NOT EXISTS alunos (
                id BIGSERIAL PRIMARY KEY,
                nome VARCHAR(150) NOT NULL,
                email VARCHAR(200) NOT NULL,
                cpf VARCHAR(11) NOT NULL,
                idade INTEGER NOT NULL CHECK (idade >= 0),
                CONSTRAINT uq_alunos_email UNIQUE (email),
                CONSTRAINT uq_alunos_cpf UNIQUE (cpf)
            );
            "#,
            r#"
            DROP TABLE IF EXISTS alunos;
            "#,
        ),
        Migration::new(
            3,
            "Create matriculas table",
            r#"
            CREATE TABLE IF NOT EXISTS matriculas (
                aluno_id BIGINT NOT NULL,
                turma_id BIGINT NOT NULL,
                data_matricula TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                CONSTRAINT pk_matriculas PRIMARY KEY (aluno_id, turma_id),
                CONSTRAINT fk_matriculas_aluno FOREIGN KEY (aluno_id)
                    REFERENCES alunos (id) ON DELETE RESTRICT,
                CONSTRAINT fk_matriculas_turma FOREIGN KEY (turma_id)
                    REFERENCES turmas (id) ON DELETE RESTRICT
            );
            CREATE INDEX IF NOT EXISTS idx_matriculas_turma_id ON matriculas (turma_id);
            "#,
            r#"
            DROP TABLE IF EXISTS matriculas;
            "#,
        ),
    ]
}

/// Runs all pending school migrations
pub async fn run_school_migrations(pool: &PgPool) -> Result<(), DomainError> {
    PostgresMigrator::new(pool.clone()).run().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_creation() {
        let migration = Migration::new(1, "Test migration", "CREATE TABLE test", "DROP TABLE test");

        assert_eq!(migration.version, 1);
        assert_eq!(migration.description, "Test migration");
        assert_eq!(migration.up, "CREATE TABLE test");
        assert_eq!(migration.down, "DROP TABLE test");
    }

    #[test]
    fn test_school_migrations_order() {
        let migrations = school_migrations();

        assert_eq!(migrations.len(), 3);

        for pair in migrations.windows(2) {
            assert!(
                pair[1].version > pair[0].version,
                "Migrations should be in ascending order"
            );
        }
    }

    #[test]
    fn test_matriculas_created_after_parents() {
        let migrations = school_migrations();
        let position = |table: &str| {
            migrations
                .iter()
                .position(|m| m.up.contains(&format!("CREATE TABLE IF NOT EXISTS {} ", table)))
        };

        let turmas = position("turmas").unwrap();
        let alunos = position("alunos").unwrap();
        let matriculas = position("matriculas").unwrap();

        assert!(matriculas > turmas);
        assert!(matriculas > alunos);
    }

    #[test]
    fn test_constraint_names_match_error_mapping() {
        let sql: String = school_migrations().into_iter().map(|m| m.up).collect();

        for name in [
            "uq_turmas_numero_idioma",
            "uq_alunos_email",
            "uq_alunos_cpf",
            "pk_matriculas",
            "fk_matriculas_aluno",
            "fk_matriculas_turma",
        ] {
            assert!(sql.contains(name), "missing constraint {}", name);
        }
        assert!(sql.contains("ON DELETE RESTRICT"));
    }

    #[test]
    fn test_turma_identity_uses_folded_key() {
        let turmas = &school_migrations()[0];

        assert!(turmas.up.contains("idioma_key TEXT NOT NULL"));
        assert!(turmas.up.contains("UNIQUE (numero, idioma_key)"));
        assert!(!turmas.up.contains("lower("));
    }

    #[test]
    fn test_school_migrations_content() {
        for migration in school_migrations() {
            assert!(!migration.description.is_empty());
            assert!(!migration.up.trim().is_empty());
            assert!(!migration.down.trim().is_empty());
        }
    }
}
