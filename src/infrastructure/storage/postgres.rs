//! PostgreSQL school store with connection pooling

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, Row, Transaction};

use crate::domain::aluno::{Aluno, AlunoDados, AlunoId, Cpf};
use crate::domain::matricula::Matricula;
use crate::domain::storage::{SchoolStore, SchoolTransaction};
use crate::domain::turma::{idioma_key, Turma, TurmaComVagas, TurmaDados, TurmaId, TurmaRef};
use crate::domain::DomainError;

use super::migrations::run_school_migrations;

/// PostgreSQL storage configuration
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of connections to maintain
    pub min_connections: u32,
    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
    /// Idle timeout in seconds
    pub idle_timeout_secs: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/language_courses".to_string(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout_secs: 30,
            idle_timeout_secs: 600,
        }
    }
}

impl PostgresConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn with_min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn with_connect_timeout(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = secs;
        self
    }

    pub fn with_idle_timeout(mut self, secs: u64) -> Self {
        self.idle_timeout_secs = secs;
        self
    }
}

/// PostgreSQL implementation of [`SchoolStore`]
#[derive(Debug, Clone)]
pub struct PostgresSchoolStore {
    pool: PgPool,
}

impl PostgresSchoolStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a connection pool using the given configuration
    pub async fn connect(config: &PostgresConfig) -> Result<Self, DomainError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(std::time::Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(std::time::Duration::from_secs(config.idle_timeout_secs))
            .connect(&config.url)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to connect to PostgreSQL: {}", e)))?;

        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply pending schema migrations
    pub async fn migrate(&self) -> Result<(), DomainError> {
        run_school_migrations(&self.pool).await
    }
}

#[async_trait]
impl SchoolStore for PostgresSchoolStore {
    async fn begin(&self) -> Result<Box<dyn SchoolTransaction>, DomainError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to begin transaction: {}", e)))?;

        Ok(Box::new(PostgresTransaction { tx }))
    }

    async fn ping(&self) -> Result<(), DomainError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Database unreachable: {}", e)))?;

        Ok(())
    }
}

struct PostgresTransaction {
    tx: Transaction<'static, Postgres>,
}

const ALUNO_COLUMNS: &str = "a.id, a.nome, a.email, a.cpf, a.idade";
const TURMA_COLUMNS: &str = "t.id, t.idioma, t.numero, t.ano_letivo";

#[async_trait]
impl SchoolTransaction for PostgresTransaction {
    async fn get_aluno(&mut self, id: AlunoId) -> Result<Option<Aluno>, DomainError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM alunos a WHERE a.id = $1",
            ALUNO_COLUMNS
        ))
        .bind(id.value())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| read_error("get aluno", e))?;

        row.as_ref().map(row_to_aluno).transpose()
    }

    async fn list_alunos(&mut self) -> Result<Vec<Aluno>, DomainError> {
        let rows = sqlx::query(&format!("SELECT {} FROM alunos a", ALUNO_COLUMNS))
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| read_error("list alunos", e))?;

        rows.iter().map(row_to_aluno).collect()
    }

    async fn email_in_use(
        &mut self,
        email: &str,
        except: Option<AlunoId>,
    ) -> Result<bool, DomainError> {
        sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM alunos
                WHERE email = $1 AND ($2::BIGINT IS NULL OR id <> $2)
            )
            "#,
        )
        .bind(email)
        .bind(except.map(|id| id.value()))
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| read_error("check email", e))
    }

    async fn cpf_in_use(&mut self, cpf: &Cpf, except: Option<AlunoId>) -> Result<bool, DomainError> {
        sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM alunos
                WHERE cpf = $1 AND ($2::BIGINT IS NULL OR id <> $2)
            )
            "#,
        )
        .bind(cpf.as_str())
        .bind(except.map(|id| id.value()))
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| read_error("check cpf", e))
    }

    async fn insert_aluno(&mut self, dados: &AlunoDados) -> Result<Aluno, DomainError> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO alunos (nome, email, cpf, idade)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(dados.nome())
        .bind(dados.email())
        .bind(dados.cpf().as_str())
        .bind(dados.idade())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| write_error("create aluno", e))?;

        Ok(Aluno::new(AlunoId::new(id), dados.clone()))
    }

    async fn update_aluno(&mut self, aluno: &Aluno) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE alunos
            SET nome = $2, email = $3, cpf = $4, idade = $5
            WHERE id = $1
            "#,
        )
        .bind(aluno.id().value())
        .bind(aluno.nome())
        .bind(aluno.email())
        .bind(aluno.cpf().as_str())
        .bind(aluno.idade())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| write_error("update aluno", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!(
                "Aluno {} não encontrado",
                aluno.id()
            )));
        }

        Ok(())
    }

    async fn delete_aluno(&mut self, id: AlunoId) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM alunos WHERE id = $1")
            .bind(id.value())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| write_error("delete aluno", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_turma(&mut self, id: TurmaId) -> Result<Option<Turma>, DomainError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM turmas t WHERE t.id = $1",
            TURMA_COLUMNS
        ))
        .bind(id.value())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| read_error("get turma", e))?;

        row.as_ref().map(row_to_turma).transpose()
    }

    async fn find_turma(&mut self, turma_ref: &TurmaRef) -> Result<Option<Turma>, DomainError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM turmas t WHERE t.numero = $1 AND t.idioma_key = $2",
            TURMA_COLUMNS
        ))
        .bind(turma_ref.numero())
        .bind(idioma_key(turma_ref.idioma()))
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| read_error("find turma", e))?;

        row.as_ref().map(row_to_turma).transpose()
    }

    async fn turma_identity_in_use(
        &mut self,
        turma_ref: &TurmaRef,
        except: Option<TurmaId>,
    ) -> Result<bool, DomainError> {
        sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM turmas
                WHERE numero = $1 AND idioma_key = $2
                  AND ($3::BIGINT IS NULL OR id <> $3)
            )
            "#,
        )
        .bind(turma_ref.numero())
        .bind(idioma_key(turma_ref.idioma()))
        .bind(except.map(|id| id.value()))
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| read_error("check turma identity", e))
    }

    async fn list_turmas(
        &mut self,
        idioma: Option<&str>,
    ) -> Result<Vec<TurmaComVagas>, DomainError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}, COUNT(m.aluno_id) AS matriculas
            FROM turmas t
            LEFT JOIN matriculas m ON m.turma_id = t.id
            WHERE ($1::TEXT IS NULL OR t.idioma_key = $1)
            GROUP BY t.id
            "#,
            TURMA_COLUMNS
        ))
        .bind(idioma.map(idioma_key))
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| read_error("list turmas", e))?;

        rows.iter()
            .map(|row| {
                let turma = row_to_turma(row)?;
                let matriculas: i64 = row
                    .try_get("matriculas")
                    .map_err(|e| read_error("decode turma", e))?;

                Ok(TurmaComVagas::new(turma, matriculas as usize))
            })
            .collect()
    }

    async fn insert_turma(&mut self, dados: &TurmaDados) -> Result<Turma, DomainError> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO turmas (idioma, idioma_key, numero, ano_letivo)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(dados.idioma())
        .bind(idioma_key(dados.idioma()))
        .bind(dados.numero())
        .bind(dados.ano_letivo())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| write_error("create turma", e))?;

        Ok(Turma::new(TurmaId::new(id), dados.clone()))
    }

    async fn update_turma(&mut self, turma: &Turma) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE turmas
            SET idioma = $2, idioma_key = $3, numero = $4, ano_letivo = $5
            WHERE id = $1
            "#,
        )
        .bind(turma.id().value())
        .bind(turma.idioma())
        .bind(turma.idioma_key())
        .bind(turma.numero())
        .bind(turma.ano_letivo())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| write_error("update turma", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!(
                "Turma {} não encontrada",
                turma.id()
            )));
        }

        Ok(())
    }

    async fn delete_turma(&mut self, id: TurmaId) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM turmas WHERE id = $1")
            .bind(id.value())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| write_error("delete turma", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn matriculas_do_aluno(&mut self, id: AlunoId) -> Result<Vec<Matricula>, DomainError> {
        let rows = sqlx::query(
            "SELECT aluno_id, turma_id, data_matricula FROM matriculas WHERE aluno_id = $1",
        )
        .bind(id.value())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| read_error("list matriculas", e))?;

        rows.iter().map(row_to_matricula).collect()
    }

    async fn turmas_do_aluno(&mut self, id: AlunoId) -> Result<Vec<Turma>, DomainError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM turmas t
            JOIN matriculas m ON m.turma_id = t.id
            WHERE m.aluno_id = $1
            "#,
            TURMA_COLUMNS
        ))
        .bind(id.value())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| read_error("list turmas do aluno", e))?;

        rows.iter().map(row_to_turma).collect()
    }

    async fn alunos_da_turma(&mut self, id: TurmaId) -> Result<Vec<Aluno>, DomainError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM alunos a
            JOIN matriculas m ON m.aluno_id = a.id
            WHERE m.turma_id = $1
            "#,
            ALUNO_COLUMNS
        ))
        .bind(id.value())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| read_error("list alunos da turma", e))?;

        rows.iter().map(row_to_aluno).collect()
    }

    async fn count_matriculas(&mut self, turma_id: TurmaId) -> Result<usize, DomainError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM matriculas WHERE turma_id = $1")
            .bind(turma_id.value())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| read_error("count matriculas", e))?;

        Ok(count as usize)
    }

    async fn insert_matricula(&mut self, matricula: &Matricula) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO matriculas (aluno_id, turma_id, data_matricula)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(matricula.aluno_id().value())
        .bind(matricula.turma_id().value())
        .bind(matricula.data_matricula())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| write_error("create matricula", e))?;

        Ok(())
    }

    async fn delete_matricula(
        &mut self,
        aluno_id: AlunoId,
        turma_id: TurmaId,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM matriculas WHERE aluno_id = $1 AND turma_id = $2")
            .bind(aluno_id.value())
            .bind(turma_id.value())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| write_error("delete matricula", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        let PostgresTransaction { tx } = *self;

        tx.commit()
            .await
            .map_err(|e| write_error("commit transaction", e))
    }
}

fn read_error(action: &str, e: sqlx::Error) -> DomainError {
    DomainError::storage(format!("Failed to {}: {}", action, e))
}

/// Constraint violations become business errors; everything else is a storage failure
fn write_error(action: &str, e: sqlx::Error) -> DomainError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return DomainError::invalid_operation(unique_violation_message(db.constraint()));
        }

        if db.is_foreign_key_violation() {
            return DomainError::invalid_operation(foreign_key_violation_message(db.constraint()));
        }
    }

    read_error(action, e)
}

fn unique_violation_message(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some("uq_alunos_email") => "E-mail já cadastrado",
        Some("uq_alunos_cpf") => "CPF já cadastrado",
        Some("uq_turmas_numero_idioma") => "Já existe uma turma com esse idioma e número",
        Some("pk_matriculas") => "Aluno já está matriculado nessa turma",
        _ => "Registro duplicado",
    }
}

fn foreign_key_violation_message(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some("fk_matriculas_aluno") => "Aluno possui matrículas ou não existe",
        Some("fk_matriculas_turma") => "Turma possui alunos ou não existe",
        _ => "Registro referenciado por outra tabela",
    }
}

fn row_to_aluno(row: &PgRow) -> Result<Aluno, DomainError> {
    let id: i64 = row.try_get("id").map_err(|e| read_error("decode aluno", e))?;
    let nome: String = row.try_get("nome").map_err(|e| read_error("decode aluno", e))?;
    let email: String = row.try_get("email").map_err(|e| read_error("decode aluno", e))?;
    let cpf: String = row.try_get("cpf").map_err(|e| read_error("decode aluno", e))?;
    let idade: i32 = row.try_get("idade").map_err(|e| read_error("decode aluno", e))?;

    Ok(Aluno::from_stored(
        AlunoId::new(id),
        nome,
        email,
        Cpf::from_stored(cpf),
        idade,
    ))
}

fn row_to_turma(row: &PgRow) -> Result<Turma, DomainError> {
    let id: i64 = row.try_get("id").map_err(|e| read_error("decode turma", e))?;
    let idioma: String = row.try_get("idioma").map_err(|e| read_error("decode turma", e))?;
    let numero: i32 = row.try_get("numero").map_err(|e| read_error("decode turma", e))?;
    let ano_letivo: String = row
        .try_get("ano_letivo")
        .map_err(|e| read_error("decode turma", e))?;

    Ok(Turma::from_stored(TurmaId::new(id), idioma, numero, ano_letivo))
}

fn row_to_matricula(row: &PgRow) -> Result<Matricula, DomainError> {
    let aluno_id: i64 = row
        .try_get("aluno_id")
        .map_err(|e| read_error("decode matricula", e))?;
    let turma_id: i64 = row
        .try_get("turma_id")
        .map_err(|e| read_error("decode matricula", e))?;
    let data_matricula: chrono::DateTime<chrono::Utc> = row
        .try_get("data_matricula")
        .map_err(|e| read_error("decode matricula", e))?;

    Ok(Matricula::with_date(
        AlunoId::new(aluno_id),
        TurmaId::new(turma_id),
        data_matricula,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postgres_config_builder() {
        let config = PostgresConfig::new("postgres://db/escola")
            .with_max_connections(20)
            .with_min_connections(2)
            .with_connect_timeout(5)
            .with_idle_timeout(60);

        assert_eq!(config.url, "postgres://db/escola");
        assert_eq!(config.max_connections, 20);
        assert_eq!(config.min_connections, 2);
        assert_eq!(config.connect_timeout_secs, 5);
        assert_eq!(config.idle_timeout_secs, 60);
    }

    #[test]
    fn test_unique_violation_messages() {
        assert_eq!(
            unique_violation_message(Some("uq_alunos_email")),
            "E-mail já cadastrado"
        );
        assert_eq!(unique_violation_message(Some("uq_alunos_cpf")), "CPF já cadastrado");
        assert_eq!(unique_violation_message(None), "Registro duplicado");
    }

    #[test]
    fn test_non_database_errors_are_storage_errors() {
        let err = write_error("create aluno", sqlx::Error::RowNotFound);
        assert!(matches!(err, DomainError::Storage { .. }));
    }
}
