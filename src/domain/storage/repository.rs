//! School store traits
//!
//! Every request runs inside one [`SchoolTransaction`]. Dropping a transaction
//! without calling [`SchoolTransaction::commit`] discards all of its writes.

use async_trait::async_trait;

use crate::domain::aluno::{Aluno, AlunoDados, AlunoId, Cpf};
use crate::domain::matricula::Matricula;
use crate::domain::turma::{Turma, TurmaComVagas, TurmaDados, TurmaId, TurmaRef};
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Handle to the relational store shared by all requests
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SchoolStore: Send + Sync {
    /// Open a new transaction
    async fn begin(&self) -> Result<Box<dyn SchoolTransaction>, DomainError>;

    /// Check that the store is reachable
    async fn ping(&self) -> Result<(), DomainError>;
}

/// Unit of work over the alunos, turmas and matriculas tables
///
/// Writes enforce the store-level constraints: unique email, unique cpf,
/// unique (numero, idioma) ignoring case, unique (aluno_id, turma_id), and
/// restrict-on-delete for parents still referenced by a matricula. Violations
/// surface as [`DomainError::InvalidOperation`].
#[async_trait]
pub trait SchoolTransaction: Send {
    // Alunos

    async fn get_aluno(&mut self, id: AlunoId) -> Result<Option<Aluno>, DomainError>;

    /// All students, in no particular order
    async fn list_alunos(&mut self) -> Result<Vec<Aluno>, DomainError>;

    /// Whether another student (not `except`) already uses this email (exact match)
    async fn email_in_use(
        &mut self,
        email: &str,
        except: Option<AlunoId>,
    ) -> Result<bool, DomainError>;

    /// Whether another student (not `except`) already uses this cpf
    async fn cpf_in_use(&mut self, cpf: &Cpf, except: Option<AlunoId>) -> Result<bool, DomainError>;

    async fn insert_aluno(&mut self, dados: &AlunoDados) -> Result<Aluno, DomainError>;

    async fn update_aluno(&mut self, aluno: &Aluno) -> Result<(), DomainError>;

    /// Returns false when the student did not exist
    async fn delete_aluno(&mut self, id: AlunoId) -> Result<bool, DomainError>;

    // Turmas

    async fn get_turma(&mut self, id: TurmaId) -> Result<Option<Turma>, DomainError>;

    /// Resolve a class by (idioma ignoring case, numero)
    async fn find_turma(&mut self, turma_ref: &TurmaRef) -> Result<Option<Turma>, DomainError>;

    /// Whether a class other than `except` already has this identity
    async fn turma_identity_in_use(
        &mut self,
        turma_ref: &TurmaRef,
        except: Option<TurmaId>,
    ) -> Result<bool, DomainError>;

    /// Classes with their enrollment counts, optionally limited to one idioma (ignoring case)
    async fn list_turmas(&mut self, idioma: Option<&str>)
    -> Result<Vec<TurmaComVagas>, DomainError>;

    async fn insert_turma(&mut self, dados: &TurmaDados) -> Result<Turma, DomainError>;

    async fn update_turma(&mut self, turma: &Turma) -> Result<(), DomainError>;

    /// Returns false when the class did not exist
    async fn delete_turma(&mut self, id: TurmaId) -> Result<bool, DomainError>;

    // Matriculas

    async fn matriculas_do_aluno(&mut self, id: AlunoId) -> Result<Vec<Matricula>, DomainError>;

    /// Classes the student is enrolled in, in no particular order
    async fn turmas_do_aluno(&mut self, id: AlunoId) -> Result<Vec<Turma>, DomainError>;

    /// Students enrolled in the class, in no particular order
    async fn alunos_da_turma(&mut self, id: TurmaId) -> Result<Vec<Aluno>, DomainError>;

    async fn count_matriculas(&mut self, turma_id: TurmaId) -> Result<usize, DomainError>;

    async fn insert_matricula(&mut self, matricula: &Matricula) -> Result<(), DomainError>;

    /// Returns false when no such enrollment existed
    async fn delete_matricula(
        &mut self,
        aluno_id: AlunoId,
        turma_id: TurmaId,
    ) -> Result<bool, DomainError>;

    /// Make every write of this transaction visible atomically
    async fn commit(self: Box<Self>) -> Result<(), DomainError>;
}
