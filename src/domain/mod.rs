//! Domain layer - Core business logic and entities

pub mod aluno;
pub mod collation;
pub mod error;
pub mod matricula;
pub mod storage;
pub mod turma;

pub use aluno::{Aluno, AlunoDados, AlunoDetalhe, AlunoId, AlunoValidationError, Cpf};
pub use collation::compare_text;
pub use error::DomainError;
pub use matricula::{validate_turma_refs, Matricula, MatriculaValidationError, CAPACIDADE_TURMA};
pub use storage::{SchoolStore, SchoolTransaction};
pub use turma::{Turma, TurmaComVagas, TurmaDados, TurmaId, TurmaRef, TurmaValidationError};
