//! Infrastructure services

mod aluno_service;
mod checks;
mod turma_service;

pub use aluno_service::{AlunoService, CreateAlunoRequest, TurmaRefRequest, UpdateAlunoRequest};
pub use turma_service::{CreateTurmaRequest, TurmaService, UpdateTurmaRequest};
