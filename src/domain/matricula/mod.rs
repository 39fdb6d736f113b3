//! Matricula domain module
//!
//! An enrollment is the join record between one student and one class. Its
//! existence is the only source of truth for "is enrolled".

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::aluno::AlunoId;
use crate::domain::turma::{TurmaId, TurmaRef};

/// Maximum number of students a class can hold
pub const CAPACIDADE_TURMA: usize = 5;

/// Enrollment of a student in a class, keyed by (aluno_id, turma_id)
#[derive(Debug, Clone, PartialEq)]
pub struct Matricula {
    aluno_id: AlunoId,
    turma_id: TurmaId,
    data_matricula: DateTime<Utc>,
}

impl Matricula {
    /// Enrollment stamped with the current time
    pub fn new(aluno_id: AlunoId, turma_id: TurmaId) -> Self {
        Self::with_date(aluno_id, turma_id, Utc::now())
    }

    pub fn with_date(aluno_id: AlunoId, turma_id: TurmaId, data_matricula: DateTime<Utc>) -> Self {
        Self {
            aluno_id,
            turma_id,
            data_matricula,
        }
    }

    pub fn aluno_id(&self) -> AlunoId {
        self.aluno_id
    }

    pub fn turma_id(&self) -> TurmaId {
        self.turma_id
    }

    pub fn data_matricula(&self) -> DateTime<Utc> {
        self.data_matricula
    }

    pub fn key(&self) -> (AlunoId, TurmaId) {
        (self.aluno_id, self.turma_id)
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MatriculaValidationError {
    #[error("Aluno deve estar matriculado em pelo menos 1 turma")]
    NoTurmas,

    #[error("Não repita a mesma turma (Idioma+Número): {0}")]
    DuplicateTurma(String),
}

/// A student's requested class list must be non-empty and free of repeats
pub fn validate_turma_refs(refs: &[TurmaRef]) -> Result<(), MatriculaValidationError> {
    if refs.is_empty() {
        return Err(MatriculaValidationError::NoTurmas);
    }

    let mut seen = HashSet::new();

    for turma_ref in refs {
        if !seen.insert(turma_ref.key()) {
            return Err(MatriculaValidationError::DuplicateTurma(turma_ref.to_string()));
        }
    }

    Ok(())
}
