//! Aluno domain module
//!
//! A student is identified by a surrogate id; email and CPF are unique across
//! all students. Every student must hold at least one enrollment.

mod entity;
mod validation;

pub use entity::{Aluno, AlunoDados, AlunoDetalhe, AlunoId, Cpf};
pub use validation::{
    normalize_cpf, validate_cpf, validate_email, validate_idade, validate_nome,
    AlunoValidationError,
};
