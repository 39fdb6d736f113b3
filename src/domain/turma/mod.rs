//! Turma domain module
//!
//! Classes are looked up by (idioma, numero), idioma compared case-insensitively;
//! the surrogate id is only used by the id-based endpoints.

mod entity;
mod validation;

pub use entity::{idioma_key, same_idioma, Turma, TurmaComVagas, TurmaDados, TurmaId, TurmaRef};
pub use validation::{
    validate_ano_letivo, validate_idioma, validate_numero, TurmaValidationError,
};
