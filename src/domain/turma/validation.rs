//! Turma validation

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Errors that can occur during turma validation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TurmaValidationError {
    #[error("Idioma é obrigatório")]
    EmptyIdioma,

    #[error("Idioma não pode exceder {0} caracteres")]
    IdiomaTooLong(usize),

    #[error("Número deve ser maior que zero")]
    InvalidNumero,

    #[error("Ano letivo é obrigatório")]
    EmptyAnoLetivo,

    #[error("Ano letivo não pode exceder {0} caracteres")]
    AnoLetivoTooLong(usize),

    #[error("Ano letivo inválido. Use formato 'YYYY/1' ou 'YYYY/2'")]
    InvalidAnoLetivo,
}

const MAX_IDIOMA_LENGTH: usize = 50;
const MAX_ANO_LETIVO_LENGTH: usize = 16;

static ANO_LETIVO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}/[12]$").expect("ano letivo pattern is valid"));

/// Validate a language name (already trimmed)
pub fn validate_idioma(idioma: &str) -> Result<(), TurmaValidationError> {
    if idioma.is_empty() {
        return Err(TurmaValidationError::EmptyIdioma);
    }

    if idioma.chars().count() > MAX_IDIOMA_LENGTH {
        return Err(TurmaValidationError::IdiomaTooLong(MAX_IDIOMA_LENGTH));
    }

    Ok(())
}

pub fn validate_numero(numero: i32) -> Result<(), TurmaValidationError> {
    if numero <= 0 {
        return Err(TurmaValidationError::InvalidNumero);
    }

    Ok(())
}

/// Validate an academic term such as `2025/1` (already trimmed)
pub fn validate_ano_letivo(ano_letivo: &str) -> Result<(), TurmaValidationError> {
    if ano_letivo.is_empty() {
        return Err(TurmaValidationError::EmptyAnoLetivo);
    }

    if ano_letivo.chars().count() > MAX_ANO_LETIVO_LENGTH {
        return Err(TurmaValidationError::AnoLetivoTooLong(MAX_ANO_LETIVO_LENGTH));
    }

    if !ANO_LETIVO.is_match(ano_letivo) {
        return Err(TurmaValidationError::InvalidAnoLetivo);
    }

    Ok(())
}
