//! Aluno validation

use thiserror::Error;
use validator::ValidateEmail;

/// Errors that can occur during aluno validation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AlunoValidationError {
    #[error("Nome é obrigatório")]
    EmptyNome,

    #[error("Nome não pode exceder {0} caracteres")]
    NomeTooLong(usize),

    #[error("Email é obrigatório")]
    EmptyEmail,

    #[error("Email não pode exceder {0} caracteres")]
    EmailTooLong(usize),

    #[error("Email inválido")]
    InvalidEmail,

    #[error("CPF é obrigatório")]
    EmptyCpf,

    #[error("CPF inválido")]
    InvalidCpf,

    #[error("Idade não pode ser negativa")]
    NegativeIdade,
}

const MAX_NOME_LENGTH: usize = 150;
const MAX_EMAIL_LENGTH: usize = 200;
const CPF_LENGTH: usize = 11;

/// Validate a student name (already trimmed)
pub fn validate_nome(nome: &str) -> Result<(), AlunoValidationError> {
    if nome.is_empty() {
        return Err(AlunoValidationError::EmptyNome);
    }

    if nome.chars().count() > MAX_NOME_LENGTH {
        return Err(AlunoValidationError::NomeTooLong(MAX_NOME_LENGTH));
    }

    Ok(())
}

/// Validate an email address (already trimmed)
pub fn validate_email(email: &str) -> Result<(), AlunoValidationError> {
    if email.is_empty() {
        return Err(AlunoValidationError::EmptyEmail);
    }

    if email.chars().count() > MAX_EMAIL_LENGTH {
        return Err(AlunoValidationError::EmailTooLong(MAX_EMAIL_LENGTH));
    }

    if !email.validate_email() {
        return Err(AlunoValidationError::InvalidEmail);
    }

    Ok(())
}

pub fn validate_idade(idade: i32) -> Result<(), AlunoValidationError> {
    if idade < 0 {
        return Err(AlunoValidationError::NegativeIdade);
    }

    Ok(())
}

/// Strip everything but ASCII digits, so masked and plain input compare equal
pub fn normalize_cpf(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Validate a CPF, masked (`529.982.247-25`) or plain (`52998224725`)
pub fn validate_cpf(raw: &str) -> Result<(), AlunoValidationError> {
    if raw.trim().is_empty() {
        return Err(AlunoValidationError::EmptyCpf);
    }

    let digits: Vec<u32> = normalize_cpf(raw)
        .chars()
        .filter_map(|c| c.to_digit(10))
        .collect();

    if digits.len() != CPF_LENGTH {
        return Err(AlunoValidationError::InvalidCpf);
    }

    // Sequences like 111.111.111-11 pass the checksum but are not issued
    if digits.iter().all(|d| *d == digits[0]) {
        return Err(AlunoValidationError::InvalidCpf);
    }

    let first = check_digit(&digits[..9]);
    let second = check_digit(&digits[..10]);

    if digits[9] != first || digits[10] != second {
        return Err(AlunoValidationError::InvalidCpf);
    }

    Ok(())
}

/// Mod-11 check digit over `digits`, weights counting down to 2
fn check_digit(digits: &[u32]) -> u32 {
    let top_weight = digits.len() as u32 + 1;
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, d)| d * (top_weight - i as u32))
        .sum();

    let remainder = sum % 11;

    if remainder < 2 { 0 } else { 11 - remainder }
}
