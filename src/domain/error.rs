use thiserror::Error;

/// Core domain errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Invalid operation: {message}")]
    InvalidOperation { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Request cancelled")]
    Cancelled,

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },
}

impl DomainError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// True for failures the caller can fix by resubmitting different input
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::InvalidOperation { .. } | Self::Validation { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let error = DomainError::not_found("Aluno 7 não encontrado");
        assert_eq!(error.to_string(), "Not found: Aluno 7 não encontrado");
    }

    #[test]
    fn test_invalid_operation_error() {
        let error = DomainError::invalid_operation("Turma Inglês 101 está lotada");
        assert_eq!(
            error.to_string(),
            "Invalid operation: Turma Inglês 101 está lotada"
        );
    }

    #[test]
    fn test_validation_error() {
        let error = DomainError::validation("CPF inválido");
        assert_eq!(error.to_string(), "Validation error: CPF inválido");
    }

    #[test]
    fn test_client_error_classification() {
        assert!(DomainError::not_found("x").is_client_error());
        assert!(DomainError::invalid_operation("x").is_client_error());
        assert!(DomainError::validation("x").is_client_error());
        assert!(!DomainError::Cancelled.is_client_error());
        assert!(!DomainError::storage("x").is_client_error());
    }
}
