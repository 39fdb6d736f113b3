//! Aluno entity and related types

use super::validation::{
    normalize_cpf, validate_cpf, validate_email, validate_idade, validate_nome,
    AlunoValidationError,
};
use crate::domain::turma::Turma;

/// Surrogate key of a student, assigned by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AlunoId(i64);

impl AlunoId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl From<i64> for AlunoId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for AlunoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A checksum-valid CPF, stored as its 11 digits
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cpf(String);

impl Cpf {
    /// Parse a masked or plain CPF, keeping only its digits
    pub fn parse(raw: &str) -> Result<Self, AlunoValidationError> {
        validate_cpf(raw)?;
        Ok(Self(normalize_cpf(raw)))
    }

    /// Wrap a value read back from the store as is
    pub(crate) fn from_stored(cpf: String) -> Self {
        Self(cpf)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Cpf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The editable fields of a student, validated and normalized
#[derive(Debug, Clone, PartialEq)]
pub struct AlunoDados {
    nome: String,
    email: String,
    cpf: Cpf,
    idade: i32,
}

impl AlunoDados {
    /// Trim and validate raw input
    pub fn new(
        nome: &str,
        email: &str,
        cpf: &str,
        idade: i32,
    ) -> Result<Self, AlunoValidationError> {
        let nome = nome.trim();
        let email = email.trim();

        validate_nome(nome)?;
        validate_email(email)?;
        validate_idade(idade)?;
        let cpf = Cpf::parse(cpf)?;

        Ok(Self {
            nome: nome.to_string(),
            email: email.to_string(),
            cpf,
            idade,
        })
    }

    pub fn nome(&self) -> &str {
        &self.nome
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn cpf(&self) -> &Cpf {
        &self.cpf
    }

    pub fn idade(&self) -> i32 {
        self.idade
    }
}

/// Student entity
#[derive(Debug, Clone, PartialEq)]
pub struct Aluno {
    id: AlunoId,
    nome: String,
    email: String,
    cpf: Cpf,
    idade: i32,
}

impl Aluno {
    pub fn new(id: AlunoId, dados: AlunoDados) -> Self {
        Self {
            id,
            nome: dados.nome,
            email: dados.email,
            cpf: dados.cpf,
            idade: dados.idade,
        }
    }

    /// Rebuild a student from stored columns without re-running input validation
    pub(crate) fn from_stored(
        id: AlunoId,
        nome: String,
        email: String,
        cpf: Cpf,
        idade: i32,
    ) -> Self {
        Self {
            id,
            nome,
            email,
            cpf,
            idade,
        }
    }

    // Getters

    pub fn id(&self) -> AlunoId {
        self.id
    }

    pub fn nome(&self) -> &str {
        &self.nome
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn cpf(&self) -> &Cpf {
        &self.cpf
    }

    pub fn idade(&self) -> i32 {
        self.idade
    }

    // Mutators

    /// Replace every editable field, keeping the id
    pub fn apply(&mut self, dados: AlunoDados) {
        self.nome = dados.nome;
        self.email = dados.email;
        self.cpf = dados.cpf;
        self.idade = dados.idade;
    }
}

/// A student together with the classes it is enrolled in
#[derive(Debug, Clone)]
pub struct AlunoDetalhe {
    pub aluno: Aluno,
    /// Sorted by (idioma, numero)
    pub turmas: Vec<Turma>,
}

impl AlunoDetalhe {
    pub fn new(aluno: Aluno, mut turmas: Vec<Turma>) -> Self {
        turmas.sort_by(Turma::cmp_by_identity);
        Self { aluno, turmas }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aluno_dados_trims_and_normalizes() {
        let dados =
            AlunoDados::new("  Maria Souza ", " maria@escola.com ", "529.982.247-25", 21)
                .unwrap();

        assert_eq!(dados.nome(), "Maria Souza");
        assert_eq!(dados.email(), "maria@escola.com");
        assert_eq!(dados.cpf().as_str(), "52998224725");
        assert_eq!(dados.idade(), 21);
    }

    #[test]
    fn test_aluno_dados_rejects_invalid_fields() {
        assert_eq!(
            AlunoDados::new("", "maria@escola.com", "52998224725", 21),
            Err(AlunoValidationError::EmptyNome)
        );
        assert_eq!(
            AlunoDados::new("Maria", "maria", "52998224725", 21),
            Err(AlunoValidationError::InvalidEmail)
        );
        assert_eq!(
            AlunoDados::new("Maria", "maria@escola.com", "12345678900", 21),
            Err(AlunoValidationError::InvalidCpf)
        );
        assert_eq!(
            AlunoDados::new("Maria", "maria@escola.com", "52998224725", -3),
            Err(AlunoValidationError::NegativeIdade)
        );
    }

    #[test]
    fn test_aluno_apply_keeps_id() {
        let dados = AlunoDados::new("Maria", "maria@escola.com", "52998224725", 21).unwrap();
        let mut aluno = Aluno::new(AlunoId::new(4), dados);

        let novos = AlunoDados::new("Maria S.", "ms@escola.com", "111.444.777-35", 22).unwrap();
        aluno.apply(novos);

        assert_eq!(aluno.id(), AlunoId::new(4));
        assert_eq!(aluno.nome(), "Maria S.");
        assert_eq!(aluno.email(), "ms@escola.com");
        assert_eq!(aluno.cpf().as_str(), "11144477735");
        assert_eq!(aluno.idade(), 22);
    }

    #[test]
    fn test_from_stored_keeps_legacy_values() {
        let aluno = Aluno::from_stored(
            AlunoId::new(9),
            "Legado".to_string(),
            "legado@escola".to_string(),
            Cpf::from_stored("12345678900".to_string()),
            30,
        );

        assert!(Cpf::parse("12345678900").is_err());
        assert_eq!(aluno.cpf().as_str(), "12345678900");
        assert_eq!(aluno.email(), "legado@escola");
    }
}
