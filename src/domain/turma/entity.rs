//! Turma entity and related types

use std::cmp::Ordering;

use super::validation::{
    validate_ano_letivo, validate_idioma, validate_numero, TurmaValidationError,
};
use crate::domain::collation::compare_text;
use crate::domain::matricula::CAPACIDADE_TURMA;

/// Surrogate key of a class, assigned by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TurmaId(i64);

impl TurmaId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl From<i64> for TurmaId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for TurmaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Case-folded language name; the stored and indexed form of class identity
pub fn idioma_key(idioma: &str) -> String {
    idioma.trim().to_lowercase()
}

/// Compare two language names the way class identity does (case-insensitive)
pub fn same_idioma(a: &str, b: &str) -> bool {
    idioma_key(a) == idioma_key(b)
}

/// Lookup identity of a class: (idioma, numero), idioma case-insensitive
#[derive(Debug, Clone)]
pub struct TurmaRef {
    idioma: String,
    numero: i32,
}

impl TurmaRef {
    pub fn new(idioma: &str, numero: i32) -> Result<Self, TurmaValidationError> {
        let idioma = idioma.trim();
        validate_idioma(idioma)?;
        validate_numero(numero)?;

        Ok(Self {
            idioma: idioma.to_string(),
            numero,
        })
    }

    pub fn idioma(&self) -> &str {
        &self.idioma
    }

    pub fn numero(&self) -> i32 {
        self.numero
    }

    /// Normalized form used to detect repeated references
    pub fn key(&self) -> (String, i32) {
        (idioma_key(&self.idioma), self.numero)
    }

    pub fn matches(&self, turma: &Turma) -> bool {
        turma.numero == self.numero && same_idioma(&turma.idioma, &self.idioma)
    }
}

impl PartialEq for TurmaRef {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for TurmaRef {}

impl std::fmt::Display for TurmaRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.idioma, self.numero)
    }
}

/// The editable fields of a class, validated and trimmed
#[derive(Debug, Clone, PartialEq)]
pub struct TurmaDados {
    idioma: String,
    numero: i32,
    ano_letivo: String,
}

impl TurmaDados {
    pub fn new(idioma: &str, numero: i32, ano_letivo: &str) -> Result<Self, TurmaValidationError> {
        let idioma = idioma.trim();
        let ano_letivo = ano_letivo.trim();

        validate_idioma(idioma)?;
        validate_numero(numero)?;
        validate_ano_letivo(ano_letivo)?;

        Ok(Self {
            idioma: idioma.to_string(),
            numero,
            ano_letivo: ano_letivo.to_string(),
        })
    }

    pub fn idioma(&self) -> &str {
        &self.idioma
    }

    pub fn numero(&self) -> i32 {
        self.numero
    }

    pub fn ano_letivo(&self) -> &str {
        &self.ano_letivo
    }

    /// Identity this data would give the class
    pub fn identity(&self) -> TurmaRef {
        TurmaRef {
            idioma: self.idioma.clone(),
            numero: self.numero,
        }
    }
}

/// Class entity
#[derive(Debug, Clone, PartialEq)]
pub struct Turma {
    id: TurmaId,
    idioma: String,
    numero: i32,
    ano_letivo: String,
}

impl Turma {
    pub fn new(id: TurmaId, dados: TurmaDados) -> Self {
        Self {
            id,
            idioma: dados.idioma,
            numero: dados.numero,
            ano_letivo: dados.ano_letivo,
        }
    }

    /// Rebuild a class from stored columns without re-running input validation
    pub(crate) fn from_stored(
        id: TurmaId,
        idioma: String,
        numero: i32,
        ano_letivo: String,
    ) -> Self {
        Self {
            id,
            idioma,
            numero,
            ano_letivo,
        }
    }

    // Getters

    pub fn id(&self) -> TurmaId {
        self.id
    }

    pub fn idioma(&self) -> &str {
        &self.idioma
    }

    pub fn idioma_key(&self) -> String {
        idioma_key(&self.idioma)
    }

    pub fn numero(&self) -> i32 {
        self.numero
    }

    pub fn ano_letivo(&self) -> &str {
        &self.ano_letivo
    }

    pub fn identity(&self) -> TurmaRef {
        TurmaRef {
            idioma: self.idioma.clone(),
            numero: self.numero,
        }
    }

    /// Ordering used by every class listing: idioma ignoring case and accents, then numero
    pub fn cmp_by_identity(a: &Turma, b: &Turma) -> Ordering {
        compare_text(&a.idioma, &b.idioma)
            .then(a.numero.cmp(&b.numero))
            .then(a.id.cmp(&b.id))
    }

    // Mutators

    pub fn apply(&mut self, dados: TurmaDados) {
        self.idioma = dados.idioma;
        self.numero = dados.numero;
        self.ano_letivo = dados.ano_letivo;
    }
}

/// A class with its current enrollment count
#[derive(Debug, Clone)]
pub struct TurmaComVagas {
    pub turma: Turma,
    pub matriculas: usize,
}

impl TurmaComVagas {
    pub fn new(turma: Turma, matriculas: usize) -> Self {
        Self { turma, matriculas }
    }

    /// Remaining seats, never negative
    pub fn vagas_restantes(&self) -> usize {
        CAPACIDADE_TURMA.saturating_sub(self.matriculas)
    }

    pub fn lotada(&self) -> bool {
        self.matriculas >= CAPACIDADE_TURMA
    }
}
