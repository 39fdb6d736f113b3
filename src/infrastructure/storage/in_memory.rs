//! In-memory school store
//!
//! Useful for testing and development. Data is lost when the process terminates.
//! A transaction holds the store lock for its whole lifetime and works on a
//! private copy of the tables, so transactions are fully serialized and a
//! dropped transaction leaves no trace.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::aluno::{Aluno, AlunoDados, AlunoId, Cpf};
use crate::domain::matricula::Matricula;
use crate::domain::storage::{SchoolStore, SchoolTransaction};
use crate::domain::turma::{same_idioma, Turma, TurmaComVagas, TurmaDados, TurmaId, TurmaRef};
use crate::domain::DomainError;

#[derive(Debug, Clone, Default)]
struct Tables {
    alunos: BTreeMap<AlunoId, Aluno>,
    turmas: BTreeMap<TurmaId, Turma>,
    matriculas: BTreeMap<(AlunoId, TurmaId), Matricula>,
    last_aluno_id: i64,
    last_turma_id: i64,
}

impl Tables {
    fn email_taken(&self, email: &str, except: Option<AlunoId>) -> bool {
        self.alunos
            .values()
            .any(|a| Some(a.id()) != except && a.email() == email)
    }

    fn cpf_taken(&self, cpf: &Cpf, except: Option<AlunoId>) -> bool {
        self.alunos
            .values()
            .any(|a| Some(a.id()) != except && a.cpf() == cpf)
    }

    fn identity_taken(&self, turma_ref: &TurmaRef, except: Option<TurmaId>) -> bool {
        self.turmas
            .values()
            .any(|t| Some(t.id()) != except && turma_ref.matches(t))
    }

    fn check_aluno_unique(&self, email: &str, cpf: &Cpf, except: Option<AlunoId>) -> Result<(), DomainError> {
        if self.email_taken(email, except) {
            return Err(DomainError::invalid_operation("E-mail já cadastrado"));
        }

        if self.cpf_taken(cpf, except) {
            return Err(DomainError::invalid_operation("CPF já cadastrado"));
        }

        Ok(())
    }

    fn count_for_turma(&self, turma_id: TurmaId) -> usize {
        self.matriculas
            .values()
            .filter(|m| m.turma_id() == turma_id)
            .count()
    }
}

/// Thread-safe in-memory implementation of [`SchoolStore`]
#[derive(Debug, Clone, Default)]
pub struct InMemorySchoolStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemorySchoolStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SchoolStore for InMemorySchoolStore {
    async fn begin(&self) -> Result<Box<dyn SchoolTransaction>, DomainError> {
        let guard = self.tables.clone().lock_owned().await;
        let working = guard.clone();

        Ok(Box::new(InMemoryTransaction { guard, working }))
    }

    async fn ping(&self) -> Result<(), DomainError> {
        Ok(())
    }
}

struct InMemoryTransaction {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
}

#[async_trait]
impl SchoolTransaction for InMemoryTransaction {
    async fn get_aluno(&mut self, id: AlunoId) -> Result<Option<Aluno>, DomainError> {
        Ok(self.working.alunos.get(&id).cloned())
    }

    async fn list_alunos(&mut self) -> Result<Vec<Aluno>, DomainError> {
        Ok(self.working.alunos.values().cloned().collect())
    }

    async fn email_in_use(
        &mut self,
        email: &str,
        except: Option<AlunoId>,
    ) -> Result<bool, DomainError> {
        Ok(self.working.email_taken(email, except))
    }

    async fn cpf_in_use(&mut self, cpf: &Cpf, except: Option<AlunoId>) -> Result<bool, DomainError> {
        Ok(self.working.cpf_taken(cpf, except))
    }

    async fn insert_aluno(&mut self, dados: &AlunoDados) -> Result<Aluno, DomainError> {
        self.working
            .check_aluno_unique(dados.email(), dados.cpf(), None)?;

        self.working.last_aluno_id += 1;
        let aluno = Aluno::new(AlunoId::new(self.working.last_aluno_id), dados.clone());
        self.working.alunos.insert(aluno.id(), aluno.clone());

        Ok(aluno)
    }

    async fn update_aluno(&mut self, aluno: &Aluno) -> Result<(), DomainError> {
        if !self.working.alunos.contains_key(&aluno.id()) {
            return Err(DomainError::not_found(format!(
                "Aluno {} não encontrado",
                aluno.id()
            )));
        }

        self.working
            .check_aluno_unique(aluno.email(), aluno.cpf(), Some(aluno.id()))?;
        self.working.alunos.insert(aluno.id(), aluno.clone());

        Ok(())
    }

    async fn delete_aluno(&mut self, id: AlunoId) -> Result<bool, DomainError> {
        if self.working.matriculas.keys().any(|(a, _)| *a == id) {
            return Err(DomainError::invalid_operation(format!(
                "Aluno {} ainda possui matrículas",
                id
            )));
        }

        Ok(self.working.alunos.remove(&id).is_some())
    }

    async fn get_turma(&mut self, id: TurmaId) -> Result<Option<Turma>, DomainError> {
        Ok(self.working.turmas.get(&id).cloned())
    }

    async fn find_turma(&mut self, turma_ref: &TurmaRef) -> Result<Option<Turma>, DomainError> {
        Ok(self
            .working
            .turmas
            .values()
            .find(|t| turma_ref.matches(t))
            .cloned())
    }

    async fn turma_identity_in_use(
        &mut self,
        turma_ref: &TurmaRef,
        except: Option<TurmaId>,
    ) -> Result<bool, DomainError> {
        Ok(self.working.identity_taken(turma_ref, except))
    }

    async fn list_turmas(
        &mut self,
        idioma: Option<&str>,
    ) -> Result<Vec<TurmaComVagas>, DomainError> {
        let tables = &self.working;

        Ok(tables
            .turmas
            .values()
            .filter(|t| idioma.is_none_or(|i| same_idioma(t.idioma(), i)))
            .map(|t| TurmaComVagas::new(t.clone(), tables.count_for_turma(t.id())))
            .collect())
    }

    async fn insert_turma(&mut self, dados: &TurmaDados) -> Result<Turma, DomainError> {
        if self.working.identity_taken(&dados.identity(), None) {
            return Err(DomainError::invalid_operation(format!(
                "Já existe uma turma {}",
                dados.identity()
            )));
        }

        self.working.last_turma_id += 1;
        let turma = Turma::new(TurmaId::new(self.working.last_turma_id), dados.clone());
        self.working.turmas.insert(turma.id(), turma.clone());

        Ok(turma)
    }

    async fn update_turma(&mut self, turma: &Turma) -> Result<(), DomainError> {
        if !self.working.turmas.contains_key(&turma.id()) {
            return Err(DomainError::not_found(format!(
                "Turma {} não encontrada",
                turma.id()
            )));
        }

        if self.working.identity_taken(&turma.identity(), Some(turma.id())) {
            return Err(DomainError::invalid_operation(format!(
                "Já existe a turma {}",
                turma.identity()
            )));
        }

        self.working.turmas.insert(turma.id(), turma.clone());

        Ok(())
    }

    async fn delete_turma(&mut self, id: TurmaId) -> Result<bool, DomainError> {
        if self.working.count_for_turma(id) > 0 {
            return Err(DomainError::invalid_operation(format!(
                "Turma {} ainda possui alunos",
                id
            )));
        }

        Ok(self.working.turmas.remove(&id).is_some())
    }

    async fn matriculas_do_aluno(&mut self, id: AlunoId) -> Result<Vec<Matricula>, DomainError> {
        Ok(self
            .working
            .matriculas
            .values()
            .filter(|m| m.aluno_id() == id)
            .cloned()
            .collect())
    }

    async fn turmas_do_aluno(&mut self, id: AlunoId) -> Result<Vec<Turma>, DomainError> {
        let tables = &self.working;

        Ok(tables
            .matriculas
            .values()
            .filter(|m| m.aluno_id() == id)
            .filter_map(|m| tables.turmas.get(&m.turma_id()).cloned())
            .collect())
    }

    async fn alunos_da_turma(&mut self, id: TurmaId) -> Result<Vec<Aluno>, DomainError> {
        let tables = &self.working;

        Ok(tables
            .matriculas
            .values()
            .filter(|m| m.turma_id() == id)
            .filter_map(|m| tables.alunos.get(&m.aluno_id()).cloned())
            .collect())
    }

    async fn count_matriculas(&mut self, turma_id: TurmaId) -> Result<usize, DomainError> {
        Ok(self.working.count_for_turma(turma_id))
    }

    async fn insert_matricula(&mut self, matricula: &Matricula) -> Result<(), DomainError> {
        if !self.working.alunos.contains_key(&matricula.aluno_id()) {
            return Err(DomainError::not_found(format!(
                "Aluno {} não encontrado",
                matricula.aluno_id()
            )));
        }

        if !self.working.turmas.contains_key(&matricula.turma_id()) {
            return Err(DomainError::not_found(format!(
                "Turma {} não encontrada",
                matricula.turma_id()
            )));
        }

        if self.working.matriculas.contains_key(&matricula.key()) {
            return Err(DomainError::invalid_operation(
                "Aluno já está matriculado nessa turma",
            ));
        }

        self.working
            .matriculas
            .insert(matricula.key(), matricula.clone());

        Ok(())
    }

    async fn delete_matricula(
        &mut self,
        aluno_id: AlunoId,
        turma_id: TurmaId,
    ) -> Result<bool, DomainError> {
        Ok(self
            .working
            .matriculas
            .remove(&(aluno_id, turma_id))
            .is_some())
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        let InMemoryTransaction { mut guard, working } = *self;
        *guard = working;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dados_aluno(email: &str, cpf: &str) -> AlunoDados {
        AlunoDados::new("Maria", email, cpf, 20).unwrap()
    }

    fn dados_turma(idioma: &str, numero: i32) -> TurmaDados {
        TurmaDados::new(idioma, numero, "2025/1").unwrap()
    }

    #[tokio::test]
    async fn test_commit_makes_writes_visible() {
        let store = InMemorySchoolStore::new();

        let mut tx = store.begin().await.unwrap();
        let turma = tx.insert_turma(&dados_turma("Inglês", 101)).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.get_turma(turma.id()).await.unwrap(), Some(turma));
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let store = InMemorySchoolStore::new();

        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_turma(&dados_turma("Inglês", 101)).await.unwrap();
        }

        let mut tx = store.begin().await.unwrap();
        assert!(tx.list_turmas(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ids_are_sequential() {
        let store = InMemorySchoolStore::new();
        let mut tx = store.begin().await.unwrap();

        let a = tx.insert_turma(&dados_turma("Inglês", 101)).await.unwrap();
        let b = tx.insert_turma(&dados_turma("Inglês", 102)).await.unwrap();

        assert_eq!(a.id(), TurmaId::new(1));
        assert_eq!(b.id(), TurmaId::new(2));
    }

    #[tokio::test]
    async fn test_unique_constraints() {
        let store = InMemorySchoolStore::new();
        let mut tx = store.begin().await.unwrap();

        tx.insert_aluno(&dados_aluno("a@escola.com", "52998224725"))
            .await
            .unwrap();

        let same_email = tx
            .insert_aluno(&dados_aluno("a@escola.com", "11144477735"))
            .await;
        assert!(matches!(same_email, Err(DomainError::InvalidOperation { .. })));

        let same_cpf = tx
            .insert_aluno(&dados_aluno("b@escola.com", "529.982.247-25"))
            .await;
        assert!(matches!(same_cpf, Err(DomainError::InvalidOperation { .. })));

        tx.insert_turma(&dados_turma("Inglês", 101)).await.unwrap();
        let same_identity = tx.insert_turma(&dados_turma("INGLÊS", 101)).await;
        assert!(matches!(
            same_identity,
            Err(DomainError::InvalidOperation { .. })
        ));
    }

    #[tokio::test]
    async fn test_restrict_on_delete() {
        let store = InMemorySchoolStore::new();
        let mut tx = store.begin().await.unwrap();

        let aluno = tx
            .insert_aluno(&dados_aluno("a@escola.com", "52998224725"))
            .await
            .unwrap();
        let turma = tx.insert_turma(&dados_turma("Inglês", 101)).await.unwrap();
        tx.insert_matricula(&Matricula::new(aluno.id(), turma.id()))
            .await
            .unwrap();

        assert!(tx.delete_aluno(aluno.id()).await.is_err());
        assert!(tx.delete_turma(turma.id()).await.is_err());

        assert!(tx.delete_matricula(aluno.id(), turma.id()).await.unwrap());
        assert!(tx.delete_turma(turma.id()).await.unwrap());
        assert!(tx.delete_aluno(aluno.id()).await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_matricula_rejected() {
        let store = InMemorySchoolStore::new();
        let mut tx = store.begin().await.unwrap();

        let aluno = tx
            .insert_aluno(&dados_aluno("a@escola.com", "52998224725"))
            .await
            .unwrap();
        let turma = tx.insert_turma(&dados_turma("Inglês", 101)).await.unwrap();

        tx.insert_matricula(&Matricula::new(aluno.id(), turma.id()))
            .await
            .unwrap();
        let again = tx
            .insert_matricula(&Matricula::new(aluno.id(), turma.id()))
            .await;

        assert!(matches!(again, Err(DomainError::InvalidOperation { .. })));
        assert_eq!(tx.count_matriculas(turma.id()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_list_turmas_filters_idioma_ignoring_case() {
        let store = InMemorySchoolStore::new();
        let mut tx = store.begin().await.unwrap();

        tx.insert_turma(&dados_turma("Inglês", 101)).await.unwrap();
        tx.insert_turma(&dados_turma("Espanhol", 101)).await.unwrap();

        let ingles = tx.list_turmas(Some("inglês")).await.unwrap();
        assert_eq!(ingles.len(), 1);
        assert_eq!(ingles[0].turma.idioma(), "Inglês");
        assert_eq!(ingles[0].vagas_restantes(), 5);
    }
}
