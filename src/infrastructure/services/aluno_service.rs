//! Aluno service - student lifecycle and enrollment operations

use std::collections::HashSet;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::checks::{
    ensure_active, ensure_aluno_unico, ensure_vaga, find_turma, load_detalhe, require_aluno,
    resolve_turmas, sort_alunos, validation_error,
};
use crate::domain::storage::SchoolStore;
use crate::domain::{
    validate_turma_refs, Aluno, AlunoDados, AlunoDetalhe, AlunoId, DomainError, Matricula,
    MatriculaValidationError, TurmaId, TurmaRef,
};

/// A class reference as submitted by a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurmaRefRequest {
    pub idioma: String,
    pub numero: i32,
}

impl TurmaRefRequest {
    pub fn new(idioma: impl Into<String>, numero: i32) -> Self {
        Self {
            idioma: idioma.into(),
            numero,
        }
    }

    fn parse(&self) -> Result<TurmaRef, DomainError> {
        TurmaRef::new(&self.idioma, self.numero).map_err(validation_error)
    }
}

/// Request to create a student together with its first enrollments
#[derive(Debug, Clone)]
pub struct CreateAlunoRequest {
    pub nome: String,
    pub email: String,
    /// Digits only or masked (000.000.000-00)
    pub cpf: String,
    pub idade: i32,
    pub turmas: Vec<TurmaRefRequest>,
}

/// Request to replace a student's data and class list
#[derive(Debug, Clone)]
pub struct UpdateAlunoRequest {
    pub nome: String,
    pub email: String,
    pub cpf: String,
    pub idade: i32,
    pub turmas: Vec<TurmaRefRequest>,
}

/// Student operations, each executed as one store transaction
#[derive(Clone)]
pub struct AlunoService {
    store: Arc<dyn SchoolStore>,
}

impl std::fmt::Debug for AlunoService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlunoService").finish_non_exhaustive()
    }
}

impl AlunoService {
    pub fn new(store: Arc<dyn SchoolStore>) -> Self {
        Self { store }
    }

    /// Create a student enrolled in every requested class
    pub async fn create(
        &self,
        request: CreateAlunoRequest,
        cancel: &CancellationToken,
    ) -> Result<AlunoDetalhe, DomainError> {
        let dados = AlunoDados::new(&request.nome, &request.email, &request.cpf, request.idade)
            .map_err(validation_error)?;
        let refs = parse_refs(&request.turmas)?;
        validate_turma_refs(&refs).map_err(validation_error)?;

        ensure_active(cancel)?;
        let mut tx = self.store.begin().await?;

        ensure_aluno_unico(&mut *tx, &dados, None).await?;
        ensure_active(cancel)?;

        let turmas = resolve_turmas(&mut *tx, &refs).await?;
        for turma in &turmas {
            ensure_vaga(&mut *tx, turma).await?;
        }
        ensure_active(cancel)?;

        let aluno = tx.insert_aluno(&dados).await?;
        for turma in &turmas {
            tx.insert_matricula(&Matricula::new(aluno.id(), turma.id()))
                .await?;
        }

        ensure_active(cancel)?;
        tx.commit().await?;

        info!(
            aluno_id = %aluno.id(),
            turmas = turmas.len(),
            "Created aluno"
        );

        Ok(AlunoDetalhe::new(aluno, turmas))
    }

    /// Replace a student's data and reconcile its enrollments with the requested classes
    pub async fn update(
        &self,
        id: AlunoId,
        request: UpdateAlunoRequest,
        cancel: &CancellationToken,
    ) -> Result<AlunoDetalhe, DomainError> {
        let dados = AlunoDados::new(&request.nome, &request.email, &request.cpf, request.idade)
            .map_err(validation_error)?;
        let refs = parse_refs(&request.turmas)?;
        match validate_turma_refs(&refs) {
            Ok(()) => {}
            Err(e @ MatriculaValidationError::NoTurmas) => {
                return Err(DomainError::invalid_operation(e.to_string()));
            }
            Err(e) => return Err(validation_error(e)),
        }

        ensure_active(cancel)?;
        let mut tx = self.store.begin().await?;

        let mut aluno = require_aluno(&mut *tx, id).await?;
        ensure_aluno_unico(&mut *tx, &dados, Some(id)).await?;
        ensure_active(cancel)?;

        let desejadas = resolve_turmas(&mut *tx, &refs).await?;
        let atuais: HashSet<TurmaId> = tx
            .matriculas_do_aluno(id)
            .await?
            .iter()
            .map(|m| m.turma_id())
            .collect();
        let desejadas_ids: HashSet<TurmaId> = desejadas.iter().map(|t| t.id()).collect();

        let novas: Vec<_> = desejadas
            .iter()
            .filter(|t| !atuais.contains(&t.id()))
            .collect();
        for turma in &novas {
            ensure_vaga(&mut *tx, turma).await?;
        }
        ensure_active(cancel)?;

        let mut removidas = 0;
        for turma_id in atuais.difference(&desejadas_ids) {
            tx.delete_matricula(id, *turma_id).await?;
            removidas += 1;
        }
        for turma in &novas {
            tx.insert_matricula(&Matricula::new(id, turma.id())).await?;
        }

        aluno.apply(dados);
        tx.update_aluno(&aluno).await?;

        ensure_active(cancel)?;
        tx.commit().await?;

        info!(
            aluno_id = %id,
            adicionadas = novas.len(),
            removidas,
            "Updated aluno"
        );

        Ok(AlunoDetalhe::new(aluno, desejadas))
    }

    /// Delete a student that holds no enrollment
    pub async fn delete(&self, id: AlunoId, cancel: &CancellationToken) -> Result<(), DomainError> {
        ensure_active(cancel)?;
        let mut tx = self.store.begin().await?;

        require_aluno(&mut *tx, id).await?;

        if !tx.matriculas_do_aluno(id).await?.is_empty() {
            return Err(DomainError::invalid_operation(format!(
                "Aluno {} ainda possui matrículas",
                id
            )));
        }

        ensure_active(cancel)?;
        tx.delete_aluno(id).await?;
        tx.commit().await?;

        info!(aluno_id = %id, "Deleted aluno");
        Ok(())
    }

    /// Enroll a student in one more class
    pub async fn matricular(
        &self,
        id: AlunoId,
        turma: TurmaRefRequest,
        cancel: &CancellationToken,
    ) -> Result<AlunoDetalhe, DomainError> {
        let turma_ref = turma.parse()?;

        ensure_active(cancel)?;
        let mut tx = self.store.begin().await?;

        let aluno = require_aluno(&mut *tx, id).await?;
        let turma = find_turma(&mut *tx, &turma_ref).await?;
        ensure_active(cancel)?;

        let matriculado = tx
            .matriculas_do_aluno(id)
            .await?
            .iter()
            .any(|m| m.turma_id() == turma.id());
        if matriculado {
            return Err(DomainError::invalid_operation(format!(
                "Aluno já matriculado na turma {}",
                turma.identity()
            )));
        }

        ensure_vaga(&mut *tx, &turma).await?;
        ensure_active(cancel)?;

        tx.insert_matricula(&Matricula::new(id, turma.id())).await?;
        let detalhe = load_detalhe(&mut *tx, aluno).await?;

        ensure_active(cancel)?;
        tx.commit().await?;

        info!(aluno_id = %id, turma_id = %turma.id(), "Enrolled aluno");
        Ok(detalhe)
    }

    /// Remove a student from one class, keeping at least one enrollment
    pub async fn desmatricular(
        &self,
        id: AlunoId,
        turma: TurmaRefRequest,
        cancel: &CancellationToken,
    ) -> Result<AlunoDetalhe, DomainError> {
        let turma_ref = turma.parse()?;

        ensure_active(cancel)?;
        let mut tx = self.store.begin().await?;

        let aluno = require_aluno(&mut *tx, id).await?;
        let turma = find_turma(&mut *tx, &turma_ref).await?;
        ensure_active(cancel)?;

        let matriculas = tx.matriculas_do_aluno(id).await?;
        if !matriculas.iter().any(|m| m.turma_id() == turma.id()) {
            return Err(DomainError::invalid_operation(format!(
                "Aluno não está matriculado na turma {}",
                turma.identity()
            )));
        }

        if matriculas.len() <= 1 {
            return Err(DomainError::invalid_operation(
                "Aluno deve permanecer matriculado em pelo menos 1 turma",
            ));
        }

        tx.delete_matricula(id, turma.id()).await?;
        let detalhe = load_detalhe(&mut *tx, aluno).await?;

        ensure_active(cancel)?;
        tx.commit().await?;

        info!(aluno_id = %id, turma_id = %turma.id(), "Unenrolled aluno");
        Ok(detalhe)
    }

    /// Student with its classes, or None when absent
    pub async fn get(
        &self,
        id: AlunoId,
        cancel: &CancellationToken,
    ) -> Result<Option<AlunoDetalhe>, DomainError> {
        ensure_active(cancel)?;
        let mut tx = self.store.begin().await?;

        let Some(aluno) = tx.get_aluno(id).await? else {
            debug!(aluno_id = %id, "Aluno not found");
            return Ok(None);
        };

        ensure_active(cancel)?;
        load_detalhe(&mut *tx, aluno).await.map(Some)
    }

    /// All students sorted by nome
    pub async fn list(&self, cancel: &CancellationToken) -> Result<Vec<Aluno>, DomainError> {
        ensure_active(cancel)?;
        let mut tx = self.store.begin().await?;

        let mut alunos = tx.list_alunos().await?;
        sort_alunos(&mut alunos);

        debug!(count = alunos.len(), "Listed alunos");
        Ok(alunos)
    }

    /// All students with their classes, sorted by nome
    pub async fn list_com_turmas(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<AlunoDetalhe>, DomainError> {
        ensure_active(cancel)?;
        let mut tx = self.store.begin().await?;

        let mut alunos = tx.list_alunos().await?;
        sort_alunos(&mut alunos);

        let mut detalhes = Vec::with_capacity(alunos.len());
        for aluno in alunos {
            ensure_active(cancel)?;
            detalhes.push(load_detalhe(&mut *tx, aluno).await?);
        }

        Ok(detalhes)
    }
}

fn parse_refs(turmas: &[TurmaRefRequest]) -> Result<Vec<TurmaRef>, DomainError> {
    turmas.iter().map(TurmaRefRequest::parse).collect()
}
