//! Rule checks shared by the school services
//!
//! Every helper runs against an open transaction so that the check and the
//! write it guards observe the same snapshot.

use std::fmt::Display;

use tokio_util::sync::CancellationToken;

use crate::domain::storage::SchoolTransaction;
use crate::domain::{
    compare_text, Aluno, AlunoDados, AlunoDetalhe, AlunoId, DomainError, Turma, TurmaId,
    TurmaRef, CAPACIDADE_TURMA,
};

/// Fails with [`DomainError::Cancelled`] once the caller gave up on the request
pub(crate) fn ensure_active(cancel: &CancellationToken) -> Result<(), DomainError> {
    if cancel.is_cancelled() {
        return Err(DomainError::Cancelled);
    }

    Ok(())
}

pub(crate) fn validation_error(error: impl Display) -> DomainError {
    DomainError::validation(error.to_string())
}

pub(crate) async fn require_aluno(
    tx: &mut dyn SchoolTransaction,
    id: AlunoId,
) -> Result<Aluno, DomainError> {
    tx.get_aluno(id)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("Aluno {} não encontrado", id)))
}

pub(crate) async fn require_turma(
    tx: &mut dyn SchoolTransaction,
    id: TurmaId,
) -> Result<Turma, DomainError> {
    tx.get_turma(id)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("Turma {} não encontrada", id)))
}

pub(crate) async fn find_turma(
    tx: &mut dyn SchoolTransaction,
    turma_ref: &TurmaRef,
) -> Result<Turma, DomainError> {
    tx.find_turma(turma_ref)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("Turma {} não encontrada", turma_ref)))
}

/// Resolve every reference, in request order
pub(crate) async fn resolve_turmas(
    tx: &mut dyn SchoolTransaction,
    refs: &[TurmaRef],
) -> Result<Vec<Turma>, DomainError> {
    let mut turmas = Vec::with_capacity(refs.len());

    for turma_ref in refs {
        turmas.push(find_turma(tx, turma_ref).await?);
    }

    Ok(turmas)
}

/// The class must have room for one more student
pub(crate) async fn ensure_vaga(
    tx: &mut dyn SchoolTransaction,
    turma: &Turma,
) -> Result<(), DomainError> {
    let matriculas = tx.count_matriculas(turma.id()).await?;

    if matriculas >= CAPACIDADE_TURMA {
        return Err(DomainError::invalid_operation(format!(
            "Turma {} está lotada ({} alunos)",
            turma.identity(),
            CAPACIDADE_TURMA
        )));
    }

    Ok(())
}

/// Email and cpf must not belong to another student
pub(crate) async fn ensure_aluno_unico(
    tx: &mut dyn SchoolTransaction,
    dados: &AlunoDados,
    except: Option<AlunoId>,
) -> Result<(), DomainError> {
    if tx.email_in_use(dados.email(), except).await? {
        return Err(DomainError::invalid_operation("E-mail já cadastrado"));
    }

    if tx.cpf_in_use(dados.cpf(), except).await? {
        return Err(DomainError::invalid_operation("CPF já cadastrado"));
    }

    Ok(())
}

pub(crate) async fn load_detalhe(
    tx: &mut dyn SchoolTransaction,
    aluno: Aluno,
) -> Result<AlunoDetalhe, DomainError> {
    let turmas = tx.turmas_do_aluno(aluno.id()).await?;
    Ok(AlunoDetalhe::new(aluno, turmas))
}

/// Order students by nome ignoring case and accents, ties broken by id
pub(crate) fn sort_alunos(alunos: &mut [Aluno]) {
    alunos.sort_by(|a, b| compare_text(a.nome(), b.nome()).then_with(|| a.id().cmp(&b.id())));
}
