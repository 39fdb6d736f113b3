//! Turma service - class CRUD and class-centric queries

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::checks::{
    ensure_active, find_turma, require_turma, sort_alunos, validation_error,
};
use crate::domain::storage::SchoolStore;
use crate::domain::{Aluno, DomainError, Turma, TurmaComVagas, TurmaDados, TurmaId, TurmaRef};

/// Request to create a class
#[derive(Debug, Clone)]
pub struct CreateTurmaRequest {
    pub idioma: String,
    pub numero: i32,
    /// "YYYY/1" or "YYYY/2"
    pub ano_letivo: String,
}

/// Request to replace a class's data
#[derive(Debug, Clone)]
pub struct UpdateTurmaRequest {
    pub idioma: String,
    pub numero: i32,
    pub ano_letivo: String,
}

/// Class operations, each executed as one store transaction
#[derive(Clone)]
pub struct TurmaService {
    store: Arc<dyn SchoolStore>,
}

impl std::fmt::Debug for TurmaService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurmaService").finish_non_exhaustive()
    }
}

impl TurmaService {
    pub fn new(store: Arc<dyn SchoolStore>) -> Self {
        Self { store }
    }

    pub async fn create(
        &self,
        request: CreateTurmaRequest,
        cancel: &CancellationToken,
    ) -> Result<TurmaComVagas, DomainError> {
        let dados = TurmaDados::new(&request.idioma, request.numero, &request.ano_letivo)
            .map_err(validation_error)?;

        ensure_active(cancel)?;
        let mut tx = self.store.begin().await?;

        if tx.turma_identity_in_use(&dados.identity(), None).await? {
            return Err(DomainError::invalid_operation(format!(
                "Turma {} já existe",
                dados.identity()
            )));
        }

        ensure_active(cancel)?;
        let turma = tx.insert_turma(&dados).await?;
        tx.commit().await?;

        info!(turma_id = %turma.id(), turma = %turma.identity(), "Created turma");
        Ok(TurmaComVagas::new(turma, 0))
    }

    /// Update a class in place; its identity may change as long as no other class holds it
    pub async fn update(
        &self,
        id: TurmaId,
        request: UpdateTurmaRequest,
        cancel: &CancellationToken,
    ) -> Result<TurmaComVagas, DomainError> {
        let dados = TurmaDados::new(&request.idioma, request.numero, &request.ano_letivo)
            .map_err(validation_error)?;

        ensure_active(cancel)?;
        let mut tx = self.store.begin().await?;

        let mut turma = require_turma(&mut *tx, id).await?;

        if tx.turma_identity_in_use(&dados.identity(), Some(id)).await? {
            return Err(DomainError::invalid_operation(format!(
                "Turma {} já existe",
                dados.identity()
            )));
        }

        ensure_active(cancel)?;
        turma.apply(dados);
        tx.update_turma(&turma).await?;
        let matriculas = tx.count_matriculas(id).await?;
        tx.commit().await?;

        info!(turma_id = %id, turma = %turma.identity(), "Updated turma");
        Ok(TurmaComVagas::new(turma, matriculas))
    }

    /// Delete a class nobody is enrolled in
    pub async fn delete(&self, id: TurmaId, cancel: &CancellationToken) -> Result<(), DomainError> {
        ensure_active(cancel)?;
        let mut tx = self.store.begin().await?;

        let turma = require_turma(&mut *tx, id).await?;

        if tx.count_matriculas(id).await? > 0 {
            return Err(DomainError::invalid_operation(format!(
                "Turma {} possui alunos matriculados",
                turma.identity()
            )));
        }

        ensure_active(cancel)?;
        tx.delete_turma(id).await?;
        tx.commit().await?;

        info!(turma_id = %id, "Deleted turma");
        Ok(())
    }

    /// Class with its remaining seats, or None when absent
    pub async fn get(
        &self,
        id: TurmaId,
        cancel: &CancellationToken,
    ) -> Result<Option<TurmaComVagas>, DomainError> {
        ensure_active(cancel)?;
        let mut tx = self.store.begin().await?;

        let Some(turma) = tx.get_turma(id).await? else {
            debug!(turma_id = %id, "Turma not found");
            return Ok(None);
        };

        ensure_active(cancel)?;
        let matriculas = tx.count_matriculas(id).await?;
        Ok(Some(TurmaComVagas::new(turma, matriculas)))
    }

    /// All classes sorted by (idioma, numero)
    pub async fn list(&self, cancel: &CancellationToken) -> Result<Vec<TurmaComVagas>, DomainError> {
        ensure_active(cancel)?;
        let mut tx = self.store.begin().await?;

        let mut turmas = tx.list_turmas(None).await?;
        turmas.sort_by(|a, b| Turma::cmp_by_identity(&a.turma, &b.turma));

        debug!(count = turmas.len(), "Listed turmas");
        Ok(turmas)
    }

    /// Classes of one language (ignoring case), sorted by numero
    pub async fn list_by_idioma(
        &self,
        idioma: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<TurmaComVagas>, DomainError> {
        ensure_active(cancel)?;
        let mut tx = self.store.begin().await?;

        let mut turmas = tx.list_turmas(Some(idioma.trim())).await?;
        turmas.sort_by_key(|t| (t.turma.numero(), t.turma.id()));

        debug!(idioma, count = turmas.len(), "Listed turmas by idioma");
        Ok(turmas)
    }

    /// Students enrolled in the class identified by (idioma, numero), sorted by nome
    pub async fn alunos_da_turma(
        &self,
        idioma: &str,
        numero: i32,
        cancel: &CancellationToken,
    ) -> Result<Vec<Aluno>, DomainError> {
        // No class can carry an invalid identity, so such a lookup simply misses
        let turma_ref = TurmaRef::new(idioma, numero).map_err(|_| {
            DomainError::not_found(format!("Turma {} {} não encontrada", idioma.trim(), numero))
        })?;

        ensure_active(cancel)?;
        let mut tx = self.store.begin().await?;

        let turma = find_turma(&mut *tx, &turma_ref).await?;
        ensure_active(cancel)?;

        let mut alunos = tx.alunos_da_turma(turma.id()).await?;
        sort_alunos(&mut alunos);

        debug!(turma_id = %turma.id(), count = alunos.len(), "Listed alunos da turma");
        Ok(alunos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CAPACIDADE_TURMA;
    use crate::infrastructure::services::testing::{aluno_request, school_services, turma_request};
    use crate::infrastructure::services::TurmaRefRequest;
    use tokio_test::assert_ok;

    fn update_request(idioma: &str, numero: i32) -> UpdateTurmaRequest {
        UpdateTurmaRequest {
            idioma: idioma.to_string(),
            numero,
            ano_letivo: "2025/2".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_trims_and_starts_empty() {
        let (_, turmas) = school_services();
        let cancel = CancellationToken::new();

        let created = turmas
            .create(
                CreateTurmaRequest {
                    idioma: "  Inglês ".to_string(),
                    numero: 101,
                    ano_letivo: " 2025/1 ".to_string(),
                },
                &cancel,
            )
            .await
            .unwrap();

        assert_eq!(created.turma.idioma(), "Inglês");
        assert_eq!(created.turma.ano_letivo(), "2025/1");
        assert_eq!(created.vagas_restantes(), CAPACIDADE_TURMA);
    }

    #[tokio::test]
    async fn test_create_duplicate_identity_ignores_case() {
        let (_, turmas) = school_services();
        let cancel = CancellationToken::new();

        assert_ok!(turmas.create(turma_request("Inglês", 101), &cancel).await);

        let result = turmas.create(turma_request("INGLÊS", 101), &cancel).await;
        assert!(matches!(result, Err(DomainError::InvalidOperation { .. })));

        assert_ok!(turmas.create(turma_request("Inglês", 102), &cancel).await);
    }

    #[tokio::test]
    async fn test_create_rejects_bad_ano_letivo() {
        let (_, turmas) = school_services();
        let cancel = CancellationToken::new();

        let mut request = turma_request("Inglês", 101);
        request.ano_letivo = "2025/3".to_string();

        let result = turmas.create(request, &cancel).await;
        assert!(matches!(result, Err(DomainError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_update_identity_rules() {
        let (_, turmas) = school_services();
        let cancel = CancellationToken::new();

        let a = turmas.create(turma_request("Inglês", 101), &cancel).await.unwrap();
        turmas.create(turma_request("Inglês", 102), &cancel).await.unwrap();

        let collision = turmas
            .update(a.turma.id(), update_request("inglês", 102), &cancel)
            .await;
        assert!(matches!(collision, Err(DomainError::InvalidOperation { .. })));

        let same = turmas
            .update(a.turma.id(), update_request("Inglês", 101), &cancel)
            .await
            .unwrap();
        assert_eq!(same.turma.ano_letivo(), "2025/2");

        let renamed = turmas
            .update(a.turma.id(), update_request("Espanhol", 101), &cancel)
            .await
            .unwrap();
        assert_eq!(renamed.turma.id(), a.turma.id());
        assert_eq!(renamed.turma.idioma(), "Espanhol");

        let missing = turmas
            .update(TurmaId::new(999), update_request("Francês", 1), &cancel)
            .await;
        assert!(matches!(missing, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_vagas_restantes_round_trip() {
        let (alunos, turmas) = school_services();
        let cancel = CancellationToken::new();

        let created = turmas.create(turma_request("Inglês", 101), &cancel).await.unwrap();
        let id = created.turma.id();
        assert_eq!(created.vagas_restantes(), 5);

        for seed in 1..=5 {
            let nome = format!("Aluno {}", seed);
            alunos
                .create(aluno_request(&nome, seed, &[("Inglês", 101)]), &cancel)
                .await
                .unwrap();
        }

        let full = turmas.get(id, &cancel).await.unwrap().unwrap();
        assert_eq!(full.vagas_restantes(), 0);
        assert!(full.lotada());

        let sexto = alunos
            .create(aluno_request("Sexto", 6, &[("Espanhol", 1)]), &cancel)
            .await;
        assert!(matches!(sexto, Err(DomainError::NotFound { .. })));

        turmas.create(turma_request("Espanhol", 1), &cancel).await.unwrap();
        let sexto = alunos
            .create(aluno_request("Sexto", 6, &[("Espanhol", 1)]), &cancel)
            .await
            .unwrap();
        let result = alunos
            .matricular(sexto.aluno.id(), TurmaRefRequest::new("Inglês", 101), &cancel)
            .await;
        assert!(matches!(result, Err(DomainError::InvalidOperation { .. })));
    }

    #[tokio::test]
    async fn test_delete() {
        let (alunos, turmas) = school_services();
        let cancel = CancellationToken::new();

        let ocupada = turmas.create(turma_request("Inglês", 101), &cancel).await.unwrap();
        let vazia = turmas.create(turma_request("Inglês", 102), &cancel).await.unwrap();
        alunos
            .create(aluno_request("Maria", 1, &[("Inglês", 101)]), &cancel)
            .await
            .unwrap();

        let result = turmas.delete(ocupada.turma.id(), &cancel).await;
        assert!(matches!(result, Err(DomainError::InvalidOperation { .. })));

        assert_ok!(turmas.delete(vazia.turma.id(), &cancel).await);
        assert!(turmas.get(vazia.turma.id(), &cancel).await.unwrap().is_none());

        let result = turmas.delete(vazia.turma.id(), &cancel).await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_list_sorting() {
        let (_, turmas) = school_services();
        let cancel = CancellationToken::new();

        for (idioma, numero) in [("Inglês", 102), ("Espanhol", 5), ("Inglês", 101), ("Alemão", 9)] {
            turmas.create(turma_request(idioma, numero), &cancel).await.unwrap();
        }

        let all: Vec<(String, i32)> = turmas
            .list(&cancel)
            .await
            .unwrap()
            .iter()
            .map(|t| (t.turma.idioma().to_string(), t.turma.numero()))
            .collect();
        assert_eq!(
            all,
            vec![
                ("Alemão".to_string(), 9),
                ("Espanhol".to_string(), 5),
                ("Inglês".to_string(), 101),
                ("Inglês".to_string(), 102),
            ]
        );

        let ingles: Vec<i32> = turmas
            .list_by_idioma("INGLÊS", &cancel)
            .await
            .unwrap()
            .iter()
            .map(|t| t.turma.numero())
            .collect();
        assert_eq!(ingles, vec![101, 102]);

        assert!(turmas.list_by_idioma("Francês", &cancel).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_alunos_da_turma() {
        let (alunos, turmas) = school_services();
        let cancel = CancellationToken::new();

        turmas.create(turma_request("Inglês", 101), &cancel).await.unwrap();
        turmas.create(turma_request("Espanhol", 201), &cancel).await.unwrap();
        let matriculas = [
            (1, "Carla", ("Inglês", 101)),
            (2, "Ana", ("Inglês", 101)),
            (3, "Bia", ("Espanhol", 201)),
        ];
        for (seed, nome, turma) in matriculas {
            alunos
                .create(aluno_request(nome, seed, &[turma]), &cancel)
                .await
                .unwrap();
        }

        let nomes: Vec<String> = turmas
            .alunos_da_turma("inglês", 101, &cancel)
            .await
            .unwrap()
            .iter()
            .map(|a| a.nome().to_string())
            .collect();
        assert_eq!(nomes, vec!["Ana", "Carla"]);

        let missing = turmas.alunos_da_turma("Francês", 1, &cancel).await;
        assert!(matches!(missing, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_alunos_da_turma_with_impossible_identity_is_not_found() {
        let (_, turmas) = school_services();
        let cancel = CancellationToken::new();
        turmas.create(turma_request("Inglês", 101), &cancel).await.unwrap();

        for (idioma, numero) in [("Inglês", 0), ("Inglês", -1), ("   ", 101)] {
            let result = turmas.alunos_da_turma(idioma, numero, &cancel).await;
            assert!(
                matches!(result, Err(DomainError::NotFound { .. })),
                "{:?} {}",
                idioma,
                numero
            );
        }

        let longo = "x".repeat(80);
        let result = turmas.alunos_da_turma(&longo, 101, &cancel).await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_list_sorts_accented_and_lowercase_idiomas() {
        let (alunos, turmas) = school_services();
        let cancel = CancellationToken::new();

        for (idioma, numero) in [("Inglês", 101), ("alemão", 1), ("Árabe", 3), ("espanhol", 2)] {
            turmas.create(turma_request(idioma, numero), &cancel).await.unwrap();
        }

        let idiomas: Vec<String> = turmas
            .list(&cancel)
            .await
            .unwrap()
            .iter()
            .map(|t| t.turma.idioma().to_string())
            .collect();
        assert_eq!(idiomas, vec!["alemão", "Árabe", "espanhol", "Inglês"]);

        for (seed, nome) in [(1, "Bruno"), (2, "Ágata"), (3, "carla")] {
            alunos
                .create(aluno_request(nome, seed, &[("Inglês", 101)]), &cancel)
                .await
                .unwrap();
        }

        let nomes: Vec<String> = turmas
            .alunos_da_turma("INGLÊS", 101, &cancel)
            .await
            .unwrap()
            .iter()
            .map(|a| a.nome().to_string())
            .collect();
        assert_eq!(nomes, vec!["Ágata", "Bruno", "carla"]);
    }
}
