//! Class endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::{Aluno, Turma, TurmaComVagas, TurmaId};
use crate::infrastructure::services::{CreateTurmaRequest, UpdateTurmaRequest};

/// Body of POST and PUT /api/turmas
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurmaApiRequest {
    pub idioma: String,
    pub numero: i32,
    pub ano_letivo: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurmaResponse {
    pub id: i64,
    pub idioma: String,
    pub numero: i32,
    pub ano_letivo: String,
    pub vagas_restantes: usize,
}

impl From<&TurmaComVagas> for TurmaResponse {
    fn from(item: &TurmaComVagas) -> Self {
        Self {
            id: item.turma.id().value(),
            idioma: item.turma.idioma().to_string(),
            numero: item.turma.numero(),
            ano_letivo: item.turma.ano_letivo().to_string(),
            vagas_restantes: item.vagas_restantes(),
        }
    }
}

/// A class as listed inside a student detail
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurmaResumoResponse {
    pub id: i64,
    pub idioma: String,
    pub numero: i32,
    pub ano_letivo: String,
}

impl From<&Turma> for TurmaResumoResponse {
    fn from(turma: &Turma) -> Self {
        Self {
            id: turma.id().value(),
            idioma: turma.idioma().to_string(),
            numero: turma.numero(),
            ano_letivo: turma.ano_letivo().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlunoDaTurmaResponse {
    pub aluno_id: i64,
    pub nome: String,
    pub email: String,
    pub cpf: String,
    pub idade: i32,
}

impl From<&Aluno> for AlunoDaTurmaResponse {
    fn from(aluno: &Aluno) -> Self {
        Self {
            aluno_id: aluno.id().value(),
            nome: aluno.nome().to_string(),
            email: aluno.email().to_string(),
            cpf: aluno.cpf().to_string(),
            idade: aluno.idade(),
        }
    }
}

/// GET /api/turmas
pub async fn list_turmas(
    State(state): State<AppState>,
) -> Result<Json<Vec<TurmaResponse>>, ApiError> {
    debug!("Listing turmas");

    let turmas = state.turma_service.list(&state.request_token()).await?;

    Ok(Json(turmas.iter().map(TurmaResponse::from).collect()))
}

/// GET /api/turmas/idioma/{idioma}
pub async fn list_turmas_by_idioma(
    State(state): State<AppState>,
    Path(idioma): Path<String>,
) -> Result<Json<Vec<TurmaResponse>>, ApiError> {
    debug!(idioma = %idioma, "Listing turmas by idioma");

    let turmas = state
        .turma_service
        .list_by_idioma(&idioma, &state.request_token())
        .await?;

    Ok(Json(turmas.iter().map(TurmaResponse::from).collect()))
}

/// GET /api/turmas/{id}
pub async fn get_turma(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<TurmaResponse>, ApiError> {
    debug!(turma_id = id, "Getting turma");

    let turma = state
        .turma_service
        .get(TurmaId::new(id), &state.request_token())
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Turma {} não encontrada", id)))?;

    Ok(Json(TurmaResponse::from(&turma)))
}

/// POST /api/turmas
pub async fn create_turma(
    State(state): State<AppState>,
    Json(request): Json<TurmaApiRequest>,
) -> Result<(StatusCode, Json<TurmaResponse>), ApiError> {
    debug!(idioma = %request.idioma, numero = request.numero, "Creating turma");

    let service_request = CreateTurmaRequest {
        idioma: request.idioma,
        numero: request.numero,
        ano_letivo: request.ano_letivo,
    };

    let turma = state
        .turma_service
        .create(service_request, &state.request_token())
        .await?;

    Ok((StatusCode::CREATED, Json(TurmaResponse::from(&turma))))
}

/// PUT /api/turmas/{id}
pub async fn update_turma(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<TurmaApiRequest>,
) -> Result<Json<TurmaResponse>, ApiError> {
    debug!(turma_id = id, "Updating turma");

    let service_request = UpdateTurmaRequest {
        idioma: request.idioma,
        numero: request.numero,
        ano_letivo: request.ano_letivo,
    };

    let turma = state
        .turma_service
        .update(TurmaId::new(id), service_request, &state.request_token())
        .await?;

    Ok(Json(TurmaResponse::from(&turma)))
}

/// DELETE /api/turmas/{id}
pub async fn delete_turma(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    debug!(turma_id = id, "Deleting turma");

    state
        .turma_service
        .delete(TurmaId::new(id), &state.request_token())
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/turmas/{idioma}/{numero}/alunos
pub async fn list_alunos_da_turma(
    State(state): State<AppState>,
    Path((idioma, numero)): Path<(String, i32)>,
) -> Result<Json<Vec<AlunoDaTurmaResponse>>, ApiError> {
    debug!(idioma = %idioma, numero, "Listing alunos da turma");

    let alunos = state
        .turma_service
        .alunos_da_turma(&idioma, numero, &state.request_token())
        .await?;

    Ok(Json(alunos.iter().map(AlunoDaTurmaResponse::from).collect()))
}
