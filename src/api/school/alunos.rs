//! Student endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::{Aluno, AlunoDetalhe, AlunoId};
use crate::infrastructure::services::{CreateAlunoRequest, TurmaRefRequest, UpdateAlunoRequest};

use super::turmas::TurmaResumoResponse;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurmaRefDto {
    pub idioma: String,
    pub numero: i32,
}

impl From<TurmaRefDto> for TurmaRefRequest {
    fn from(dto: TurmaRefDto) -> Self {
        TurmaRefRequest::new(dto.idioma, dto.numero)
    }
}

/// Body of POST and PUT /api/alunos
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlunoApiRequest {
    pub nome: String,
    pub email: String,
    pub cpf: String,
    pub idade: i32,
    #[serde(default)]
    pub turmas: Vec<TurmaRefDto>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlunoResponse {
    pub id: i64,
    pub nome: String,
    pub email: String,
    pub cpf: String,
    pub idade: i32,
}

impl From<&Aluno> for AlunoResponse {
    fn from(aluno: &Aluno) -> Self {
        Self {
            id: aluno.id().value(),
            nome: aluno.nome().to_string(),
            email: aluno.email().to_string(),
            cpf: aluno.cpf().to_string(),
            idade: aluno.idade(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlunoDetalheResponse {
    pub id: i64,
    pub nome: String,
    pub email: String,
    pub cpf: String,
    pub idade: i32,
    pub turmas: Vec<TurmaResumoResponse>,
}

impl From<&AlunoDetalhe> for AlunoDetalheResponse {
    fn from(detalhe: &AlunoDetalhe) -> Self {
        let aluno = &detalhe.aluno;

        Self {
            id: aluno.id().value(),
            nome: aluno.nome().to_string(),
            email: aluno.email().to_string(),
            cpf: aluno.cpf().to_string(),
            idade: aluno.idade(),
            turmas: detalhe.turmas.iter().map(TurmaResumoResponse::from).collect(),
        }
    }
}

/// GET /api/alunos
pub async fn list_alunos(
    State(state): State<AppState>,
) -> Result<Json<Vec<AlunoResponse>>, ApiError> {
    debug!("Listing alunos");

    let alunos = state.aluno_service.list(&state.request_token()).await?;

    Ok(Json(alunos.iter().map(AlunoResponse::from).collect()))
}

/// GET /api/alunos/com-turmas
pub async fn list_alunos_com_turmas(
    State(state): State<AppState>,
) -> Result<Json<Vec<AlunoDetalheResponse>>, ApiError> {
    debug!("Listing alunos with turmas");

    let detalhes = state
        .aluno_service
        .list_com_turmas(&state.request_token())
        .await?;

    Ok(Json(detalhes.iter().map(AlunoDetalheResponse::from).collect()))
}

/// GET /api/alunos/{id}
pub async fn get_aluno(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<AlunoDetalheResponse>, ApiError> {
    debug!(aluno_id = id, "Getting aluno");

    let detalhe = state
        .aluno_service
        .get(AlunoId::new(id), &state.request_token())
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Aluno {} não encontrado", id)))?;

    Ok(Json(AlunoDetalheResponse::from(&detalhe)))
}

/// POST /api/alunos
pub async fn create_aluno(
    State(state): State<AppState>,
    Json(request): Json<AlunoApiRequest>,
) -> Result<(StatusCode, Json<AlunoDetalheResponse>), ApiError> {
    debug!(nome = %request.nome, turmas = request.turmas.len(), "Creating aluno");

    let service_request = CreateAlunoRequest {
        nome: request.nome,
        email: request.email,
        cpf: request.cpf,
        idade: request.idade,
        turmas: request.turmas.into_iter().map(TurmaRefRequest::from).collect(),
    };

    let detalhe = state
        .aluno_service
        .create(service_request, &state.request_token())
        .await?;

    Ok((StatusCode::CREATED, Json(AlunoDetalheResponse::from(&detalhe))))
}

/// PUT /api/alunos/{id}
pub async fn update_aluno(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<AlunoApiRequest>,
) -> Result<Json<AlunoDetalheResponse>, ApiError> {
    debug!(aluno_id = id, "Updating aluno");

    let service_request = UpdateAlunoRequest {
        nome: request.nome,
        email: request.email,
        cpf: request.cpf,
        idade: request.idade,
        turmas: request.turmas.into_iter().map(TurmaRefRequest::from).collect(),
    };

    let detalhe = state
        .aluno_service
        .update(AlunoId::new(id), service_request, &state.request_token())
        .await?;

    Ok(Json(AlunoDetalheResponse::from(&detalhe)))
}

/// DELETE /api/alunos/{id}
pub async fn delete_aluno(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    debug!(aluno_id = id, "Deleting aluno");

    state
        .aluno_service
        .delete(AlunoId::new(id), &state.request_token())
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/alunos/{id}/matriculas
pub async fn matricular(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(turma): Json<TurmaRefDto>,
) -> Result<Json<AlunoDetalheResponse>, ApiError> {
    debug!(aluno_id = id, idioma = %turma.idioma, numero = turma.numero, "Enrolling aluno");

    let detalhe = state
        .aluno_service
        .matricular(AlunoId::new(id), turma.into(), &state.request_token())
        .await?;

    Ok(Json(AlunoDetalheResponse::from(&detalhe)))
}

/// DELETE /api/alunos/{id}/matriculas
pub async fn desmatricular(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(turma): Json<TurmaRefDto>,
) -> Result<Json<AlunoDetalheResponse>, ApiError> {
    debug!(aluno_id = id, idioma = %turma.idioma, numero = turma.numero, "Unenrolling aluno");

    let detalhe = state
        .aluno_service
        .desmatricular(AlunoId::new(id), turma.into(), &state.request_token())
        .await?;

    Ok(Json(AlunoDetalheResponse::from(&detalhe)))
}
