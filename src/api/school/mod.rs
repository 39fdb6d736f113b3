//! School API: students, classes and enrollments

pub mod alunos;
pub mod turmas;

use axum::{
    routing::{get, post},
    Router,
};

use super::state::AppState;

/// Routes mounted under `/api`
///
/// The second segment of `/turmas/{turma}` is a class id, while in
/// `/turmas/{turma}/{numero}/alunos` it is the class idioma.
pub fn create_school_router() -> Router<AppState> {
    Router::new()
        // Students
        .route("/alunos", get(alunos::list_alunos).post(alunos::create_aluno))
        .route("/alunos/com-turmas", get(alunos::list_alunos_com_turmas))
        .route(
            "/alunos/{id}",
            get(alunos::get_aluno)
                .put(alunos::update_aluno)
                .delete(alunos::delete_aluno),
        )
        .route(
            "/alunos/{id}/matriculas",
            post(alunos::matricular).delete(alunos::desmatricular),
        )
        // Classes
        .route("/turmas", get(turmas::list_turmas).post(turmas::create_turma))
        .route("/turmas/idioma/{idioma}", get(turmas::list_turmas_by_idioma))
        .route(
            "/turmas/{turma}",
            get(turmas::get_turma)
                .put(turmas::update_turma)
                .delete(turmas::delete_turma),
        )
        .route(
            "/turmas/{turma}/{numero}/alunos",
            get(turmas::list_alunos_da_turma),
        )
}
