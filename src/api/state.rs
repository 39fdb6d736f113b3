//! Application state shared by all handlers

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::domain::storage::SchoolStore;
use crate::infrastructure::services::{AlunoService, TurmaService};

#[derive(Clone)]
pub struct AppState {
    pub aluno_service: AlunoService,
    pub turma_service: TurmaService,
    pub store: Arc<dyn SchoolStore>,
    /// Cancelled when the server begins shutting down
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(store: Arc<dyn SchoolStore>, shutdown: CancellationToken) -> Self {
        Self {
            aluno_service: AlunoService::new(store.clone()),
            turma_service: TurmaService::new(store.clone()),
            store,
            shutdown,
        }
    }

    /// Token for one request; cancelled together with the server
    pub fn request_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("shutdown", &self.shutdown.is_cancelled())
            .finish_non_exhaustive()
    }
}
