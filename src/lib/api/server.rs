use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State as AxumState,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};

use super::types::{ApiError, Health, StatusServer, StatusState};
use crate::lib::hub::types::StreamState;
use crate::lib::orchestrator::types::{MeteringSnapshot, Orchestrator, OrchestratorError};

impl From<OrchestratorError> for ApiError {
    fn from(err: OrchestratorError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        warn!("status request fail: {}", self.0);
        (StatusCode::BAD_GATEWAY, self.0.to_string()).into_response()
    }
}

impl StatusServer {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        hub_state: watch::Receiver<StreamState>,
        address: &str,
    ) -> Self {
        Self {
            orchestrator,
            hub_state,
            address: address.to_string(),
        }
    }

    async fn get_tasks(AxumState(state): AxumState<StatusState>) -> Result<Json<Vec<String>>, ApiError> {
        Ok(Json(state.orchestrator.list().await?))
    }

    async fn get_metering(
        AxumState(state): AxumState<StatusState>,
    ) -> Result<Json<MeteringSnapshot>, ApiError> {
        Ok(Json(state.orchestrator.metering().await?))
    }

    async fn get_health(AxumState(state): AxumState<StatusState>) -> Json<Health> {
        let hub = *state.hub_state.borrow();
        Json(Health { hub })
    }

    pub fn router(&self) -> Router {
        let state = StatusState {
            orchestrator: self.orchestrator.clone(),
            hub_state: self.hub_state.clone(),
        };

        Router::new()
            .route("/tasks", get(StatusServer::get_tasks))
            .route("/metering", get(StatusServer::get_metering))
            .route("/health", get(StatusServer::get_health))
            .with_state(state)
    }

    pub async fn start_server(self) -> std::io::Result<()> {
        let listener = TcpListener::bind(&self.address).await?;
        info!("status server listening on {}", listener.local_addr()?);
        axum::serve(listener, self.router()).await
    }
}
