use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;

use crate::lib::hub::types::StreamState;
use crate::lib::orchestrator::types::{Orchestrator, OrchestratorError};

/// Read-only HTTP view of the agent.
pub struct StatusServer {
    pub orchestrator: Arc<Orchestrator>,
    pub hub_state: watch::Receiver<StreamState>,
    pub address: String,
}

#[derive(Clone)]
pub struct StatusState {
    pub orchestrator: Arc<Orchestrator>,
    pub hub_state: watch::Receiver<StreamState>,
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub hub: StreamState,
}

/// Platform failure surfaced as `502 Bad Gateway`.
#[derive(Debug)]
pub struct ApiError(pub OrchestratorError);
