use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sysinfo::System;
use thiserror::Error;

use crate::lib::orchestrator::types::{MeteringSnapshot, Orchestrator, OrchestratorError};

/// Text the ledger returns when the same submission is already pending.
pub const DUPLICATE_MARKER: &str = "tx already exists in cache";

/// Submits key/value records to the ledger node.
#[async_trait]
pub trait LedgerReporter: Send + Sync {
    async fn broadcast(
        &self,
        endpoint: &str,
        ws_endpoint: &str,
        key: &str,
        payload: &[u8],
    ) -> Result<(), LedgerError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEndpoints {
    pub http: String,
    pub ws: String,
}

pub struct HttpLedgerReporter {
    pub(super) client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
pub(super) struct RpcResponse {
    pub(super) result: Option<BroadcastResult>,
    pub(super) error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
pub(super) struct BroadcastResult {
    #[serde(default)]
    pub(super) code: u32,
    #[serde(default)]
    pub(super) log: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct RpcError {
    pub(super) message: String,
    #[serde(default)]
    pub(super) data: Option<String>,
}

/// Node usage reported next to the task snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostStats {
    pub cpu_usage: f32,
    pub total_memory: u64,
    pub used_memory: u64,
    pub total_swap: u64,
    pub used_swap: u64,
    pub system_name: String,
    pub hostname: String,
    pub total_cpus: u64,
    pub disk_usage: f32,
}

/// Body of one ledger submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub data_center: String,
    pub snapshot: MeteringSnapshot,
    pub host: HostStats,
}

pub struct MeteringPublisher<R> {
    pub(super) orchestrator: Arc<Orchestrator>,
    pub(super) reporter: R,
    pub(super) dc_name: String,
    pub(super) ledger: LedgerEndpoints,
    pub(super) interval: Duration,
    pub(super) system: System,
    pub(super) announced: bool,
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger request: {0}")]
    Http(#[from] reqwest::Error),
    #[error("encode ledger tx: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("ledger rpc: {0}")]
    Rpc(String),
    #[error("ledger rejected tx (code {code}): {log}")]
    Rejected { code: u32, log: String },
}

impl LedgerError {
    pub fn is_duplicate(&self) -> bool {
        self.to_string().to_lowercase().contains(DUPLICATE_MARKER)
    }
}

#[derive(Debug, Error)]
pub enum MeteringError {
    #[error("get metering: {0}")]
    Snapshot(#[from] OrchestratorError),
    #[error("encode metering: {0}")]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
