use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::lib::platform::types::{Platform, PlatformError, ResourceRef};
use crate::lib::tasks::types::{ManifestError, TaskDefaults};

/// Applies task intents as sets of platform resources.
///
/// Only the dispatcher mutates through it; listing and metering are
/// read-only and may run concurrently.
pub struct Orchestrator {
    pub(super) platform: Arc<dyn Platform>,
    pub(super) namespace: String,
    pub(super) ingress_host: Option<String>,
    pub(super) defaults: TaskDefaults,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompensationAction {
    Delete,
}

/// Reversing step recorded for a resource created during the current attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compensation {
    pub action: CompensationAction,
    pub target: ResourceRef,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaskUsage {
    pub replicas: u64,
    pub cpu_milli: u64,
    pub memory_bytes: u64,
    pub disk_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeteringSnapshot {
    pub namespace: String,
    pub tasks: BTreeMap<String, TaskUsage>,
}

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error(transparent)]
    Platform(#[from] PlatformError),
    #[error("rolled back: {cause}")]
    RolledBack {
        cause: PlatformError,
        /// Resources deleted during rollback, in execution order.
        compensated: Vec<ResourceRef>,
    },
    #[error("rollback: {}: {cause}", join_errors(.failures))]
    RollbackIncomplete {
        cause: PlatformError,
        failures: Vec<PlatformError>,
    },
}

fn join_errors(errors: &[PlatformError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
