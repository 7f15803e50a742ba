use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Descriptor of how to run one container of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestService {
    pub name: String,
    pub image: String,
    pub args: Vec<String>,
    /// `KEY` or `KEY=VALUE` entries, in order.
    pub env: Vec<String>,
    pub unit: ResourceUnit,
    pub expose: Vec<ExposedPort>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResourceUnit {
    pub cpu_milli: u32,
    pub memory_bytes: u64,
    pub disk_bytes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExposedPort {
    pub port: u16,
    /// 0 means "same as `port`".
    #[serde(default)]
    pub external_port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvEntry {
    pub name: String,
    pub value: String,
}

/// Values applied to tasks whose command carries nothing but a name and an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskDefaults {
    pub unit: ResourceUnit,
    pub port: u16,
    pub replicas: i32,
}

/// Scale and port applied by `TASK_UPDATE`. The hub protocol has no fields
/// for these, so they come from local configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateParams {
    pub replicas: i32,
    pub port: u16,
    pub external_port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManifestError {
    #[error("environment entry {0:?} has an empty name")]
    EmptyEnvName(String),
    #[error("task {0} has no image")]
    NoImage(String),
    #[error("invalid port 0 exposed by {0}")]
    InvalidPort(String),
}
