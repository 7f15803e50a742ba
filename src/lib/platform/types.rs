use std::fmt;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::networking::v1::Ingress;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MANAGED_LABEL: &str = "dc-agent.io/managed";
pub const TASK_LABEL: &str = "dc-agent.io/task";
pub const RESOURCE_LABEL: &str = "dc-agent.io/resource";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    Deployment,
    Service,
    Ingress,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Deployment => write!(f, "deployment"),
            ResourceKind::Service => write!(f, "service"),
            ResourceKind::Ingress => write!(f, "ingress"),
        }
    }
}

/// A platform object addressed by kind and name inside the agent's namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    pub name: String,
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.name)
    }
}

/// One platform-manageable unit derived from a manifest.
#[derive(Debug, Clone, PartialEq)]
pub enum ManagedResource {
    Deployment(Deployment),
    Service(Service),
    Ingress(Ingress),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    #[error("{kind} {name} not found")]
    NotFound { kind: ResourceKind, name: String },
    #[error("{kind} {name}: {message}")]
    Api {
        kind: ResourceKind,
        name: String,
        message: String,
    },
    #[error("{kind} {name} belongs to task {owner}")]
    Conflict {
        kind: ResourceKind,
        name: String,
        owner: String,
    },
    #[error("platform client: {0}")]
    Client(String),
}

impl PlatformError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, PlatformError::NotFound { .. })
    }
}

/// Capability surface of the container platform, scoped to one namespace.
///
/// Implementations must report a missing object as [`PlatformError::NotFound`];
/// the orchestrator's create fallback depends on it.
#[async_trait]
pub trait Platform: Send + Sync {
    async fn get(&self, target: &ResourceRef) -> Result<ManagedResource, PlatformError>;

    async fn create(&self, resource: &ManagedResource) -> Result<(), PlatformError>;

    async fn update(&self, resource: &ManagedResource) -> Result<(), PlatformError>;

    async fn delete(&self, target: &ResourceRef) -> Result<(), PlatformError>;

    async fn delete_collection(
        &self,
        kind: ResourceKind,
        selector: &str,
    ) -> Result<(), PlatformError>;

    async fn list(
        &self,
        kind: ResourceKind,
        selector: &str,
    ) -> Result<Vec<ManagedResource>, PlatformError>;
}
