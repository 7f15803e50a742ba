use std::collections::BTreeMap;
use std::sync::Arc;

use k8s_openapi::api::apps::v1::Deployment;
use tracing::debug;

use super::saga;
use super::types::{MeteringSnapshot, Orchestrator, OrchestratorError, TaskUsage};
use crate::lib::platform::resources::{
    ResourceBuilder, managed_selector, parse_quantity, task_selector,
};
use crate::lib::platform::types::{ManagedResource, Platform, ResourceKind};
use crate::lib::tasks::manifest::resource_name;
use crate::lib::tasks::types::{ExposedPort, ManifestError, TaskDefaults, UpdateParams};

impl Orchestrator {
    pub fn new(
        platform: Arc<dyn Platform>,
        namespace: &str,
        ingress_host: Option<String>,
        defaults: TaskDefaults,
    ) -> Self {
        Orchestrator {
            platform,
            namespace: namespace.to_string(),
            ingress_host,
            defaults,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn builder<'a>(&'a self, task: &'a str, replicas: i32) -> ResourceBuilder<'a> {
        ResourceBuilder {
            task,
            namespace: &self.namespace,
            ingress_host: self.ingress_host.as_deref(),
            replicas,
        }
    }

    pub async fn apply_all(&self, resources: &[ManagedResource]) -> Result<(), OrchestratorError> {
        saga::apply_all(self.platform.as_ref(), resources).await
    }

    /// Applies one capability set per image; all of them share the task name.
    pub async fn apply(&self, name: &str, images: &[String]) -> Result<(), OrchestratorError> {
        if images.is_empty() {
            return Err(ManifestError::NoImage(name.to_string()).into());
        }

        let builder = self.builder(name, self.defaults.replicas);
        let mut resources = Vec::new();
        for (index, image) in images.iter().enumerate() {
            let manifest = self.defaults.manifest(&resource_name(name, index), image);
            resources.extend(builder.build(&manifest)?);
        }

        debug!("apply task {} as {} resources", name, resources.len());
        self.apply_all(&resources).await
    }

    /// Re-applies the primary capability set of an existing task.
    pub async fn update(
        &self,
        name: &str,
        image: &str,
        params: UpdateParams,
    ) -> Result<(), OrchestratorError> {
        let mut manifest = self.defaults.manifest(&resource_name(name, 0), image);
        manifest.expose = vec![ExposedPort {
            port: params.port,
            external_port: params.external_port,
        }];

        let resources = self.builder(name, params.replicas).build(&manifest)?;
        self.apply_all(&resources).await
    }

    /// Deletes everything labelled with the task; a missing task is already cancelled.
    pub async fn cancel(&self, name: &str) -> Result<(), OrchestratorError> {
        let selector = task_selector(name);
        for kind in [
            ResourceKind::Ingress,
            ResourceKind::Service,
            ResourceKind::Deployment,
        ] {
            match self.platform.delete_collection(kind, &selector).await {
                Ok(()) => {}
                Err(err) if err.is_not_found() => debug!("no {} left for task {}", kind, name),
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }

    /// One `Task:<name>,Image:<images>,Replicas:<n>` line per managed task.
    pub async fn list(&self) -> Result<Vec<String>, OrchestratorError> {
        let mut tasks: BTreeMap<String, (Vec<String>, i32)> = BTreeMap::new();
        for resource in self.managed_deployments().await? {
            let ManagedResource::Deployment(deployment) = &resource else {
                continue;
            };
            let task = resource.task().unwrap_or(resource.name()).to_string();
            let entry = tasks.entry(task).or_default();
            let Some(spec) = &deployment.spec else {
                continue;
            };
            entry.1 += spec.replicas.unwrap_or(1);
            entry.0.extend(
                spec.template
                    .spec
                    .iter()
                    .flat_map(|pod| pod.containers.iter())
                    .filter_map(|container| container.image.clone()),
            );
        }

        Ok(tasks
            .into_iter()
            .map(|(task, (images, replicas))| {
                format!("Task:{},Image:{},Replicas:{}", task, images.join(","), replicas)
            })
            .collect())
    }

    /// Resource limits currently declared per task, recomputed from the platform.
    pub async fn metering(&self) -> Result<MeteringSnapshot, OrchestratorError> {
        let mut tasks: BTreeMap<String, TaskUsage> = BTreeMap::new();
        for resource in self.managed_deployments().await? {
            if let ManagedResource::Deployment(deployment) = &resource {
                let task = resource.task().unwrap_or(resource.name()).to_string();
                let usage = deployment_usage(deployment);
                let total = tasks.entry(task).or_default();
                total.replicas += usage.replicas;
                total.cpu_milli += usage.cpu_milli;
                total.memory_bytes += usage.memory_bytes;
                total.disk_bytes += usage.disk_bytes;
            }
        }

        Ok(MeteringSnapshot {
            namespace: self.namespace.clone(),
            tasks,
        })
    }

    async fn managed_deployments(&self) -> Result<Vec<ManagedResource>, OrchestratorError> {
        Ok(self
            .platform
            .list(ResourceKind::Deployment, &managed_selector())
            .await?)
    }
}

fn deployment_usage(deployment: &Deployment) -> TaskUsage {
    let Some(spec) = &deployment.spec else {
        return TaskUsage::default();
    };
    let replicas = u64::try_from(spec.replicas.unwrap_or(1)).unwrap_or(0);
    let mut usage = TaskUsage {
        replicas,
        ..Default::default()
    };

    let limits = spec
        .template
        .spec
        .iter()
        .flat_map(|pod| pod.containers.iter())
        .filter_map(|container| container.resources.as_ref()?.limits.as_ref());
    for limits in limits {
        let quantity = |name: &str| {
            limits
                .get(name)
                .and_then(|quantity| parse_quantity(&quantity.0))
                .map_or(0, |value| value.round() as u64)
        };
        let cpu_milli = limits
            .get("cpu")
            .and_then(|quantity| parse_quantity(&quantity.0))
            .map_or(0, |cores| (cores * 1000.0).round() as u64);
        usage.cpu_milli += cpu_milli * replicas;
        usage.memory_bytes += quantity("memory") * replicas;
        usage.disk_bytes += quantity("ephemeral-storage") * replicas;
    }

    usage
}
