use std::path::Path;

use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::{Api, DeleteParams, ListParams, Patch, PatchParams, PostParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tracing::{debug, info};

use super::types::{ManagedResource, Platform, PlatformError, ResourceKind, ResourceRef};

/// Kubernetes backend of the [`Platform`] capability surface.
#[derive(Clone)]
pub struct KubePlatform {
    client: Client,
    namespace: String,
}

impl KubePlatform {
    pub fn new(client: Client, namespace: &str) -> Self {
        KubePlatform {
            client,
            namespace: namespace.to_string(),
        }
    }

    /// Connects with an explicit kubeconfig, or infers in-cluster / default config.
    pub async fn connect(kubeconfig: Option<&Path>, namespace: &str) -> Result<Self, PlatformError> {
        let config = match kubeconfig {
            Some(path) => {
                let kubeconfig = Kubeconfig::read_from(path)
                    .map_err(|e| PlatformError::Client(format!("read {}: {}", path.display(), e)))?;
                Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                    .await
                    .map_err(|e| PlatformError::Client(e.to_string()))?
            }
            None => Config::infer()
                .await
                .map_err(|e| PlatformError::Client(e.to_string()))?,
        };

        info!("Kubernetes API at {}, namespace {}", config.cluster_url, namespace);
        let client = Client::try_from(config).map_err(|e| PlatformError::Client(e.to_string()))?;
        Ok(Self::new(client, namespace))
    }

    fn api<K>(&self) -> Api<K>
    where
        K: kube::Resource<Scope = NamespaceResourceScope>,
        <K as kube::Resource>::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), &self.namespace)
    }
}

/// Maps API-server 404s to the explicit not-found tag.
fn classify(kind: ResourceKind, name: &str, err: kube::Error) -> PlatformError {
    match err {
        kube::Error::Api(response) if response.code == 404 => PlatformError::NotFound {
            kind,
            name: name.to_string(),
        },
        other => PlatformError::Api {
            kind,
            name: name.to_string(),
            message: other.to_string(),
        },
    }
}

#[async_trait]
impl Platform for KubePlatform {
    async fn get(&self, target: &ResourceRef) -> Result<ManagedResource, PlatformError> {
        let name = target.name.as_str();
        let result = match target.kind {
            ResourceKind::Deployment => self
                .api::<Deployment>()
                .get(name)
                .await
                .map(ManagedResource::Deployment),
            ResourceKind::Service => self
                .api::<Service>()
                .get(name)
                .await
                .map(ManagedResource::Service),
            ResourceKind::Ingress => self
                .api::<Ingress>()
                .get(name)
                .await
                .map(ManagedResource::Ingress),
        };
        result.map_err(|err| classify(target.kind, name, err))
    }

    async fn create(&self, resource: &ManagedResource) -> Result<(), PlatformError> {
        let params = PostParams::default();
        let result = match resource {
            ManagedResource::Deployment(object) => {
                self.api::<Deployment>().create(&params, object).await.map(drop)
            }
            ManagedResource::Service(object) => {
                self.api::<Service>().create(&params, object).await.map(drop)
            }
            ManagedResource::Ingress(object) => {
                self.api::<Ingress>().create(&params, object).await.map(drop)
            }
        };
        debug!("create {} ok={}", resource.reference(), result.is_ok());
        result.map_err(|err| classify(resource.kind(), resource.name(), err))
    }

    async fn update(&self, resource: &ManagedResource) -> Result<(), PlatformError> {
        let params = PatchParams::default();
        let name = resource.name();
        let result = match resource {
            ManagedResource::Deployment(object) => self
                .api::<Deployment>()
                .patch(name, &params, &Patch::Merge(object))
                .await
                .map(drop),
            ManagedResource::Service(object) => self
                .api::<Service>()
                .patch(name, &params, &Patch::Merge(object))
                .await
                .map(drop),
            ManagedResource::Ingress(object) => self
                .api::<Ingress>()
                .patch(name, &params, &Patch::Merge(object))
                .await
                .map(drop),
        };
        debug!("update {} ok={}", resource.reference(), result.is_ok());
        result.map_err(|err| classify(resource.kind(), name, err))
    }

    async fn delete(&self, target: &ResourceRef) -> Result<(), PlatformError> {
        let params = DeleteParams::foreground();
        let name = target.name.as_str();
        let result = match target.kind {
            ResourceKind::Deployment => self.api::<Deployment>().delete(name, &params).await.map(drop),
            ResourceKind::Service => self.api::<Service>().delete(name, &params).await.map(drop),
            ResourceKind::Ingress => self.api::<Ingress>().delete(name, &params).await.map(drop),
        };
        result.map_err(|err| classify(target.kind, name, err))
    }

    async fn delete_collection(
        &self,
        kind: ResourceKind,
        selector: &str,
    ) -> Result<(), PlatformError> {
        let params = DeleteParams::foreground();
        let list = ListParams::default().labels(selector);
        let result = match kind {
            ResourceKind::Deployment => self
                .api::<Deployment>()
                .delete_collection(&params, &list)
                .await
                .map(drop),
            ResourceKind::Service => self
                .api::<Service>()
                .delete_collection(&params, &list)
                .await
                .map(drop),
            ResourceKind::Ingress => self
                .api::<Ingress>()
                .delete_collection(&params, &list)
                .await
                .map(drop),
        };
        result.map_err(|err| classify(kind, selector, err))
    }

    async fn list(
        &self,
        kind: ResourceKind,
        selector: &str,
    ) -> Result<Vec<ManagedResource>, PlatformError> {
        let list = ListParams::default().labels(selector);
        let result: Result<Vec<ManagedResource>, kube::Error> = match kind {
            ResourceKind::Deployment => self.api::<Deployment>().list(&list).await.map(|objects| {
                objects
                    .items
                    .into_iter()
                    .map(ManagedResource::Deployment)
                    .collect()
            }),
            ResourceKind::Service => self.api::<Service>().list(&list).await.map(|objects| {
                objects.items.into_iter().map(ManagedResource::Service).collect()
            }),
            ResourceKind::Ingress => self.api::<Ingress>().list(&list).await.map(|objects| {
                objects.items.into_iter().map(ManagedResource::Ingress).collect()
            }),
        };
        result.map_err(|err| classify(kind, selector, err))
    }
}
