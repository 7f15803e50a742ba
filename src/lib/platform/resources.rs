use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EnvVar, PodSpec, PodTemplateSpec, ResourceRequirements, Service,
    ServicePort, ServiceSpec,
};
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, ServiceBackendPort,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

use super::types::{
    MANAGED_LABEL, ManagedResource, RESOURCE_LABEL, ResourceKind, ResourceRef, TASK_LABEL,
};
use crate::lib::tasks::types::{ManifestError, ManifestService};

pub fn managed_selector() -> String {
    format!("{}=true", MANAGED_LABEL)
}

pub fn task_selector(task: &str) -> String {
    format!("{}=true,{}={}", MANAGED_LABEL, TASK_LABEL, task)
}

impl ManagedResource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ManagedResource::Deployment(_) => ResourceKind::Deployment,
            ManagedResource::Service(_) => ResourceKind::Service,
            ManagedResource::Ingress(_) => ResourceKind::Ingress,
        }
    }

    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            ManagedResource::Deployment(object) => &object.metadata,
            ManagedResource::Service(object) => &object.metadata,
            ManagedResource::Ingress(object) => &object.metadata,
        }
    }

    pub fn name(&self) -> &str {
        self.metadata().name.as_deref().unwrap_or_default()
    }

    pub fn reference(&self) -> ResourceRef {
        ResourceRef {
            kind: self.kind(),
            name: self.name().to_string(),
        }
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.metadata()
            .labels
            .as_ref()
            .and_then(|labels| labels.get(key))
            .map(String::as_str)
    }

    /// Owning task, from the task label.
    pub fn task(&self) -> Option<&str> {
        self.label(TASK_LABEL)
    }
}

/// Builds the capability set of one manifest for one task.
#[derive(Debug, Clone, Copy)]
pub struct ResourceBuilder<'a> {
    pub task: &'a str,
    pub namespace: &'a str,
    pub ingress_host: Option<&'a str>,
    pub replicas: i32,
}

impl ResourceBuilder<'_> {
    /// Deployment, then Service when ports are exposed, then Ingress when an
    /// ingress host is configured as well.
    pub fn build(&self, manifest: &ManifestService) -> Result<Vec<ManagedResource>, ManifestError> {
        manifest.validate()?;

        let mut resources = vec![ManagedResource::Deployment(self.deployment(manifest)?)];
        if !manifest.expose.is_empty() {
            resources.push(ManagedResource::Service(self.service(manifest)));
            if let Some(host) = self.ingress_host {
                resources.push(ManagedResource::Ingress(self.ingress(manifest, host)));
            }
        }

        Ok(resources)
    }

    fn labels(&self, manifest: &ManifestService) -> BTreeMap<String, String> {
        BTreeMap::from([
            (MANAGED_LABEL.to_string(), "true".to_string()),
            (TASK_LABEL.to_string(), self.task.to_string()),
            (RESOURCE_LABEL.to_string(), manifest.name.clone()),
        ])
    }

    fn selector(&self, manifest: &ManifestService) -> BTreeMap<String, String> {
        BTreeMap::from([(RESOURCE_LABEL.to_string(), manifest.name.clone())])
    }

    fn metadata(&self, manifest: &ManifestService) -> ObjectMeta {
        ObjectMeta {
            name: Some(manifest.name.clone()),
            namespace: Some(self.namespace.to_string()),
            labels: Some(self.labels(manifest)),
            ..Default::default()
        }
    }

    fn container(&self, manifest: &ManifestService) -> Result<Container, ManifestError> {
        let env = manifest
            .env_entries()?
            .into_iter()
            .map(|entry| EnvVar {
                name: entry.name,
                value: (!entry.value.is_empty()).then_some(entry.value),
                ..Default::default()
            })
            .collect::<Vec<_>>();

        let ports = manifest
            .expose
            .iter()
            .map(|expose| ContainerPort {
                container_port: i32::from(expose.port),
                ..Default::default()
            })
            .collect::<Vec<_>>();

        let unit = manifest.unit;
        let mut limits = BTreeMap::new();
        if unit.cpu_milli > 0 {
            limits.insert("cpu".to_string(), Quantity(format!("{}m", unit.cpu_milli)));
        }
        if unit.memory_bytes > 0 {
            limits.insert("memory".to_string(), Quantity(unit.memory_bytes.to_string()));
        }
        if unit.disk_bytes > 0 {
            limits.insert(
                "ephemeral-storage".to_string(),
                Quantity(unit.disk_bytes.to_string()),
            );
        }

        Ok(Container {
            name: manifest.name.clone(),
            image: Some(manifest.image.clone()),
            args: (!manifest.args.is_empty()).then(|| manifest.args.clone()),
            env: (!env.is_empty()).then_some(env),
            ports: (!ports.is_empty()).then_some(ports),
            resources: (!limits.is_empty()).then(|| ResourceRequirements {
                limits: Some(limits),
                ..Default::default()
            }),
            ..Default::default()
        })
    }

    fn deployment(&self, manifest: &ManifestService) -> Result<Deployment, ManifestError> {
        Ok(Deployment {
            metadata: self.metadata(manifest),
            spec: Some(DeploymentSpec {
                replicas: Some(self.replicas),
                selector: LabelSelector {
                    match_labels: Some(self.selector(manifest)),
                    ..Default::default()
                },
                template: PodTemplateSpec {
                    metadata: Some(ObjectMeta {
                        labels: Some(self.labels(manifest)),
                        ..Default::default()
                    }),
                    spec: Some(PodSpec {
                        containers: vec![self.container(manifest)?],
                        ..Default::default()
                    }),
                },
                ..Default::default()
            }),
            ..Default::default()
        })
    }

    fn service(&self, manifest: &ManifestService) -> Service {
        let ports = manifest
            .expose
            .iter()
            .map(|expose| ServicePort {
                name: Some(format!("port-{}", expose.port)),
                port: i32::from(expose.effective_external_port()),
                target_port: Some(IntOrString::Int(i32::from(expose.port))),
                protocol: Some("TCP".to_string()),
                ..Default::default()
            })
            .collect();

        Service {
            metadata: self.metadata(manifest),
            spec: Some(ServiceSpec {
                selector: Some(self.selector(manifest)),
                ports: Some(ports),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn ingress(&self, manifest: &ManifestService, host: &str) -> Ingress {
        let port = manifest
            .expose
            .first()
            .map(|expose| i32::from(expose.effective_external_port()));

        Ingress {
            metadata: self.metadata(manifest),
            spec: Some(IngressSpec {
                rules: Some(vec![IngressRule {
                    host: Some(format!("{}.{}", manifest.name, host)),
                    http: Some(HTTPIngressRuleValue {
                        paths: vec![HTTPIngressPath {
                            path: Some("/".to_string()),
                            path_type: "Prefix".to_string(),
                            backend: IngressBackend {
                                service: Some(IngressServiceBackend {
                                    name: manifest.name.clone(),
                                    port: Some(ServiceBackendPort {
                                        number: port,
                                        ..Default::default()
                                    }),
                                }),
                                ..Default::default()
                            },
                        }],
                    }),
                }]),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

/// Parses a Kubernetes quantity (`500m`, `1Gi`, `2k`, `1e3`) into base units.
pub fn parse_quantity(quantity: &str) -> Option<f64> {
    const BINARY: [(&str, f64); 6] = [
        ("Ki", 1024.0),
        ("Mi", 1_048_576.0),
        ("Gi", 1_073_741_824.0),
        ("Ti", 1_099_511_627_776.0),
        ("Pi", 1_125_899_906_842_624.0),
        ("Ei", 1_152_921_504_606_846_976.0),
    ];
    const DECIMAL: [(char, f64); 7] = [
        ('m', 1e-3),
        ('k', 1e3),
        ('M', 1e6),
        ('G', 1e9),
        ('T', 1e12),
        ('P', 1e15),
        ('E', 1e18),
    ];

    let quantity = quantity.trim();
    for (suffix, factor) in BINARY {
        if let Some(number) = quantity.strip_suffix(suffix) {
            return number.parse::<f64>().ok().map(|value| value * factor);
        }
    }
    for (suffix, factor) in DECIMAL {
        if let Some(number) = quantity.strip_suffix(suffix) {
            return number.parse::<f64>().ok().map(|value| value * factor);
        }
    }
    quantity.parse::<f64>().ok()
}
