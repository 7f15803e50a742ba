//! In-memory platform for tests: records every call and fails on demand.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::types::{ManagedResource, Platform, PlatformError, ResourceKind, ResourceRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Get,
    Create,
    Update,
    Delete,
    DeleteCollection,
    List,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub op: Op,
    pub kind: ResourceKind,
    /// Object name, or the label selector for collection calls.
    pub target: String,
}

#[derive(Default)]
struct State {
    objects: BTreeMap<ResourceRef, ManagedResource>,
    calls: Vec<Call>,
    failures: Vec<(Op, ResourceKind, String)>,
}

#[derive(Default)]
pub struct MemoryPlatform {
    state: Mutex<State>,
    latency: Option<Duration>,
}

impl MemoryPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Duration) -> Self {
        MemoryPlatform {
            latency: Some(latency),
            ..Default::default()
        }
    }

    pub fn insert(&self, resource: ManagedResource) {
        let mut state = self.state.lock().unwrap();
        state.objects.insert(resource.reference(), resource);
    }

    /// Makes `op` on `kind/target` fail with an API error until cleared.
    pub fn fail(&self, op: Op, kind: ResourceKind, target: &str) {
        let mut state = self.state.lock().unwrap();
        state.failures.push((op, kind, target.to_string()));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn calls_of(&self, op: Op) -> Vec<Call> {
        self.calls().into_iter().filter(|call| call.op == op).collect()
    }

    pub fn contains(&self, kind: ResourceKind, name: &str) -> bool {
        let state = self.state.lock().unwrap();
        state.objects.contains_key(&ResourceRef {
            kind,
            name: name.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().objects.len()
    }

    async fn enter(&self, op: Op, kind: ResourceKind, target: &str) -> Result<(), PlatformError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state.lock().unwrap();
        state.calls.push(Call {
            op,
            kind,
            target: target.to_string(),
        });
        let injected = state
            .failures
            .iter()
            .any(|(fail_op, fail_kind, fail_target)| {
                *fail_op == op && *fail_kind == kind && fail_target == target
            });
        if injected {
            return Err(PlatformError::Api {
                kind,
                name: target.to_string(),
                message: format!("injected {:?} failure", op),
            });
        }
        Ok(())
    }
}

fn matches_selector(resource: &ManagedResource, selector: &str) -> bool {
    selector
        .split(',')
        .filter(|term| !term.is_empty())
        .all(|term| match term.split_once('=') {
            Some((key, value)) => resource.label(key) == Some(value),
            None => resource.label(term).is_some(),
        })
}

#[async_trait]
impl Platform for MemoryPlatform {
    async fn get(&self, target: &ResourceRef) -> Result<ManagedResource, PlatformError> {
        self.enter(Op::Get, target.kind, &target.name).await?;
        let state = self.state.lock().unwrap();
        state
            .objects
            .get(target)
            .cloned()
            .ok_or_else(|| PlatformError::NotFound {
                kind: target.kind,
                name: target.name.clone(),
            })
    }

    async fn create(&self, resource: &ManagedResource) -> Result<(), PlatformError> {
        self.enter(Op::Create, resource.kind(), resource.name()).await?;
        let mut state = self.state.lock().unwrap();
        let reference = resource.reference();
        if state.objects.contains_key(&reference) {
            return Err(PlatformError::Api {
                kind: reference.kind,
                name: reference.name,
                message: "already exists".to_string(),
            });
        }
        state.objects.insert(reference, resource.clone());
        Ok(())
    }

    async fn update(&self, resource: &ManagedResource) -> Result<(), PlatformError> {
        self.enter(Op::Update, resource.kind(), resource.name()).await?;
        let mut state = self.state.lock().unwrap();
        let reference = resource.reference();
        match state.objects.get_mut(&reference) {
            Some(existing) => {
                *existing = resource.clone();
                Ok(())
            }
            None => Err(PlatformError::NotFound {
                kind: reference.kind,
                name: reference.name,
            }),
        }
    }

    async fn delete(&self, target: &ResourceRef) -> Result<(), PlatformError> {
        self.enter(Op::Delete, target.kind, &target.name).await?;
        let mut state = self.state.lock().unwrap();
        match state.objects.remove(target) {
            Some(_) => Ok(()),
            None => Err(PlatformError::NotFound {
                kind: target.kind,
                name: target.name.clone(),
            }),
        }
    }

    async fn delete_collection(
        &self,
        kind: ResourceKind,
        selector: &str,
    ) -> Result<(), PlatformError> {
        self.enter(Op::DeleteCollection, kind, selector).await?;
        let mut state = self.state.lock().unwrap();
        state
            .objects
            .retain(|reference, resource| reference.kind != kind || !matches_selector(resource, selector));
        Ok(())
    }

    async fn list(
        &self,
        kind: ResourceKind,
        selector: &str,
    ) -> Result<Vec<ManagedResource>, PlatformError> {
        self.enter(Op::List, kind, selector).await?;
        let state = self.state.lock().unwrap();
        Ok(state
            .objects
            .values()
            .filter(|resource| resource.kind() == kind && matches_selector(resource, selector))
            .cloned()
            .collect())
    }
}
