//! In-memory cluster backend.
//!
//! Keeps resources in a map, journals every call and can be told to fail
//! specific operations. Used for dry runs and as the engine's test double.

use async_trait::async_trait;
use cabundle_core::{ClusterClient, ClusterError, ClusterResult, KvResource, OwnershipLabel};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

/// Cluster primitive, as recorded in the journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Get,
    List,
    Create,
    Update,
    Delete,
}

impl Operation {
    /// Returns true for operations that mutate state
    #[must_use]
    pub const fn is_write(self) -> bool {
        matches!(self, Self::Create | Self::Update | Self::Delete)
    }
}

/// One recorded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub operation: Operation,
    pub namespace: String,
    /// Resource name, empty for list calls
    pub name: String,
}

#[derive(Default)]
struct State {
    resources: BTreeMap<(String, String), KvResource>,
    journal: Vec<Call>,
    failures: HashMap<(Operation, String), ClusterError>,
    next_version: u64,
}

/// A [`ClusterClient`] backed by process memory.
#[derive(Default)]
pub struct MemoryCluster {
    state: Mutex<State>,
}

impl MemoryCluster {
    /// Create an empty cluster
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cluster pre-populated with resources
    #[must_use]
    pub fn with_resources(resources: impl IntoIterator<Item = KvResource>) -> Self {
        let cluster = Self::new();
        {
            let mut state = cluster.lock();
            for resource in resources {
                state
                    .resources
                    .insert((resource.namespace.clone(), resource.name.clone()), resource);
            }
        }
        cluster
    }

    /// Make every future `operation` on `name` fail with an API error.
    ///
    /// Use an empty name to fail list calls.
    pub fn fail_on(&self, operation: Operation, name: impl Into<String>) {
        let name = name.into();
        let error = ClusterError::Api {
            code: 500,
            message: format!("injected {operation:?} failure for {name}"),
        };
        self.fail_with(operation, name, error);
    }

    /// Make every future `operation` on `name` fail with `error`
    pub fn fail_with(&self, operation: Operation, name: impl Into<String>, error: ClusterError) {
        self.lock().failures.insert((operation, name.into()), error);
    }

    /// Remove all injected failures
    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    /// Current copy of a stored resource
    #[must_use]
    pub fn resource(&self, namespace: &str, name: &str) -> Option<KvResource> {
        self.lock()
            .resources
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    /// Names of all resources stored in `namespace`, sorted
    #[must_use]
    pub fn names(&self, namespace: &str) -> Vec<String> {
        self.lock()
            .resources
            .keys()
            .filter(|(ns, _)| ns == namespace)
            .map(|(_, name)| name.clone())
            .collect()
    }

    /// Every call made so far, in order
    #[must_use]
    pub fn journal(&self) -> Vec<Call> {
        self.lock().journal.clone()
    }

    /// Number of write calls made so far, including failed ones
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.lock()
            .journal
            .iter()
            .filter(|call| call.operation.is_write())
            .count()
    }

    /// Number of calls of one kind
    #[must_use]
    pub fn count_of(&self, operation: Operation) -> usize {
        self.lock()
            .journal
            .iter()
            .filter(|call| call.operation == operation)
            .count()
    }

    /// Whether `operation` was ever called for `name`
    #[must_use]
    pub fn was_attempted(&self, operation: Operation, name: &str) -> bool {
        self.lock()
            .journal
            .iter()
            .any(|call| call.operation == operation && call.name == name)
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panic while holding the lock leaves the maps consistent
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Journal the call and return the guard, or the injected failure
    fn begin(
        &self,
        operation: Operation,
        namespace: &str,
        name: &str,
    ) -> ClusterResult<MutexGuard<'_, State>> {
        let mut state = self.lock();
        state.journal.push(Call {
            operation,
            namespace: namespace.to_string(),
            name: name.to_string(),
        });

        if let Some(error) = state.failures.get(&(operation, name.to_string())) {
            return Err(error.clone());
        }
        Ok(state)
    }
}

#[async_trait]
impl ClusterClient for MemoryCluster {
    async fn get(&self, namespace: &str, name: &str) -> ClusterResult<Option<KvResource>> {
        let state = self.begin(Operation::Get, namespace, name)?;
        Ok(state
            .resources
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    async fn list(
        &self,
        namespace: &str,
        label: &OwnershipLabel,
    ) -> ClusterResult<Vec<KvResource>> {
        let state = self.begin(Operation::List, namespace, "")?;
        Ok(state
            .resources
            .values()
            .filter(|r| r.namespace == namespace && label.is_carried_by(&r.labels))
            .cloned()
            .collect())
    }

    async fn create(&self, resource: &KvResource) -> ClusterResult<()> {
        let mut state = self.begin(Operation::Create, &resource.namespace, &resource.name)?;
        let key = (resource.namespace.clone(), resource.name.clone());
        if state.resources.contains_key(&key) {
            return Err(ClusterError::Conflict {
                namespace: resource.namespace.clone(),
                name: resource.name.clone(),
                message: "already exists".into(),
            });
        }

        state.next_version += 1;
        let mut stored = resource.clone();
        stored.resource_version = Some(state.next_version.to_string());
        state.resources.insert(key, stored);
        Ok(())
    }

    async fn update(&self, resource: &KvResource) -> ClusterResult<()> {
        let mut state = self.begin(Operation::Update, &resource.namespace, &resource.name)?;
        let key = (resource.namespace.clone(), resource.name.clone());

        let current_version = match state.resources.get(&key) {
            Some(current) => current.resource_version.clone(),
            None => return Err(ClusterError::not_found(&resource.namespace, &resource.name)),
        };
        if resource.resource_version.is_some() && resource.resource_version != current_version {
            return Err(ClusterError::Conflict {
                namespace: resource.namespace.clone(),
                name: resource.name.clone(),
                message: "resource version is stale".into(),
            });
        }

        state.next_version += 1;
        let mut stored = resource.clone();
        stored.resource_version = Some(state.next_version.to_string());
        state.resources.insert(key, stored);
        Ok(())
    }

    async fn delete(&self, namespace: &str, name: &str) -> ClusterResult<()> {
        let mut state = self.begin(Operation::Delete, namespace, name)?;
        state
            .resources
            .remove(&(namespace.to_string(), name.to_string()))
            .map(|_| ())
            .ok_or_else(|| ClusterError::not_found(namespace, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_crud_roundtrip() {
        let cluster = MemoryCluster::new();
        let resource = KvResource::new("certs", "a").with_label("app", "cabundle-operator");

        cluster.create(&resource).await.unwrap();
        assert!(matches!(
            cluster.create(&resource).await,
            Err(ClusterError::Conflict { .. })
        ));

        let stored = cluster.get("certs", "a").await.unwrap().unwrap();
        assert_eq!(stored.resource_version.as_deref(), Some("1"));

        let listed = cluster
            .list("certs", &OwnershipLabel::default())
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);

        cluster.delete("certs", "a").await.unwrap();
        assert!(cluster.delete("certs", "a").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_update_checks_version() {
        let cluster = MemoryCluster::new();
        cluster.create(&KvResource::new("certs", "a")).await.unwrap();

        let mut stale = cluster.get("certs", "a").await.unwrap().unwrap();
        cluster.update(&stale).await.unwrap();
        stale.data.insert("k".into(), "v".into());
        assert!(matches!(
            cluster.update(&stale).await,
            Err(ClusterError::Conflict { .. })
        ));
        assert!(cluster
            .update(&KvResource::new("certs", "missing"))
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_injected_failure_is_journaled() {
        let cluster = MemoryCluster::new();
        cluster.fail_on(Operation::Get, "a");

        assert!(cluster.get("certs", "a").await.is_err());
        assert!(cluster.was_attempted(Operation::Get, "a"));
        assert_eq!(cluster.write_count(), 0);

        cluster.clear_failures();
        assert!(cluster.get("certs", "a").await.unwrap().is_none());
    }
}
