//! Cluster-side resource shapes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::bundle::{BundleRecord, ResourceId};

/// Data key under which the bundle payload is stored.
pub const CA_KEY: &str = "ca.crt";

/// Label that marks resources owned by the operator.
///
/// It is the only discriminator the reaper uses, so it must never match
/// resources created by anything else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipLabel {
    /// Label key
    pub key: String,
    /// Label value
    pub value: String,
}

impl OwnershipLabel {
    /// Create a new ownership label
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Equality selector in `key=value` form
    #[must_use]
    pub fn selector(&self) -> String {
        format!("{}={}", self.key, self.value)
    }

    /// Returns true if the label set carries this label
    #[must_use]
    pub fn is_carried_by(&self, labels: &BTreeMap<String, String>) -> bool {
        labels.get(&self.key) == Some(&self.value)
    }
}

impl Default for OwnershipLabel {
    fn default() -> Self {
        Self::new("app", "cabundle-operator")
    }
}

impl fmt::Display for OwnershipLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// A namespaced key-value resource as read from and written to the cluster.
///
/// Textual values live in `data`, anything that is not valid UTF-8 in
/// `binary_data`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KvResource {
    /// Namespace of the resource
    pub namespace: String,
    /// Resource name
    pub name: String,
    /// Metadata labels
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// UTF-8 values
    #[serde(default)]
    pub data: BTreeMap<String, String>,
    /// Binary values
    #[serde(default)]
    pub binary_data: BTreeMap<String, Vec<u8>>,
    /// Opaque version used for optimistic concurrency, if the backend has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
}

impl KvResource {
    /// Create an empty resource
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add a label
    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Add a text value
    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Look up a text value
    #[must_use]
    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }

    /// Raw bytes stored under `key`, from either map
    #[must_use]
    pub fn value_bytes(&self, key: &str) -> Option<&[u8]> {
        self.data
            .get(key)
            .map(String::as_bytes)
            .or_else(|| self.binary_data.get(key).map(Vec::as_slice))
    }

    /// Store bytes under `key`, as text when they are valid UTF-8
    pub fn set_value_bytes(&mut self, key: &str, bytes: &[u8]) {
        if let Ok(text) = std::str::from_utf8(bytes) {
            self.binary_data.remove(key);
            self.data.insert(key.to_string(), text.to_string());
        } else {
            self.data.remove(key);
            self.binary_data.insert(key.to_string(), bytes.to_vec());
        }
    }
}

/// Desired state of one synchronized bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustResource {
    /// Resource name
    pub id: ResourceId,
    /// Target namespace
    pub namespace: String,
    /// Ownership marker
    pub owner: OwnershipLabel,
    /// Bundle bytes stored under [`CA_KEY`]
    pub payload: Vec<u8>,
}

impl TrustResource {
    /// Desired resource for a fetched bundle
    #[must_use]
    pub fn from_bundle(record: &BundleRecord, namespace: &str, owner: &OwnershipLabel) -> Self {
        Self {
            id: record.resource_id(),
            namespace: namespace.to_string(),
            owner: owner.clone(),
            payload: record.content.clone(),
        }
    }

    /// Returns true if `existing` already matches this desired state
    #[must_use]
    pub fn is_satisfied_by(&self, existing: &KvResource) -> bool {
        self.owner.is_carried_by(&existing.labels)
            && existing.value_bytes(CA_KEY) == Some(self.payload.as_slice())
    }

    /// Fresh resource to create
    #[must_use]
    pub fn to_resource(&self) -> KvResource {
        let mut resource = KvResource::new(&self.namespace, self.id.as_str())
            .with_label(&self.owner.key, &self.owner.value);
        resource.set_value_bytes(CA_KEY, &self.payload);
        resource
    }

    /// Apply this desired state onto an existing resource, keeping its
    /// other labels, keys and version
    #[must_use]
    pub fn apply_to(&self, existing: &KvResource) -> KvResource {
        let mut resource = existing.clone();
        resource
            .labels
            .insert(self.owner.key.clone(), self.owner.value.clone());
        resource.set_value_bytes(CA_KEY, &self.payload);
        resource
    }
}
