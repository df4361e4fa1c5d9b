//! Fetched bundles and their derived identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::normalize::normalize;

/// One certificate bundle downloaded during a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleRecord {
    /// File name as published, e.g. `My Root CA.pem`
    pub logical_name: String,
    /// Raw bundle bytes
    pub content: Vec<u8>,
}

impl BundleRecord {
    /// Create a new record
    pub fn new(logical_name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            logical_name: logical_name.into(),
            content: content.into(),
        }
    }

    /// Resource identifier this record maps to
    #[must_use]
    pub fn resource_id(&self) -> ResourceId {
        ResourceId::from_logical_name(&self.logical_name)
    }
}

/// Cluster resource name derived from a bundle's logical name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    /// Derive the identifier for a published bundle name
    #[must_use]
    pub fn from_logical_name(logical_name: &str) -> Self {
        Self(normalize(logical_name))
    }

    /// Wrap an existing resource name without normalizing it
    pub fn from_resource_name(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The identifier as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ResourceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_resource_id() {
        let record = BundleRecord::new("Issuing CA 2.crt", b"PEM".to_vec());
        assert_eq!(record.resource_id().as_str(), "issuing-ca-2");
    }

    #[test]
    fn test_resource_id_serializes_as_string() {
        let id = ResourceId::from_logical_name("root.pem");
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""root""#);
    }
}
