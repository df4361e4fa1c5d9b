//! Data model for synchronized bundles and the cluster resources they map to.

mod bundle;
mod resource;

pub use bundle::{BundleRecord, ResourceId};
pub use resource::{KvResource, OwnershipLabel, TrustResource, CA_KEY};
