//! Kubernetes implementation of [`ClusterClient`] over core/v1 ConfigMaps.

use async_trait::async_trait;
use cabundle_core::{ClusterClient, ClusterError, ClusterResult, KvResource, OwnershipLabel};
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use kube::api::{Api, DeleteParams, ListParams, PostParams};
use kube::Client;
use tracing::debug;

/// ConfigMap store backed by the Kubernetes API.
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
}

impl KubeCluster {
    /// Wrap an existing client
    pub const fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connect using the in-cluster service account or the local kubeconfig
    pub async fn try_default() -> ClusterResult<Self> {
        let client = Client::try_default()
            .await
            .map_err(|e| ClusterError::Connection(e.to_string()))?;
        Ok(Self::new(client))
    }

    fn api(&self, namespace: &str) -> Api<ConfigMap> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl ClusterClient for KubeCluster {
    async fn get(&self, namespace: &str, name: &str) -> ClusterResult<Option<KvResource>> {
        debug!(namespace, name, "GET configmap");
        self.api(namespace)
            .get_opt(name)
            .await
            .map_err(|e| map_error(namespace, name, e))?
            .map(|cm| from_config_map(cm, namespace))
            .transpose()
    }

    async fn list(&self, namespace: &str, label: &OwnershipLabel) -> ClusterResult<Vec<KvResource>> {
        let selector = label.selector();
        debug!(namespace, selector = %selector, "LIST configmaps");
        self.api(namespace)
            .list(&ListParams::default().labels(&selector))
            .await
            .map_err(|e| map_error(namespace, "", e))?
            .items
            .into_iter()
            .map(|cm| from_config_map(cm, namespace))
            .collect()
    }

    async fn create(&self, resource: &KvResource) -> ClusterResult<()> {
        debug!(namespace = %resource.namespace, name = %resource.name, "CREATE configmap");
        self.api(&resource.namespace)
            .create(&PostParams::default(), &to_config_map(resource))
            .await
            .map_err(|e| map_error(&resource.namespace, &resource.name, e))?;
        Ok(())
    }

    async fn update(&self, resource: &KvResource) -> ClusterResult<()> {
        debug!(namespace = %resource.namespace, name = %resource.name, "REPLACE configmap");
        self.api(&resource.namespace)
            .replace(&resource.name, &PostParams::default(), &to_config_map(resource))
            .await
            .map_err(|e| map_error(&resource.namespace, &resource.name, e))?;
        Ok(())
    }

    async fn delete(&self, namespace: &str, name: &str) -> ClusterResult<()> {
        debug!(namespace, name, "DELETE configmap");
        self.api(namespace)
            .delete(name, &DeleteParams::default())
            .await
            .map_err(|e| map_error(namespace, name, e))?;
        Ok(())
    }
}

/// Convert a stored resource into the ConfigMap sent to the API server
pub fn to_config_map(resource: &KvResource) -> ConfigMap {
    ConfigMap {
        metadata: ObjectMeta {
            name: Some(resource.name.clone()),
            namespace: Some(resource.namespace.clone()),
            labels: non_empty(resource.labels.clone()),
            resource_version: resource.resource_version.clone(),
            ..ObjectMeta::default()
        },
        data: non_empty(resource.data.clone()),
        binary_data: non_empty(
            resource
                .binary_data
                .iter()
                .map(|(key, bytes)| (key.clone(), ByteString(bytes.clone())))
                .collect(),
        ),
        ..ConfigMap::default()
    }
}

/// Convert a ConfigMap read from the API server.
///
/// Objects without a name are rejected; a missing namespace falls back to
/// the namespace that was queried.
pub fn from_config_map(cm: ConfigMap, namespace: &str) -> ClusterResult<KvResource> {
    let name = cm
        .metadata
        .name
        .ok_or_else(|| ClusterError::Invalid(format!("ConfigMap in {namespace} has no name")))?;

    let mut resource = KvResource::new(cm.metadata.namespace.unwrap_or_else(|| namespace.to_string()), name);
    resource.labels = cm.metadata.labels.unwrap_or_default();
    resource.data = cm.data.unwrap_or_default();
    resource.binary_data = cm
        .binary_data
        .unwrap_or_default()
        .into_iter()
        .map(|(key, ByteString(bytes))| (key, bytes))
        .collect();
    resource.resource_version = cm.metadata.resource_version;
    Ok(resource)
}

/// Map a client error onto the cluster error taxonomy
pub fn map_error(namespace: &str, name: &str, error: kube::Error) -> ClusterError {
    match error {
        kube::Error::Api(ae) if ae.code == 404 => ClusterError::not_found(namespace, name),
        kube::Error::Api(ae) if ae.code == 409 => ClusterError::Conflict {
            namespace: namespace.to_string(),
            name: name.to_string(),
            message: ae.message,
        },
        kube::Error::Api(ae) => ClusterError::Api {
            code: ae.code,
            message: ae.message,
        },
        other => ClusterError::Connection(other.to_string()),
    }
}

fn non_empty<T>(map: std::collections::BTreeMap<String, T>) -> Option<std::collections::BTreeMap<String, T>> {
    (!map.is_empty()).then_some(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cabundle_core::{BundleRecord, TrustResource, CA_KEY};
    use kube::core::ErrorResponse;

    fn api_error(code: u16, reason: &str) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".into(),
            message: format!("{reason} from API server"),
            reason: reason.into(),
            code,
        })
    }

    #[test]
    fn test_text_payload_goes_to_data() {
        let desired = TrustResource::from_bundle(
            &BundleRecord::new("root.pem", b"-----BEGIN CERTIFICATE-----".to_vec()),
            "certs",
            &OwnershipLabel::default(),
        );
        let cm = to_config_map(&desired.to_resource());

        assert_eq!(cm.metadata.name.as_deref(), Some("root"));
        assert_eq!(cm.metadata.namespace.as_deref(), Some("certs"));
        assert_eq!(
            cm.metadata.labels.unwrap().get("app").map(String::as_str),
            Some("cabundle-operator")
        );
        assert_eq!(
            cm.data.unwrap().get(CA_KEY).map(String::as_str),
            Some("-----BEGIN CERTIFICATE-----")
        );
        assert!(cm.binary_data.is_none());
        assert!(cm.metadata.resource_version.is_none());
    }

    #[test]
    fn test_binary_payload_survives_conversion() {
        let der = vec![0x30, 0x82, 0xff, 0x00];
        let desired = TrustResource::from_bundle(
            &BundleRecord::new("root.crt", der.clone()),
            "certs",
            &OwnershipLabel::default(),
        );

        let cm = to_config_map(&desired.to_resource());
        assert!(cm.data.is_none());

        let back = from_config_map(cm, "certs").unwrap();
        assert_eq!(back.value_bytes(CA_KEY), Some(der.as_slice()));
        assert!(desired.is_satisfied_by(&back));
    }

    #[test]
    fn test_from_config_map_keeps_version_and_defaults_namespace() {
        let cm = ConfigMap {
            metadata: ObjectMeta {
                name: Some("bundle-a".into()),
                resource_version: Some("42".into()),
                ..ObjectMeta::default()
            },
            ..ConfigMap::default()
        };

        let resource = from_config_map(cm, "certs").unwrap();
        assert_eq!(resource.namespace, "certs");
        assert_eq!(resource.resource_version.as_deref(), Some("42"));
        assert!(resource.labels.is_empty());
        assert!(resource.data.is_empty());
    }

    #[test]
    fn test_nameless_config_map_is_invalid() {
        let err = from_config_map(ConfigMap::default(), "certs").unwrap_err();
        assert!(matches!(err, ClusterError::Invalid(_)));
    }

    #[test]
    fn test_error_mapping() {
        assert!(map_error("certs", "a", api_error(404, "NotFound")).is_not_found());
        assert!(matches!(
            map_error("certs", "a", api_error(409, "AlreadyExists")),
            ClusterError::Conflict { ref name, .. } if name == "a"
        ));

        let err = map_error("certs", "a", api_error(503, "ServiceUnavailable"));
        assert_eq!(
            err,
            ClusterError::Api {
                code: 503,
                message: "ServiceUnavailable from API server".into()
            }
        );
        assert!(err.is_retryable());
    }
}
