//! Every read and write the reconciler makes against the API server goes through [`ClusterApi`],
//! which keeps the reconciliation logic testable without a cluster.

use crate::{Error, Result};
use async_trait::async_trait;
use gateway_service_operator_types::v1alpha1::{GatewayService, GatewayServiceStatus, TrafficType};
use gateway_service_operator_types::v1alpha3::{Gateway, GatewaySpec};
use k8s_openapi::api::core::v1::Secret;
use kube::{
    api::{Api, DeleteParams, DynamicObject, ListParams, Patch, PatchParams, PostParams},
    client::Client,
    discovery::ApiResource,
    ResourceExt,
};
use serde_json::json;
use tracing::{debug, warn};

#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// `Ok(None)` when the gateway has not been provisioned.
    async fn fetch_gateway(&self, name: &str, namespace: &str) -> Result<Option<Gateway>>;

    /// All GatewayServices of a namespace that target the given traffic type, in the order the
    /// API server returned them.
    async fn list_resources(
        &self,
        namespace: &str,
        traffic_type: TrafficType,
    ) -> Result<Vec<GatewayService>>;

    async fn fetch_secret(&self, name: &str, namespace: &str) -> Result<Option<Secret>>;

    /// Replaces the server list of the gateway, leaving the rest of the object untouched.
    async fn persist_gateway(&self, gateway: &Gateway) -> Result<()>;

    /// Creating a secret that already exists is not an error.
    async fn create_secret(&self, secret: Secret) -> Result<()>;

    /// Deleting a secret that does not exist is not an error.
    async fn delete_secret(&self, name: &str, namespace: &str) -> Result<()>;

    async fn update_resource_status(
        &self,
        resource: &GatewayService,
        status: GatewayServiceStatus,
    ) -> Result<()>;
}

#[derive(Clone)]
pub struct KubeClusterApi {
    client: Client,
}

impl KubeClusterApi {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

/// Reads a gateway without its servers. Existing servers may use any field Istio supports and
/// are replaced wholesale, so only the metadata and the selector are kept.
pub fn gateway_from_object(obj: DynamicObject) -> Gateway {
    let selector = obj
        .data
        .get("spec")
        .and_then(|spec| spec.get("selector"))
        .cloned()
        .and_then(|selector| serde_json::from_value(selector).ok())
        .unwrap_or_default();
    Gateway {
        metadata: obj.metadata,
        spec: GatewaySpec {
            servers: vec![],
            selector,
        },
    }
}

fn gateway_api(client: Client, namespace: &str) -> Api<DynamicObject> {
    Api::namespaced_with(client, namespace, &ApiResource::erase::<Gateway>(&()))
}

fn is_status(e: &kube::Error, code: u16) -> bool {
    matches!(e, kube::Error::Api(resp) if resp.code == code)
}

#[async_trait]
impl ClusterApi for KubeClusterApi {
    async fn fetch_gateway(&self, name: &str, namespace: &str) -> Result<Option<Gateway>> {
        let api = gateway_api(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?.map(gateway_from_object))
    }

    async fn list_resources(
        &self,
        namespace: &str,
        traffic_type: TrafficType,
    ) -> Result<Vec<GatewayService>> {
        // Field selectors are not served for custom resource fields, so the traffic type is
        // filtered here.
        let api = Api::<GatewayService>::namespaced(self.client.clone(), namespace);
        let list = api.list(&ListParams::default()).await?;
        Ok(list
            .items
            .into_iter()
            .filter(|gs| gs.spec.traffic_type == traffic_type)
            .collect())
    }

    async fn fetch_secret(&self, name: &str, namespace: &str) -> Result<Option<Secret>> {
        let api = Api::<Secret>::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn persist_gateway(&self, gateway: &Gateway) -> Result<()> {
        let namespace = gateway.namespace().ok_or(Error::IllegalDocument)?;
        let api = gateway_api(self.client.clone(), &namespace);
        // A merge patch replaces the servers array wholesale and leaves the selector and any
        // fields unknown to this crate alone.
        let servers =
            serde_json::to_value(&gateway.spec.servers).map_err(Error::SerializationError)?;
        api.patch(
            &gateway.name_any(),
            &PatchParams::default(),
            &Patch::Merge(json!({ "spec": { "servers": servers } })),
        )
        .await
        .map_err(|e| {
            warn!("Failed to update gateway {}: {}", gateway.name_any(), e);
            e
        })?;
        Ok(())
    }

    async fn create_secret(&self, secret: Secret) -> Result<()> {
        let namespace = secret.namespace().ok_or(Error::IllegalDocument)?;
        let api = Api::<Secret>::namespaced(self.client.clone(), &namespace);
        match api.create(&PostParams::default(), &secret).await {
            Ok(_) => Ok(()),
            Err(e) if is_status(&e, 409) => {
                debug!("Secret {} already exists in {}", secret.name_any(), namespace);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_secret(&self, name: &str, namespace: &str) -> Result<()> {
        let api = Api::<Secret>::namespaced(self.client.clone(), namespace);
        match api.delete(name, &DeleteParams::default()).await {
            Ok(_) => Ok(()),
            Err(e) if is_status(&e, 404) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn update_resource_status(
        &self,
        resource: &GatewayService,
        status: GatewayServiceStatus,
    ) -> Result<()> {
        let namespace = resource.namespace().ok_or(Error::IllegalDocument)?;
        let api = Api::<GatewayService>::namespaced(self.client.clone(), &namespace);
        let status = serde_json::to_value(status).map_err(Error::SerializationError)?;
        api.patch_status(
            &resource.name_any(),
            &PatchParams::default(),
            &Patch::Merge(json!({ "status": status })),
        )
        .await
        .map_err(|e| {
            warn!("Failed to update status: {}", e);
            e
        })?;
        Ok(())
    }
}
