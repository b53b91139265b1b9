//! Fixtures and an in-memory [`ClusterApi`] shared by the unit tests.

use crate::cluster::{gateway_from_object, ClusterApi};
use crate::naming;
use crate::{Error, Result};
use async_trait::async_trait;
use gateway_service_operator_types::v1alpha1::{
    GatewayService, GatewayServiceSpec, GatewayServiceStatus, Protocol, TlsOptions, TlsSecret,
    TlsSecretPath, TlsSecretRef, TrafficType,
};
use gateway_service_operator_types::v1alpha3::{Gateway, GatewaySpec, Server};
use k8s_openapi::api::core::v1::Secret;
use kube::api::{DynamicObject, ObjectMeta};
use kube::error::ErrorResponse;
use kube::ResourceExt;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

pub const CERT: &str = "Q2VydAo=";
pub const KEY: &str = "S2V5Cg==";

/// An ingress gateway carrying servers the operator never writes itself.
pub const REDIRECT_GATEWAY: &str = r#"
apiVersion: networking.istio.io/v1alpha3
kind: Gateway
metadata:
  name: application-ingress-gateway
  namespace: application
spec:
  selector:
    istio: ingressgateway
  servers:
    - port:
        number: 80
        protocol: HTTP
      hosts:
        - "*.example.com"
      tls:
        httpsRedirect: true
    - port:
        number: 443
        name: https
        protocol: HTTPS
      hosts:
        - "*.example.com"
      tls:
        mode: OPTIONAL_MUTUAL
        credentialName: example-secret
"#;

pub fn service(name: &str, namespace: &str, mode: &str) -> GatewayService {
    let mut gs = GatewayService::new(
        name,
        GatewayServiceSpec {
            hosts: vec!["*".to_string()],
            port: 80,
            mode: mode.to_string(),
            protocol: Protocol::Https,
            traffic_type: TrafficType::Ingress,
            tls_options: None,
        },
    );
    gs.metadata.namespace = Some(namespace.to_string());
    gs.metadata.uid = Some(format!("uid-{}-{}", namespace, name));
    gs
}

pub fn with_inline(mut gs: GatewayService, cert: &str, key: &str) -> GatewayService {
    gs.spec.tls_options = Some(TlsOptions {
        tls_secret: Some(TlsSecret {
            cert: Some(cert.to_string()),
            key: Some(key.to_string()),
        }),
        ..Default::default()
    });
    gs
}

pub fn with_reference(mut gs: GatewayService, secret_name: &str) -> GatewayService {
    gs.spec.tls_options = Some(TlsOptions {
        tls_secret_ref: Some(TlsSecretRef {
            secret_name: secret_name.to_string(),
        }),
        ..Default::default()
    });
    gs
}

pub fn with_file_mount(mut gs: GatewayService, cert_path: &str, key_path: &str) -> GatewayService {
    gs.spec.tls_options = Some(TlsOptions {
        tls_secret_path: Some(TlsSecretPath {
            cert_path: cert_path.to_string(),
            key_path: key_path.to_string(),
        }),
        ..Default::default()
    });
    gs
}

pub fn gateway(namespace: &str, traffic_type: TrafficType) -> Gateway {
    let mut gw = Gateway::new(
        &naming::gateway_name(namespace, traffic_type),
        GatewaySpec {
            servers: vec![],
            selector: BTreeMap::from([(
                "istio".to_string(),
                format!("{}gateway", traffic_type),
            )]),
        },
    );
    gw.metadata.namespace = Some(namespace.to_string());
    gw
}

pub fn opaque_secret(name: &str, namespace: &str) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn key(namespace: &str, name: &str) -> (String, String) {
    (namespace.to_string(), name.to_string())
}

#[derive(Default)]
pub struct FakeState {
    pub gateways: BTreeMap<(String, String), Gateway>,
    /// Kept in insertion order, which is the order the fake "API server" lists them in.
    pub services: Vec<GatewayService>,
    pub secrets: BTreeMap<(String, String), Secret>,
    pub statuses: Vec<(String, GatewayServiceStatus)>,
    pub gateway_writes: usize,
    pub secret_creates: usize,
    pub fail_persist: bool,
}

/// Stands in for the API server. Everything lives behind one mutex, the tests are sequential.
#[derive(Default)]
pub struct FakeCluster {
    state: Mutex<FakeState>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_gateway(self, namespace: &str, traffic_type: TrafficType) -> Self {
        let gw = gateway(namespace, traffic_type);
        self.state()
            .gateways
            .insert(key(namespace, &gw.name_any()), gw);
        self
    }

    /// Seeds a gateway from a raw manifest, read the way the API client reads it.
    pub fn with_gateway_manifest(self, manifest: &str) -> Self {
        let obj: DynamicObject = serde_yaml::from_str(manifest).unwrap();
        let gw = gateway_from_object(obj);
        let k = key(gw.metadata.namespace.as_deref().unwrap_or_default(), &gw.name_any());
        self.state().gateways.insert(k, gw);
        self
    }

    pub fn with_service(self, gs: GatewayService) -> Self {
        self.state().services.push(gs);
        self
    }

    pub fn with_secret(self, secret: Secret) -> Self {
        let k = key(
            secret.metadata.namespace.as_deref().unwrap_or_default(),
            &secret.name_any(),
        );
        self.state().secrets.insert(k, secret);
        self
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn servers(&self, namespace: &str, traffic_type: TrafficType) -> Option<Vec<Server>> {
        self.state()
            .gateways
            .get(&key(namespace, &naming::gateway_name(namespace, traffic_type)))
            .map(|gw| gw.spec.servers.clone())
    }

    pub fn secret(&self, name: &str, namespace: &str) -> Option<Secret> {
        self.state().secrets.get(&key(namespace, name)).cloned()
    }

    pub fn last_status(&self, name: &str) -> Option<GatewayServiceStatus> {
        self.state()
            .statuses
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, s)| s.clone())
    }
}

#[async_trait]
impl ClusterApi for FakeCluster {
    async fn fetch_gateway(&self, name: &str, namespace: &str) -> Result<Option<Gateway>> {
        Ok(self.state().gateways.get(&key(namespace, name)).cloned())
    }

    async fn list_resources(
        &self,
        namespace: &str,
        traffic_type: TrafficType,
    ) -> Result<Vec<GatewayService>> {
        Ok(self
            .state()
            .services
            .iter()
            .filter(|gs| {
                gs.metadata.namespace.as_deref() == Some(namespace)
                    && gs.spec.traffic_type == traffic_type
            })
            .cloned()
            .collect())
    }

    async fn fetch_secret(&self, name: &str, namespace: &str) -> Result<Option<Secret>> {
        Ok(self.secret(name, namespace))
    }

    async fn persist_gateway(&self, gateway: &Gateway) -> Result<()> {
        let mut state = self.state();
        if state.fail_persist {
            return Err(Error::KubeError(kube::Error::Api(ErrorResponse {
                status: "Failure".to_string(),
                message: "etcdserver: request timed out".to_string(),
                reason: "InternalError".to_string(),
                code: 500,
            })));
        }
        let namespace = gateway.namespace().ok_or(Error::IllegalDocument)?;
        let existing = state
            .gateways
            .get_mut(&key(&namespace, &gateway.name_any()))
            .ok_or(Error::IllegalDocument)?;
        existing.spec.servers = gateway.spec.servers.clone();
        state.gateway_writes += 1;
        Ok(())
    }

    async fn create_secret(&self, secret: Secret) -> Result<()> {
        let namespace = secret.namespace().ok_or(Error::IllegalDocument)?;
        let mut state = self.state();
        let k = key(&namespace, &secret.name_any());
        if !state.secrets.contains_key(&k) {
            state.secrets.insert(k, secret);
            state.secret_creates += 1;
        }
        Ok(())
    }

    async fn delete_secret(&self, name: &str, namespace: &str) -> Result<()> {
        self.state().secrets.remove(&key(namespace, name));
        Ok(())
    }

    async fn update_resource_status(
        &self,
        resource: &GatewayService,
        status: GatewayServiceStatus,
    ) -> Result<()> {
        self.state().statuses.push((resource.name_any(), status));
        Ok(())
    }
}
