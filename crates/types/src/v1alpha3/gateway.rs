//! The subset of Istio's `networking.istio.io/v1alpha3` Gateway that the operator reads and
//! writes. The CRD itself belongs to Istio and is never installed from here.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(
    kind = "Gateway",
    group = "networking.istio.io",
    version = "v1alpha3",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct GatewaySpec {
    #[serde(default)]
    pub servers: Vec<Server>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub selector: BTreeMap<String, String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Server {
    pub port: Port,
    pub hosts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<ServerTls>,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Port {
    pub number: u32,
    pub protocol: String,
    /// Must be unique across the servers of a gateway.
    pub name: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServerTls {
    pub mode: TlsMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_certificate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
}

impl ServerTls {
    /// TLS settings backed by a credential (secret) name, served over SDS.
    pub fn credential(mode: TlsMode, credential_name: impl Into<String>) -> Self {
        Self {
            mode,
            credential_name: Some(credential_name.into()),
            server_certificate: None,
            private_key: None,
        }
    }

    /// TLS settings backed by certificate files mounted in the gateway pod.
    pub fn files(
        mode: TlsMode,
        server_certificate: impl Into<String>,
        private_key: impl Into<String>,
    ) -> Self {
        Self {
            mode,
            credential_name: None,
            server_certificate: Some(server_certificate.into()),
            private_key: Some(private_key.into()),
        }
    }

    pub fn mode_only(mode: TlsMode) -> Self {
        Self {
            mode,
            credential_name: None,
            server_certificate: None,
            private_key: None,
        }
    }
}

/// How the gateway handles TLS on a server port.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TlsMode {
    /// Standard TLS termination.
    Simple,
    /// Forward the connection upstream, routed on the client's SNI.
    Passthrough,
    /// TLS termination that also requires a client certificate.
    Mutual,
    /// Passthrough where the destination is encoded in the SNI value, no
    /// VirtualService required.
    AutoPassthrough,
    /// Mutual TLS with Istio-issued workload certificates. All other TLS
    /// fields must be empty.
    IstioMutual,
}

impl TlsMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TlsMode::Simple => "SIMPLE",
            TlsMode::Passthrough => "PASSTHROUGH",
            TlsMode::Mutual => "MUTUAL",
            TlsMode::AutoPassthrough => "AUTO_PASSTHROUGH",
            TlsMode::IstioMutual => "ISTIO_MUTUAL",
        }
    }
}

impl fmt::Display for TlsMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
