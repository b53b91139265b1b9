use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, PartialEq, JsonSchema)]
#[kube(
    kind = "GatewayService",
    group = "crd.gatewayservice.io",
    version = "v1alpha1",
    shortname = "gs",
    namespaced,
    status = "GatewayServiceStatus",
    printcolumn = r#"{"name":"Traffic", "type":"string", "jsonPath":".spec.trafficType"}"#,
    printcolumn = r#"{"name":"Mode", "type":"string", "jsonPath":".spec.mode"}"#,
    printcolumn = r#"{"name":"Success", "type":"boolean", "jsonPath":".status.condition.success"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct GatewayServiceSpec {
    /// Hosts exposed on the gateway server. DNS wildcard prefixes are allowed.
    #[schemars(length(min = 1))]
    pub hosts: Vec<String>,
    #[schemars(range(min = 1, max = 65535))]
    pub port: u32,
    /// One of SIMPLE, PASSTHROUGH, MUTUAL, AUTO_PASSTHROUGH or ISTIO_MUTUAL.
    pub mode: String,
    pub protocol: Protocol,
    pub traffic_type: TrafficType,
    /// Either creates the secret, references an existing one or points at
    /// certificate files mounted in the gateway pod. Only one may be set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_options: Option<TlsOptions>,
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, JsonSchema)]
pub enum Protocol {
    #[serde(rename = "HTTP")]
    Http,
    #[serde(rename = "HTTPS")]
    Https,
    #[serde(rename = "GRPC")]
    Grpc,
    #[serde(rename = "HTTP2")]
    Http2,
    #[serde(rename = "MONGO")]
    Mongo,
    #[serde(rename = "TCP")]
    Tcp,
    #[serde(rename = "TLS")]
    Tls,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "HTTP",
            Protocol::Https => "HTTPS",
            Protocol::Grpc => "GRPC",
            Protocol::Http2 => "HTTP2",
            Protocol::Mongo => "MONGO",
            Protocol::Tcp => "TCP",
            Protocol::Tls => "TLS",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Selects which gateway of the namespace a resource contributes to.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TrafficType {
    Ingress,
    Egress,
}

impl TrafficType {
    pub const ALL: [TrafficType; 2] = [TrafficType::Ingress, TrafficType::Egress];

    pub fn as_str(&self) -> &'static str {
        match self {
            TrafficType::Ingress => "ingress",
            TrafficType::Egress => "egress",
        }
    }
}

impl fmt::Display for TrafficType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TlsOptions {
    /// Certificate and key to be stored in a secret managed by the operator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_secret: Option<TlsSecret>,
    /// Existing secret holding the certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_secret_ref: Option<TlsSecretRef>,
    /// Certificate and key paths inside the gateway pod, used when SDS is not.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_secret_path: Option<TlsSecretPath>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TlsSecret {
    /// Base64 encoded certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert: Option<String>,
    /// Base64 encoded private key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TlsSecretRef {
    #[serde(default)]
    pub secret_name: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TlsSecretPath {
    #[serde(default)]
    pub cert_path: String,
    #[serde(default)]
    pub key_path: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GatewayServiceStatus {
    #[serde(default)]
    pub condition: Condition,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// True when the last reconciliation finished without error.
    #[serde(default)]
    pub success: bool,
    /// Error of the last failed reconciliation, or a fixed message on success.
    #[serde(default)]
    pub error_message: String,
    /// Only set when the operator manages a secret for this resource. The
    /// namespace depends on the mode: SIMPLE secrets live next to the gateway
    /// workload, every other mode keeps them in the resource namespace. Serialized as null when
    /// unset so that a merge patch clears stale details.
    #[serde(default)]
    pub created_secret_details: Option<CreatedSecretDetails>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatedSecretDetails {
    pub secret_name: String,
    pub secret_namespace: String,
}
