//! Names other systems key off. Gateways, SDS credentials and proxy port names are looked up
//! by these exact strings, so they must stay stable across releases.

use gateway_service_operator_types::v1alpha1::{Protocol, TrafficType};
use gateway_service_operator_types::v1alpha3::TlsMode;

/// `{namespace}-{trafficType}-gateway`
pub fn gateway_name(namespace: &str, traffic_type: TrafficType) -> String {
    format!("{}-{}-gateway", namespace, traffic_type)
}

/// `{resourceName}-{namespace}-secret`
pub fn secret_name(name: &str, namespace: &str) -> String {
    format!("{}-{}-secret", name, namespace)
}

/// `{lowercase(protocol)}-{resourceName}-{namespace}`
pub fn port_name(protocol: Protocol, name: &str, namespace: &str) -> String {
    format!(
        "{}-{}-{}",
        protocol.as_str().to_lowercase(),
        name,
        namespace
    )
}

/// SIMPLE servers are terminated by the gateway workload, which reads its credentials from its
/// own namespace. Every other mode keeps the secret next to the resource.
pub fn secret_namespace<'a>(mode: TlsMode, namespace: &'a str, gateway_namespace: &'a str) -> &'a str {
    match mode {
        TlsMode::Simple => gateway_namespace,
        _ => namespace,
    }
}
