use crate::naming;
use gateway_service_operator_types::v1alpha1::{GatewayService, Protocol};
use gateway_service_operator_types::v1alpha3::{Port, Server, ServerTls};
use kube::ResourceExt;

pub const DEFAULT_PORT_NAME: &str = "http-default";
pub const DEFAULT_PORT: u32 = 80;

/// Builds the server stanza of one GatewayService. The port name embeds the resource name and
/// namespace, which keeps it unique within the gateway and identical across passes.
pub fn build_server(resource: &GatewayService, namespace: &str, tls: ServerTls) -> Server {
    let name = resource.name_any();
    Server {
        port: Port {
            number: resource.spec.port,
            protocol: resource.spec.protocol.as_str().to_string(),
            name: naming::port_name(resource.spec.protocol, &name, namespace),
        },
        hosts: resource.spec.hosts.clone(),
        tls: Some(tls),
    }
}

/// Plain HTTP catch-all written when nothing targets a gateway, since Istio rejects a gateway
/// without servers.
pub fn default_server(host: &str) -> Server {
    Server {
        port: Port {
            number: DEFAULT_PORT,
            protocol: Protocol::Http.as_str().to_string(),
            name: DEFAULT_PORT_NAME.to_string(),
        },
        hosts: vec![host.to_string()],
        tls: None,
    }
}
