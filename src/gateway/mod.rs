//! Rebuilds the server list of a namespace's gateway from every GatewayService that targets it.

use crate::cluster::ClusterApi;
use crate::config::OperatorConfig;
use crate::naming;
use crate::validate::{validate, validate_material, Validated};
use crate::{Error, Result};
use gateway_service_operator_types::v1alpha1::{GatewayService, TrafficType};
use gateway_service_operator_types::v1alpha3::Server;
use kube::ResourceExt;
use tracing::{debug, info, instrument};

pub mod server;
pub mod tls;

use self::server::{build_server, default_server};
use self::tls::resolve_tls;

#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// The gateway does not exist (yet), so there was nothing to update.
    NotProvisioned,
    Updated { servers: Vec<Server> },
}

/// Drops resources that are being deleted and orders the rest by name and namespace, so the
/// resulting server list does not depend on the order the API server lists them in.
fn active(resources: &[GatewayService]) -> Vec<&GatewayService> {
    let mut active: Vec<&GatewayService> = resources
        .iter()
        .filter(|r| r.metadata.deletion_timestamp.is_none())
        .collect();
    active.sort_by_key(|r| (r.name_any(), r.namespace()));
    active
}

/// Computes the server list for a set of GatewayServices. The first resource that fails
/// validation fails the whole computation.
pub fn desired_servers(
    resources: &[GatewayService],
    config: &OperatorConfig,
) -> Result<Vec<Server>> {
    let validated = active(resources)
        .into_iter()
        .map(|r| Ok((r, validate_material(r)?)))
        .collect::<Result<Vec<_>>>()?;
    build_servers(&validated, config)
}

/// Builds one server per already validated resource, in the order given, or the default server
/// when there are none.
pub fn build_servers(
    validated: &[(&GatewayService, Validated)],
    config: &OperatorConfig,
) -> Result<Vec<Server>> {
    let mut servers = Vec::with_capacity(validated.len().max(1));
    for (resource, v) in validated {
        let namespace = resource.namespace().ok_or(Error::IllegalDocument)?;
        let tls = resolve_tls(
            &resource.name_any(),
            &namespace,
            v.material.as_ref(),
            v.mode,
        )?;
        servers.push(build_server(resource, &namespace, tls));
    }
    if servers.is_empty() {
        servers.push(default_server(&config.default_host));
    }
    Ok(servers)
}

/// Replaces the servers of `{namespace}-{traffic_type}-gateway` with one server per
/// GatewayService in the namespace that targets `traffic_type`. Nothing is written unless every
/// resource validates.
#[instrument(skip(api, config))]
pub async fn reconcile_gateway(
    api: &dyn ClusterApi,
    config: &OperatorConfig,
    namespace: &str,
    traffic_type: TrafficType,
) -> Result<Outcome> {
    let name = naming::gateway_name(namespace, traffic_type);
    let Some(mut gateway) = api.fetch_gateway(&name, namespace).await? else {
        info!("Gateway {} not found in {}, skipping", name, namespace);
        return Ok(Outcome::NotProvisioned);
    };

    let resources = api.list_resources(namespace, traffic_type).await?;
    let mut validated = Vec::with_capacity(resources.len());
    for resource in active(&resources) {
        validated.push((resource, validate(resource, api, config).await?));
    }
    let servers = build_servers(&validated, config)?;

    debug!("Writing {} servers to gateway {}", servers.len(), name);
    gateway.spec.servers = servers.clone();
    api.persist_gateway(&gateway).await?;
    Ok(Outcome::Updated { servers })
}
