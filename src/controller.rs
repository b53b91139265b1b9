use crate::cluster::{ClusterApi, KubeClusterApi};
use crate::config::OperatorConfig;
use crate::gateway::{reconcile_gateway, Outcome};
use crate::secret::{delete_secrets, ensure_secret, existing_secret};
use crate::validate::validate;
use crate::{status, Error, Result};
use futures::StreamExt;
use gateway_service_operator_types::v1alpha1::{
    CreatedSecretDetails, GatewayService, TrafficType,
};
use k8s_openapi::api::core::v1::Secret;
use kube::{
    api::Api,
    client::Client,
    runtime::{
        controller::{Action, Config, Controller},
        finalizer::{self, finalizer, Event as Finalizer},
        watcher,
    },
    ResourceExt,
};
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{error, info, warn};

pub static GATEWAY_SERVICE_FINALIZER: &str = "gatewayservice.crd.gatewayservice.io";

#[derive(Clone)]
pub struct Context {
    pub client: Client,
    pub cluster: Arc<dyn ClusterApi>,
    pub config: OperatorConfig,
}

#[derive(Clone, Default)]
pub struct State {
    pub config: OperatorConfig,
}

impl State {
    pub fn new(config: OperatorConfig) -> Self {
        Self { config }
    }
}

pub async fn reconcile(resource: Arc<GatewayService>, ctx: Arc<Context>) -> Result<Action> {
    let ns = resource.namespace().ok_or(Error::IllegalDocument)?;
    let resources: Api<GatewayService> = Api::namespaced(ctx.client.clone(), &ns);

    info!(
        "Reconciling GatewayService \"{}\" in {}",
        resource.name_any(),
        ns
    );
    finalizer(
        &resources,
        GATEWAY_SERVICE_FINALIZER,
        resource,
        |event| async {
            match event {
                Finalizer::Apply(gs) => apply(&gs, ctx.cluster.as_ref(), &ctx.config).await,
                Finalizer::Cleanup(gs) => cleanup(&gs, ctx.cluster.as_ref(), &ctx.config).await,
            }
        },
    )
    .await
    .map_err(|e| match e {
        finalizer::Error::ApplyFailed(e) | finalizer::Error::CleanupFailed(e) => e,
        e => Error::FinalizerError(Box::new(e)),
    })
}

/// Brings the cluster in line with one GatewayService. Its secret exists, the gateways of the
/// namespace reflect it, and its status reports the result.
pub async fn apply(
    resource: &GatewayService,
    api: &dyn ClusterApi,
    config: &OperatorConfig,
) -> Result<Action> {
    match apply_resource(resource, api, config).await {
        Ok(created_secret) => {
            api.update_resource_status(resource, status::success(created_secret))
                .await?;
            Ok(Action::requeue(Duration::from_secs(config.requeue_secs)))
        }
        Err(e) => {
            warn!(
                "Failed to reconcile GatewayService {}: {}",
                resource.name_any(),
                e
            );
            let created_secret = existing_secret(resource, api, config).await;
            if let Err(status_err) = api
                .update_resource_status(resource, status::failure(&e, created_secret))
                .await
            {
                warn!("Failed to record failure status: {}", status_err);
            }
            Err(e)
        }
    }
}

async fn apply_resource(
    resource: &GatewayService,
    api: &dyn ClusterApi,
    config: &OperatorConfig,
) -> Result<Option<CreatedSecretDetails>> {
    let ns = resource.namespace().ok_or(Error::IllegalDocument)?;
    let validated = validate(resource, api, config).await?;
    let created_secret = ensure_secret(resource, &validated, api, config).await?;

    // The other gateway may still carry this resource if its traffic type changed.
    for traffic_type in TrafficType::ALL {
        if let Outcome::NotProvisioned = reconcile_gateway(api, config, &ns, traffic_type).await? {
            info!(
                "Gateway for {} traffic in {} is not provisioned yet",
                traffic_type, ns
            );
        }
    }
    Ok(created_secret)
}

/// Removes the contribution of a deleted GatewayService. Both gateways are rebuilt since the
/// traffic type may have changed during the life of the resource.
pub async fn cleanup(
    resource: &GatewayService,
    api: &dyn ClusterApi,
    config: &OperatorConfig,
) -> Result<Action> {
    let ns = resource.namespace().ok_or(Error::IllegalDocument)?;
    for traffic_type in TrafficType::ALL {
        reconcile_gateway(api, config, &ns, traffic_type).await?;
    }
    delete_secrets(resource, api, config).await?;
    Ok(Action::await_change())
}

fn error_policy(resource: Arc<GatewayService>, error: &Error, ctx: Arc<Context>) -> Action {
    if error.is_validation() {
        warn!("GatewayService {} is invalid: {}", resource.name_any(), error);
    } else {
        error!("Reconciling {} failed: {}", resource.name_any(), error);
    }
    Action::requeue(Duration::from_secs(ctx.config.error_requeue_secs))
}

pub async fn run(state: State) -> anyhow::Result<()> {
    let client = Client::try_default().await?;

    let resources = Api::<GatewayService>::all(client.clone());
    let secrets = Api::<Secret>::all(client.clone());

    let config = Config::default();
    let ctx = Context {
        cluster: Arc::new(KubeClusterApi::new(client.clone())),
        client,
        config: state.config.clone(),
    };

    Controller::new(resources, watcher::Config::default())
        .owns(secrets, watcher::Config::default())
        .with_config(config)
        .shutdown_on_signal()
        .run(reconcile, error_policy, Arc::new(ctx))
        .for_each(|res| async move {
            match res {
                Ok(o) => info!("reconciled {:?}", o),
                Err(e) => warn!("reconcile failed: {}", e),
            }
        })
        .await;
    Ok(())
}
