use anyhow::{anyhow, Result};
use controller::{config::OperatorConfig, State};

use config::Config;
use gateway_service_operator_types::v1alpha1::GatewayService;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::{
    api::{Api, Patch, PatchParams, PostParams},
    client::Client,
    CustomResourceExt,
};
use opentelemetry::KeyValue;
use opentelemetry_sdk::{
    trace::{RandomIdGenerator, Sampler},
    Resource,
};
use std::io::IsTerminal;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;

#[tokio::main]
async fn main() -> Result<()> {
    let args = std::env::args().collect::<Vec<_>>();
    if args.iter().any(|arg| arg == "-V" || arg == "--version") {
        let version = version();
        println!("{} {version}", env!("CARGO_BIN_NAME"));
        std::process::exit(0);
    }

    let tracing_enabled = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").is_ok();
    configure_tracing(tracing_enabled).map_err(|e| {
        error!("Failed to configure tracing: {}", e);
        e
    })?;
    info!("Starting operator");

    let cfg = Config::builder()
        .add_source(config::Environment::with_prefix("GATEWAY_SERVICE_OPERATOR"))
        .build()
        .map_err(|e| anyhow!("Failed to build config: {}", e))?;
    let config: OperatorConfig = cfg
        .try_deserialize()
        .map_err(|e| anyhow!("Failed to parse config: {}", e))?;

    if config.install_crd {
        let client = Client::try_default().await?;
        install_crd(&client).await?;
    }

    let state = State::new(config);
    controller::run(state).await?;
    info!("Controller finished");
    Ok(())
}

fn configure_tracing(enabled: bool) -> anyhow::Result<()> {
    let env_filter_layer = tracing_subscriber::EnvFilter::from_default_env();
    let log_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal());

    if enabled {
        let tracer = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(opentelemetry_otlp::new_exporter().tonic())
            .with_trace_config(
                opentelemetry_sdk::trace::config()
                    .with_sampler(Sampler::AlwaysOn)
                    .with_id_generator(RandomIdGenerator::default())
                    .with_max_attributes_per_span(32)
                    .with_max_events_per_span(32)
                    .with_resource(Resource::new(vec![KeyValue::new(
                        "service.name",
                        "gateway-service-operator",
                    )])),
            )
            .install_simple()?;
        let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);

        let subscriber = tracing_subscriber::Registry::default()
            .with(env_filter_layer)
            .with(log_layer)
            .with(otel_layer);

        let _ = tracing::subscriber::set_global_default(subscriber);
    } else {
        let subscriber = tracing_subscriber::Registry::default()
            .with(env_filter_layer)
            .with(log_layer);

        let _ = tracing::subscriber::set_global_default(subscriber);
    }
    Ok(())
}

// Install or update the GatewayService CRD. The Istio Gateway CRD is owned by Istio.
async fn install_crd(client: &Client) -> anyhow::Result<()> {
    let crds = Api::<CustomResourceDefinition>::all(client.clone());
    let crd = &GatewayService::crd();

    let crd_name = crd
        .metadata
        .name
        .as_ref()
        .ok_or_else(|| anyhow!("generated CRD has no name"))?;
    if let Some(old_crd) = crds.get_opt(crd_name.as_str()).await? {
        if old_crd.spec != crd.spec {
            info!("Updating CRD");
            crds.patch(
                crd_name.as_str(),
                // regarding +yaml: https://kubernetes.io/docs/reference/using-api/server-side-apply/#serialization
                &PatchParams::apply("application/apply-patch+yaml").force(),
                &Patch::Apply(crd),
            )
            .await?;
        }
    } else {
        info!("Creating CRD");
        crds.create(&PostParams::default(), crd)
            .await
            .map_err(|e| anyhow!("failed to create crd: {e}"))?;
    }
    Ok(())
}

fn version() -> &'static str {
    option_env!("CARGO_VERSION_INFO").unwrap_or(env!("CARGO_PKG_VERSION"))
}
