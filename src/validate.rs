use crate::cluster::ClusterApi;
use crate::config::OperatorConfig;
use crate::gateway::tls::{tls_mode, TlsMaterial};
use crate::naming;
use crate::{Error, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use gateway_service_operator_types::v1alpha1::GatewayService;
use gateway_service_operator_types::v1alpha3::TlsMode;
use kube::ResourceExt;
use secrecy::SecretVec;
use tracing::debug;

/// A GatewayService whose preconditions hold: the mode is known and the TLS material is
/// unambiguous and well formed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Validated {
    pub mode: TlsMode,
    pub material: Option<TlsMaterial>,
}

/// Certificate and key decoded from an inline secret.
pub struct DecodedSecret {
    pub cert: Vec<u8>,
    pub key: SecretVec<u8>,
}

pub fn decode(field: &'static str, data: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(data)
        .map_err(|source| Error::InvalidEncoding { field, source })
}

/// Checks that the cert and key of an inline secret are standard, padded base64.
pub fn validate_encoding(cert: &str, key: &str) -> Result<DecodedSecret> {
    Ok(DecodedSecret {
        cert: decode("cert", cert)?,
        key: SecretVec::new(decode("key", key)?),
    })
}

/// The checks that need nothing but the resource itself.
pub fn validate_material(resource: &GatewayService) -> Result<Validated> {
    let mode = tls_mode(&resource.spec.mode)?;
    if resource.spec.hosts.is_empty() {
        return Err(Error::MissingHosts);
    }
    if !(1..=65535).contains(&resource.spec.port) {
        return Err(Error::InvalidPort(resource.spec.port));
    }

    let material = TlsMaterial::from_options(resource.spec.tls_options.as_ref())?;
    match &material {
        // PASSTHROUGH secrets are handled by the application and may not be known to us.
        None if mode != TlsMode::Passthrough => return Err(Error::MissingTlsOption(mode)),
        Some(TlsMaterial::Inline { cert, key }) => {
            validate_encoding(cert, key)?;
        }
        _ => {}
    }
    Ok(Validated { mode, material })
}

/// Runs every precondition, including the point-in-time check that a referenced secret exists
/// in the namespace the gateway will read it from.
pub async fn validate(
    resource: &GatewayService,
    api: &dyn ClusterApi,
    config: &OperatorConfig,
) -> Result<Validated> {
    let validated = validate_material(resource)?;

    if let Some(TlsMaterial::Reference { secret_name }) = &validated.material {
        let own_namespace = resource.namespace().ok_or(Error::IllegalDocument)?;
        let namespace =
            naming::secret_namespace(validated.mode, &own_namespace, &config.secret_namespace);
        let found = if secret_name.is_empty() {
            false
        } else {
            api.fetch_secret(secret_name, namespace).await?.is_some()
        };
        if !found {
            return Err(Error::DanglingSecretReference {
                name: secret_name.clone(),
                namespace: namespace.to_string(),
            });
        }
        debug!("Found referenced secret {} in {}", secret_name, namespace);
    }

    Ok(validated)
}
