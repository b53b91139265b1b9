use crate::cluster::ClusterApi;
use crate::config::OperatorConfig;
use crate::gateway::tls::{tls_mode, TlsMaterial};
use crate::naming;
use crate::validate::{validate_encoding, Validated};
use crate::{Error, Result};
use gateway_service_operator_types::v1alpha1::{CreatedSecretDetails, GatewayService};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::{api::ObjectMeta, Resource, ResourceExt};
use secrecy::{ExposeSecret, SecretVec};
use std::collections::BTreeMap;
use tracing::{debug, info};

pub const TLS_SECRET_TYPE: &str = "kubernetes.io/tls";
pub const TLS_CERT_KEY: &str = "tls.crt";
pub const TLS_PRIVATE_KEY_KEY: &str = "tls.key";
/// Records which namespace the owning GatewayService lives in, since a SIMPLE secret sits in
/// the gateway namespace instead.
pub const NAMESPACE_LABEL: &str = "Namespace";
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";
pub const MANAGED_BY: &str = "gateway-service-operator";

/// The TLS secret the operator creates from the inline cert and key of a GatewayService.
pub struct DerivedSecret {
    pub name: String,
    pub namespace: String,
    pub owner_namespace: String,
    pub cert: Vec<u8>,
    pub key: SecretVec<u8>,
}

impl DerivedSecret {
    pub fn new(
        resource: &GatewayService,
        validated: &Validated,
        config: &OperatorConfig,
    ) -> Result<Option<Self>> {
        let Some(TlsMaterial::Inline { cert, key }) = &validated.material else {
            return Ok(None);
        };
        let owner_namespace = resource.namespace().ok_or(Error::IllegalDocument)?;
        let decoded = validate_encoding(cert, key)?;
        Ok(Some(Self {
            name: naming::secret_name(&resource.name_any(), &owner_namespace),
            namespace: naming::secret_namespace(
                validated.mode,
                &owner_namespace,
                &config.secret_namespace,
            )
            .to_string(),
            owner_namespace,
            cert: decoded.cert,
            key: decoded.key,
        }))
    }

    pub fn details(&self) -> CreatedSecretDetails {
        CreatedSecretDetails {
            secret_name: self.name.clone(),
            secret_namespace: self.namespace.clone(),
        }
    }

    /// Builds the Secret object. Kubernetes ignores owner references that cross namespaces, so
    /// the owner is only recorded when the secret sits next to its GatewayService; the other
    /// case is cleaned up by the finalizer.
    pub fn to_secret(&self, owner: &GatewayService) -> Secret {
        let owner_references = if self.namespace == self.owner_namespace {
            owner.controller_owner_ref(&()).map(|r| vec![r])
        } else {
            None
        };
        let labels = BTreeMap::from([
            (NAMESPACE_LABEL.to_string(), self.owner_namespace.clone()),
            (MANAGED_BY_LABEL.to_string(), MANAGED_BY.to_string()),
        ]);
        let data = BTreeMap::from([
            (TLS_CERT_KEY.to_string(), ByteString(self.cert.clone())),
            (
                TLS_PRIVATE_KEY_KEY.to_string(),
                ByteString(self.key.expose_secret().clone()),
            ),
        ]);
        Secret {
            metadata: ObjectMeta {
                name: Some(self.name.clone()),
                namespace: Some(self.namespace.clone()),
                labels: Some(labels),
                owner_references,
                ..Default::default()
            },
            data: Some(data),
            type_: Some(TLS_SECRET_TYPE.to_string()),
            ..Default::default()
        }
    }
}

/// Creates the derived secret of a GatewayService with an inline cert and key, unless a secret
/// of that name already exists. Existing secrets are never updated.
pub async fn ensure_secret(
    resource: &GatewayService,
    validated: &Validated,
    api: &dyn ClusterApi,
    config: &OperatorConfig,
) -> Result<Option<CreatedSecretDetails>> {
    let Some(derived) = DerivedSecret::new(resource, validated, config)? else {
        return Ok(None);
    };

    if api
        .fetch_secret(&derived.name, &derived.namespace)
        .await?
        .is_some()
    {
        debug!(
            "Secret {} already exists in {}",
            derived.name, derived.namespace
        );
    } else {
        info!("Creating secret {} in {}", derived.name, derived.namespace);
        api.create_secret(derived.to_secret(resource)).await?;
    }
    Ok(Some(derived.details()))
}

/// The derived secret of a GatewayService with an inline cert and key, if it currently exists.
/// Used to keep reporting the secret when a later step of a pass fails.
pub async fn existing_secret(
    resource: &GatewayService,
    api: &dyn ClusterApi,
    config: &OperatorConfig,
) -> Option<CreatedSecretDetails> {
    let mode = tls_mode(&resource.spec.mode).ok()?;
    resource.spec.tls_options.as_ref()?.tls_secret.as_ref()?;
    let namespace = resource.namespace()?;
    let details = CreatedSecretDetails {
        secret_name: naming::secret_name(&resource.name_any(), &namespace),
        secret_namespace: naming::secret_namespace(mode, &namespace, &config.secret_namespace)
            .to_string(),
    };
    match api
        .fetch_secret(&details.secret_name, &details.secret_namespace)
        .await
    {
        Ok(Some(_)) => Some(details),
        Ok(None) => None,
        Err(e) => {
            debug!("Failed to look up secret {}: {}", details.secret_name, e);
            None
        }
    }
}

/// Removes the derived secret of a GatewayService that is going away, from both namespaces it
/// may have been created in.
///
/// Only deletion gets this treatment. A GatewayService that moves between SIMPLE and another
/// mode while it lives leaves the secret created under the previous mode behind.
pub async fn delete_secrets(
    resource: &GatewayService,
    api: &dyn ClusterApi,
    config: &OperatorConfig,
) -> Result<()> {
    let namespace = resource.namespace().ok_or(Error::IllegalDocument)?;
    let name = naming::secret_name(&resource.name_any(), &namespace);
    for ns in [config.secret_namespace.as_str(), namespace.as_str()] {
        let Some(secret) = api.fetch_secret(&name, ns).await? else {
            continue;
        };
        // Only touch secrets this operator created for this resource.
        let labels = secret.labels();
        if labels.get(MANAGED_BY_LABEL).map(String::as_str) == Some(MANAGED_BY)
            && labels.get(NAMESPACE_LABEL) == Some(&namespace)
        {
            info!("Deleting secret {} in {}", name, ns);
            api.delete_secret(&name, ns).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::{opaque_secret, service, with_inline, with_reference, FakeCluster, CERT, KEY};
    use crate::validate::validate_material;

    #[test]
    fn test_secret_reconcile() {
        let gs = with_inline(service("example-app", "application", "PASSTHROUGH"), CERT, KEY);
        let validated = validate_material(&gs).unwrap();
        let derived = DerivedSecret::new(&gs, &validated, &OperatorConfig::default())
            .unwrap()
            .expect("inline material yields a secret");
        let secret = derived.to_secret(&gs);

        assert_eq!(secret.metadata.name.as_deref(), Some("example-app-application-secret"));
        assert_eq!(secret.metadata.namespace.as_deref(), Some("application"));
        assert_eq!(secret.type_.as_deref(), Some("kubernetes.io/tls"));
        assert_eq!(
            secret.labels().get("Namespace").map(String::as_str),
            Some("application")
        );
        let data = secret.data.unwrap();
        assert_eq!(data["tls.crt"], ByteString(b"Cert\n".to_vec()));
        assert_eq!(data["tls.key"], ByteString(b"Key\n".to_vec()));

        let owners = secret.metadata.owner_references.unwrap();
        assert_eq!(owners.len(), 1);
        assert_eq!(owners[0].kind, "GatewayService");
        assert_eq!(owners[0].name, "example-app");
        assert_eq!(owners[0].controller, Some(true));
    }

    #[test]
    fn test_simple_secret_lives_in_gateway_namespace_without_owner() {
        let gs = with_inline(service("example-app", "application", "SIMPLE"), CERT, KEY);
        let validated = validate_material(&gs).unwrap();
        let derived = DerivedSecret::new(&gs, &validated, &OperatorConfig::default())
            .unwrap()
            .unwrap();
        assert_eq!(derived.namespace, "istio-system");
        let secret = derived.to_secret(&gs);
        assert!(secret.metadata.owner_references.is_none());
        assert_eq!(
            derived.details(),
            CreatedSecretDetails {
                secret_name: "example-app-application-secret".to_string(),
                secret_namespace: "istio-system".to_string(),
            }
        );
    }

    #[test]
    fn test_no_secret_without_inline_material() {
        let gs = with_reference(service("example-app", "application", "SIMPLE"), "example-secret");
        let validated = validate_material(&gs).unwrap();
        assert!(DerivedSecret::new(&gs, &validated, &OperatorConfig::default())
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_ensure_secret_is_create_if_absent() {
        let api = FakeCluster::new();
        let config = OperatorConfig::default();
        let gs = with_inline(service("example-app", "application", "MUTUAL"), CERT, KEY);
        let validated = validate_material(&gs).unwrap();

        let details = ensure_secret(&gs, &validated, &api, &config).await.unwrap();
        assert_eq!(
            details.map(|d| d.secret_namespace),
            Some("application".to_string())
        );
        assert_eq!(api.state().secret_creates, 1);

        // A changed cert does not rewrite the secret.
        let changed = with_inline(gs.clone(), "TmV3Cg==", KEY);
        let validated = validate_material(&changed).unwrap();
        ensure_secret(&changed, &validated, &api, &config).await.unwrap();
        assert_eq!(api.state().secret_creates, 1);
        let stored = api
            .secret("example-app-application-secret", "application")
            .unwrap();
        assert_eq!(stored.data.unwrap()["tls.crt"], ByteString(b"Cert\n".to_vec()));
    }

    #[tokio::test]
    async fn test_mode_transition_leaves_previous_secret_behind() {
        // Known limitation: only deletion of the GatewayService cleans up.
        let api = FakeCluster::new();
        let config = OperatorConfig::default();
        let simple = with_inline(service("example-app", "application", "SIMPLE"), CERT, KEY);
        ensure_secret(&simple, &validate_material(&simple).unwrap(), &api, &config)
            .await
            .unwrap();

        let mut passthrough = simple.clone();
        passthrough.spec.mode = "PASSTHROUGH".to_string();
        ensure_secret(
            &passthrough,
            &validate_material(&passthrough).unwrap(),
            &api,
            &config,
        )
        .await
        .unwrap();

        assert!(api
            .secret("example-app-application-secret", "istio-system")
            .is_some());
        assert!(api
            .secret("example-app-application-secret", "application")
            .is_some());

        delete_secrets(&passthrough, &api, &config).await.unwrap();
        assert!(api
            .secret("example-app-application-secret", "istio-system")
            .is_none());
        assert!(api
            .secret("example-app-application-secret", "application")
            .is_none());
    }

    #[tokio::test]
    async fn test_delete_secrets_leaves_foreign_secrets() {
        let api = FakeCluster::new()
            .with_secret(opaque_secret("example-app-application-secret", "istio-system"));
        let gs = with_inline(service("example-app", "application", "SIMPLE"), CERT, KEY);
        delete_secrets(&gs, &api, &OperatorConfig::default())
            .await
            .unwrap();
        assert!(api
            .secret("example-app-application-secret", "istio-system")
            .is_some());
    }
}
