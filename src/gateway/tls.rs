use crate::naming;
use crate::{Error, Result};
use gateway_service_operator_types::v1alpha1::TlsOptions;
use gateway_service_operator_types::v1alpha3::{ServerTls, TlsMode};

/// Maps the mode string of a GatewayService onto the gateway TLS mode. Matching is exact and
/// case-sensitive; anything else is rejected rather than defaulted.
pub fn tls_mode(mode: &str) -> Result<TlsMode> {
    match mode {
        "SIMPLE" => Ok(TlsMode::Simple),
        "PASSTHROUGH" => Ok(TlsMode::Passthrough),
        "MUTUAL" => Ok(TlsMode::Mutual),
        "AUTO_PASSTHROUGH" => Ok(TlsMode::AutoPassthrough),
        "ISTIO_MUTUAL" => Ok(TlsMode::IstioMutual),
        other => Err(Error::InvalidMode(other.to_string())),
    }
}

/// Where the certificate for a server comes from. A resource carries at most one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TlsMaterial {
    /// Base64 cert and key, stored by the operator in a secret it owns.
    Inline { cert: String, key: String },
    /// A secret that already exists.
    Reference { secret_name: String },
    /// Files mounted into the gateway pod.
    FileMount { cert_path: String, key_path: String },
}

impl TlsMaterial {
    pub const INLINE: &'static str = "tlsSecret";
    pub const REFERENCE: &'static str = "tlsSecretRef";
    pub const FILE_MOUNT: &'static str = "tlsSecretPath";

    /// Turns the wire form, three optional members, into a single variant. Setting more than
    /// one member is an error instead of silently picking a winner.
    pub fn from_options(options: Option<&TlsOptions>) -> Result<Option<TlsMaterial>> {
        let Some(options) = options else {
            return Ok(None);
        };

        let set: Vec<&'static str> = [
            (Self::INLINE, options.tls_secret.is_some()),
            (Self::REFERENCE, options.tls_secret_ref.is_some()),
            (Self::FILE_MOUNT, options.tls_secret_path.is_some()),
        ]
        .into_iter()
        .filter_map(|(field, present)| present.then_some(field))
        .collect();
        if set.len() > 1 {
            return Err(Error::MultipleTlsOptions(set));
        }

        if let Some(secret) = &options.tls_secret {
            return match (&secret.cert, &secret.key) {
                (Some(cert), Some(key)) => Ok(Some(TlsMaterial::Inline {
                    cert: cert.clone(),
                    key: key.clone(),
                })),
                _ => Err(Error::IncompleteInlineSecret),
            };
        }
        if let Some(reference) = &options.tls_secret_ref {
            return Ok(Some(TlsMaterial::Reference {
                secret_name: reference.secret_name.clone(),
            }));
        }
        if let Some(path) = &options.tls_secret_path {
            return Ok(Some(TlsMaterial::FileMount {
                cert_path: path.cert_path.clone(),
                key_path: path.key_path.clone(),
            }));
        }
        Ok(None)
    }

    pub fn field(&self) -> &'static str {
        match self {
            TlsMaterial::Inline { .. } => Self::INLINE,
            TlsMaterial::Reference { .. } => Self::REFERENCE,
            TlsMaterial::FileMount { .. } => Self::FILE_MOUNT,
        }
    }
}

/// Builds the TLS block of a server for the resource `name` in `namespace`.
///
/// PASSTHROUGH servers never terminate TLS, so file mounts make no sense there and are
/// rejected. They may reference a secret verbatim or use the operator managed one, and need
/// no material at all. Every other mode requires material.
pub fn resolve_tls(
    name: &str,
    namespace: &str,
    material: Option<&TlsMaterial>,
    mode: TlsMode,
) -> Result<ServerTls> {
    match (mode, material) {
        (TlsMode::Passthrough, Some(m @ TlsMaterial::FileMount { .. })) => {
            Err(Error::UnsupportedTlsOption {
                option: m.field(),
                mode,
            })
        }
        (TlsMode::Passthrough, None) => Ok(ServerTls::mode_only(mode)),
        (_, None) => Err(Error::MissingTlsOption(mode)),
        (_, Some(TlsMaterial::FileMount { cert_path, key_path })) => {
            Ok(ServerTls::files(mode, cert_path, key_path))
        }
        (_, Some(TlsMaterial::Reference { secret_name })) => {
            Ok(ServerTls::credential(mode, secret_name))
        }
        (_, Some(TlsMaterial::Inline { .. })) => Ok(ServerTls::credential(
            mode,
            naming::secret_name(name, namespace),
        )),
    }
}
