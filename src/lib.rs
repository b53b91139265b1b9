use gateway_service_operator_types::v1alpha3::TlsMode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("SerializationError: {0}")]
    SerializationError(#[source] serde_json::Error),

    #[error("Kube Error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Finalizer Error: {0}")]
    // NB: awkward type because finalizer::Error embeds the reconciler error (which is this)
    // so boxing this error to break cycles
    FinalizerError(#[source] Box<kube::runtime::finalizer::Error<Error>>),

    #[error("IllegalDocument")]
    IllegalDocument,

    #[error("invalid TLS mode {0:?}, expected one of SIMPLE, PASSTHROUGH, MUTUAL, AUTO_PASSTHROUGH or ISTIO_MUTUAL")]
    InvalidMode(String),

    #[error("tlsOptions must set one of tlsSecret, tlsSecretRef or tlsSecretPath when mode is {0}")]
    MissingTlsOption(TlsMode),

    #[error("tlsOptions must set only one of tlsSecret, tlsSecretRef or tlsSecretPath, found {}", .0.join(", "))]
    MultipleTlsOptions(Vec<&'static str>),

    #[error("tlsSecret must set both cert and key")]
    IncompleteInlineSecret,

    #[error("tlsSecret {field} is not valid base64: {source}")]
    InvalidEncoding {
        field: &'static str,
        #[source]
        source: base64::DecodeError,
    },

    #[error("referenced secret {name} does not exist in namespace {namespace}")]
    DanglingSecretReference { name: String, namespace: String },

    #[error("{option} is not supported when mode is {mode}")]
    UnsupportedTlsOption { option: &'static str, mode: TlsMode },

    #[error("hosts cannot be empty")]
    MissingHosts,

    #[error("port {0} is outside of 1-65535")]
    InvalidPort(u32),
}
pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// Errors caused by the content of a resource rather than by the cluster. Retrying them
    /// only helps once the resource (or the secret it references) changes.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::InvalidMode(_)
                | Error::MissingTlsOption(_)
                | Error::MultipleTlsOptions(_)
                | Error::IncompleteInlineSecret
                | Error::InvalidEncoding { .. }
                | Error::DanglingSecretReference { .. }
                | Error::UnsupportedTlsOption { .. }
                | Error::MissingHosts
                | Error::InvalidPort(_)
        )
    }
}

pub mod cluster;
pub mod config;
pub mod controller;
pub mod gateway;
pub mod naming;
pub mod secret;
pub mod status;
pub mod validate;

#[cfg(test)]
pub(crate) mod testing;

pub use crate::controller::*;
