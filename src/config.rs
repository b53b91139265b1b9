use serde::{Deserialize, Serialize};

/// Configuration for the operator. If you are configuring the operator using environment variables
/// then all values need to be prefixed with "GATEWAY_SERVICE_OPERATOR".
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OperatorConfig {
    /// Namespace of the gateway workloads. Secrets for SIMPLE servers are created here so that
    /// the gateway can read them over SDS.
    #[serde(default = "default_secret_namespace")]
    pub secret_namespace: String,
    /// Host of the catch-all server written when no GatewayService targets a gateway.
    #[serde(default = "default_host")]
    pub default_host: String,
    #[serde(default = "default_requeue_secs")]
    pub requeue_secs: u64,
    #[serde(default = "default_error_requeue_secs")]
    pub error_requeue_secs: u64,
    #[serde(default = "default_install_crd")]
    pub install_crd: bool,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            secret_namespace: default_secret_namespace(),
            default_host: default_host(),
            requeue_secs: default_requeue_secs(),
            error_requeue_secs: default_error_requeue_secs(),
            install_crd: default_install_crd(),
        }
    }
}

fn default_secret_namespace() -> String {
    "istio-system".to_string()
}

fn default_host() -> String {
    "*".to_string()
}

fn default_requeue_secs() -> u64 {
    5 * 60
}

fn default_error_requeue_secs() -> u64 {
    5
}

fn default_install_crd() -> bool {
    true
}
