use crate::Error;
use gateway_service_operator_types::v1alpha1::{
    Condition, CreatedSecretDetails, GatewayServiceStatus,
};

pub const NO_ERROR: &str = "No error found";

pub fn success(created_secret: Option<CreatedSecretDetails>) -> GatewayServiceStatus {
    GatewayServiceStatus {
        condition: Condition {
            success: true,
            error_message: NO_ERROR.to_string(),
            created_secret_details: created_secret,
        },
    }
}

/// `created_secret` names a derived secret that exists despite the failure, if any.
pub fn failure(
    error: &Error,
    created_secret: Option<CreatedSecretDetails>,
) -> GatewayServiceStatus {
    GatewayServiceStatus {
        condition: Condition {
            success: false,
            error_message: error.to_string(),
            created_secret_details: created_secret,
        },
    }
}
