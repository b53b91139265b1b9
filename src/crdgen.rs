use gateway_service_operator_types::v1alpha1::GatewayService;
use kube::CustomResourceExt;

fn main() -> Result<(), serde_yaml::Error> {
    print!("{}", serde_yaml::to_string(&GatewayService::crd())?);
    Ok(())
}
