pub mod v1alpha1;
pub mod v1alpha3;
