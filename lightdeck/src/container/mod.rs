pub mod deployment_spec;
pub mod service_spec;
pub mod status;

pub use deployment_spec::{ContainerSpec, DeploymentSpec, HealthCheckPolicy, Protocol, PublicEndpoint};
pub use service_spec::{Power, ServiceSpec, DEFAULT_SCALE, SCALES};
pub use status::{RemoteDeployment, RemoteServiceState};
