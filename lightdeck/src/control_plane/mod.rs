pub mod http;

#[cfg(test)]
pub mod fake;

pub use http::HttpControlPlane;

use crate::container::{DeploymentSpec, Power, RemoteDeployment, RemoteServiceState, ServiceSpec};
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Outcome of looking a service up by name. Absence is an ordinary answer
/// here, not an error; every other failure comes back as `Err`.
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceLookup {
    Found(Box<RemoteServiceState>),
    NotFound,
}

impl ServiceLookup {
    /// Turns absence into `Error::NotFound` for callers with no create path.
    pub fn require(self, name: &str) -> Result<RemoteServiceState> {
        match self {
            ServiceLookup::Found(state) => Ok(*state),
            ServiceLookup::NotFound => Err(Error::NotFound(name.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LogQuery {
    pub service_name: String,
    pub container_name: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub filter_pattern: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteLogEvent {
    pub created_at: DateTime<Utc>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LogPage {
    pub events: Vec<RemoteLogEvent>,
    pub next_page_token: Option<String>,
}

/// The remote control plane hosting container services.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    async fn get_service_state(&self, name: &str) -> Result<ServiceLookup>;

    async fn create_service(&self, service: &ServiceSpec, deployment: &DeploymentSpec) -> Result<()>;

    async fn update_service_attributes(&self, name: &str, power: Power, scale: u32) -> Result<()>;

    async fn create_deployment_revision(&self, name: &str, deployment: &DeploymentSpec) -> Result<()>;

    /// Deployments of the service, most recent first.
    async fn get_deployment_history(&self, name: &str) -> Result<Vec<RemoteDeployment>>;

    async fn get_container_log_page(&self, query: &LogQuery, page_token: Option<&str>) -> Result<LogPage>;
}
