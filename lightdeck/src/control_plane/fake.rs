use super::{ControlPlane, LogPage, LogQuery, ServiceLookup};
use crate::container::{DeploymentSpec, Power, RemoteDeployment, RemoteServiceState, ServiceSpec};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    GetServiceState(String),
    CreateService(ServiceSpec, DeploymentSpec),
    UpdateServiceAttributes(String, Power, u32),
    CreateDeploymentRevision(String, DeploymentSpec),
    GetDeploymentHistory(String),
    GetContainerLogPage(LogQuery, Option<String>),
}

/// In-memory control plane that records every call. Log pages are keyed
/// by container; the continuation token is the index of the next page.
#[derive(Default)]
pub struct FakeControlPlane {
    pub service: Option<RemoteServiceState>,
    pub lookup_error: Option<String>,
    pub history: Vec<RemoteDeployment>,
    pub pages: BTreeMap<String, Vec<LogPage>>,
    pub(crate) calls: Mutex<Vec<Call>>,
}

impl FakeControlPlane {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    pub fn mutated(&self) -> bool {
        self.calls().iter().any(|call| {
            matches!(
                call,
                Call::CreateService(..) | Call::UpdateServiceAttributes(..) | Call::CreateDeploymentRevision(..)
            )
        })
    }

    fn record(&self, call: Call) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

#[async_trait]
impl ControlPlane for FakeControlPlane {
    async fn get_service_state(&self, name: &str) -> Result<ServiceLookup> {
        self.record(Call::GetServiceState(name.to_string()));
        if let Some(message) = &self.lookup_error {
            return Err(Error::remote("GetContainerServices", message));
        }
        Ok(match &self.service {
            Some(state) if state.container_service_name == name => ServiceLookup::Found(Box::new(state.clone())),
            _ => ServiceLookup::NotFound,
        })
    }

    async fn create_service(&self, service: &ServiceSpec, deployment: &DeploymentSpec) -> Result<()> {
        self.record(Call::CreateService(service.clone(), deployment.clone()));
        Ok(())
    }

    async fn update_service_attributes(&self, name: &str, power: Power, scale: u32) -> Result<()> {
        self.record(Call::UpdateServiceAttributes(name.to_string(), power, scale));
        Ok(())
    }

    async fn create_deployment_revision(&self, name: &str, deployment: &DeploymentSpec) -> Result<()> {
        self.record(Call::CreateDeploymentRevision(name.to_string(), deployment.clone()));
        Ok(())
    }

    async fn get_deployment_history(&self, name: &str) -> Result<Vec<RemoteDeployment>> {
        self.record(Call::GetDeploymentHistory(name.to_string()));
        Ok(self.history.clone())
    }

    async fn get_container_log_page(&self, query: &LogQuery, page_token: Option<&str>) -> Result<LogPage> {
        self.record(Call::GetContainerLogPage(query.clone(), page_token.map(str::to_string)));
        let index = match page_token {
            None => 0,
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| Error::remote("GetContainerLog", format!("bad token {}", token)))?,
        };
        Ok(self
            .pages
            .get(&query.container_name)
            .and_then(|pages| pages.get(index))
            .cloned()
            .unwrap_or_default())
    }
}
