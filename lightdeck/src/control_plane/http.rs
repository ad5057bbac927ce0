use super::{ControlPlane, LogPage, LogQuery, RemoteLogEvent, ServiceLookup};
use crate::container::{
    ContainerSpec, DeploymentSpec, Power, PublicEndpoint, RemoteDeployment, RemoteServiceState,
    ServiceSpec,
};
use crate::error::{Error, Result};
use crate::utils::cancellable;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::{Client, StatusCode};
use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

const TARGET_PREFIX: &str = "Lightsail_20161128";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";

/// JSON-over-POST client for the container service control plane. Every
/// action goes to the same endpoint and is selected by the target header.
pub struct HttpControlPlane {
    client: Client,
    endpoint: String,
    token: Option<String>,
    cancel: CancellationToken,
}

#[derive(Debug)]
struct ApiFailure {
    status: StatusCode,
    kind: String,
    message: String,
}

impl ApiFailure {
    fn is_not_found(&self) -> bool {
        self.status == StatusCode::NOT_FOUND || self.kind.ends_with("NotFoundException")
    }

    fn describe(&self) -> String {
        match (self.kind.is_empty(), self.message.is_empty()) {
            (true, true) => format!("status {}", self.status),
            (true, false) => self.message.clone(),
            (false, true) => self.kind.clone(),
            (false, false) => format!("{}: {}", self.kind, self.message),
        }
    }
}

#[derive(Deserialize, Default)]
struct ErrorBody {
    #[serde(rename = "__type", default)]
    kind: String,
    #[serde(default, alias = "Message")]
    message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ServiceNameRequest<'a> {
    service_name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeploymentRequest<'a> {
    containers: &'a BTreeMap<String, ContainerSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    public_endpoint: Option<&'a PublicEndpoint>,
}

impl<'a> From<&'a DeploymentSpec> for DeploymentRequest<'a> {
    fn from(spec: &'a DeploymentSpec) -> Self {
        DeploymentRequest {
            containers: &spec.containers,
            public_endpoint: spec.public_endpoint.as_ref(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateServiceRequest<'a> {
    service_name: &'a str,
    power: Power,
    scale: u32,
    deployment: DeploymentRequest<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateServiceRequest<'a> {
    service_name: &'a str,
    power: Power,
    scale: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateDeploymentRequest<'a> {
    service_name: &'a str,
    #[serde(flatten)]
    deployment: DeploymentRequest<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LogRequest<'a> {
    service_name: &'a str,
    container_name: &'a str,
    #[serde(
        with = "chrono::serde::ts_seconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    start_time: Option<DateTime<Utc>>,
    #[serde(
        with = "chrono::serde::ts_seconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    end_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter_pattern: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_token: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServicesResponse {
    #[serde(default)]
    container_services: Vec<RemoteServiceState>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeploymentsResponse {
    #[serde(default)]
    deployments: Vec<RemoteDeployment>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogResponse {
    #[serde(default)]
    log_events: Vec<LogEventBody>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogEventBody {
    #[serde(deserialize_with = "epoch_seconds")]
    created_at: DateTime<Utc>,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct Ack {}

fn epoch_seconds<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let seconds = f64::deserialize(deserializer)?;
    let whole = seconds.floor();
    let nanos = (((seconds - whole) * 1e9).round() as u32).min(999_999_999);
    Utc.timestamp_opt(whole as i64, nanos)
        .single()
        .ok_or_else(|| de::Error::custom(format!("timestamp {} is out of range", seconds)))
}

impl HttpControlPlane {
    pub fn new(endpoint: &str, token: Option<String>, cancel: CancellationToken) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("lightdeck/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::remote("client setup", e))?;

        Ok(HttpControlPlane {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
            cancel,
        })
    }

    /// Sends one action. Transport failures are errors; a non-success
    /// response comes back as `Ok(Err(..))` so callers can branch on it.
    #[instrument(level = "debug", skip(self, body))]
    async fn send<B, T>(&self, action: &str, body: &B) -> Result<std::result::Result<T, ApiFailure>>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let payload = serde_json::to_vec(body).map_err(|e| Error::remote(action, e))?;
        debug!(payload = %String::from_utf8_lossy(&payload), "request");

        let mut request = self
            .client
            .post(&self.endpoint)
            .header("X-Amz-Target", format!("{}.{}", TARGET_PREFIX, action))
            .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE)
            .body(payload);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let (status, bytes) = cancellable(&self.cancel, async {
            let response = request.send().await.map_err(|e| Error::remote(action, e))?;
            let status = response.status();
            let bytes = response.bytes().await.map_err(|e| Error::remote(action, e))?;
            Ok::<_, Error>((status, bytes))
        })
        .await?;
        debug!(%status, "response");

        let body: &[u8] = if bytes.is_empty() { b"{}" } else { &bytes };
        if !status.is_success() {
            let parsed: ErrorBody = serde_json::from_slice(body).unwrap_or_default();
            let message = if parsed.kind.is_empty() && parsed.message.is_empty() {
                String::from_utf8_lossy(&bytes).trim().to_string()
            } else {
                parsed.message
            };
            return Ok(Err(ApiFailure {
                status,
                kind: parsed.kind,
                message,
            }));
        }

        serde_json::from_slice(body)
            .map(Ok)
            .map_err(|e| Error::remote(action, format!("malformed response: {}", e)))
    }

    async fn call<B, T>(&self, action: &str, body: &B) -> Result<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        self.send(action, body)
            .await?
            .map_err(|failure| Error::remote(action, failure.describe()))
    }
}

#[async_trait]
impl ControlPlane for HttpControlPlane {
    async fn get_service_state(&self, name: &str) -> Result<ServiceLookup> {
        let request = ServiceNameRequest { service_name: name };
        let response: ServicesResponse = match self.send("GetContainerServices", &request).await? {
            Ok(response) => response,
            Err(failure) if failure.is_not_found() => return Ok(ServiceLookup::NotFound),
            Err(failure) => return Err(Error::remote("GetContainerServices", failure.describe())),
        };

        Ok(response
            .container_services
            .into_iter()
            .find(|service| service.container_service_name == name)
            .map(|service| ServiceLookup::Found(Box::new(service)))
            .unwrap_or(ServiceLookup::NotFound))
    }

    async fn create_service(&self, service: &ServiceSpec, deployment: &DeploymentSpec) -> Result<()> {
        let request = CreateServiceRequest {
            service_name: service.name(),
            power: service.power,
            scale: service.scale,
            deployment: deployment.into(),
        };
        let _: Ack = self.call("CreateContainerService", &request).await?;
        Ok(())
    }

    async fn update_service_attributes(&self, name: &str, power: Power, scale: u32) -> Result<()> {
        let request = UpdateServiceRequest {
            service_name: name,
            power,
            scale,
        };
        let _: Ack = self.call("UpdateContainerService", &request).await?;
        Ok(())
    }

    async fn create_deployment_revision(&self, name: &str, deployment: &DeploymentSpec) -> Result<()> {
        let request = CreateDeploymentRequest {
            service_name: name,
            deployment: deployment.into(),
        };
        let _: Ack = self.call("CreateContainerServiceDeployment", &request).await?;
        Ok(())
    }

    async fn get_deployment_history(&self, name: &str) -> Result<Vec<RemoteDeployment>> {
        let request = ServiceNameRequest { service_name: name };
        let response: DeploymentsResponse = self.call("GetContainerServiceDeployments", &request).await?;
        Ok(response.deployments)
    }

    async fn get_container_log_page(&self, query: &LogQuery, page_token: Option<&str>) -> Result<LogPage> {
        let request = LogRequest {
            service_name: &query.service_name,
            container_name: &query.container_name,
            start_time: query.start_time,
            end_time: query.end_time,
            filter_pattern: query.filter_pattern.as_deref(),
            page_token,
        };
        let response: LogResponse = self.call("GetContainerLog", &request).await?;

        Ok(LogPage {
            events: response
                .log_events
                .into_iter()
                .map(|event| RemoteLogEvent {
                    created_at: event.created_at,
                    message: event.message,
                })
                .collect(),
            next_page_token: response.next_page_token.filter(|token| !token.is_empty()),
        })
    }
}
