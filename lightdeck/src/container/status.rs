use super::deployment_spec::DeploymentSpec;
use super::service_spec::{Power, ServiceSpec};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A deployment as reported by the control plane.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteDeployment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(flatten)]
    pub spec: DeploymentSpec,
}

/// Live state of a container service. Owned by the control plane and never
/// written back.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteServiceState {
    pub container_service_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arn: Option<String>,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub power: Power,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_id: Option<String>,
    #[serde(default)]
    pub scale: u32,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub public_domain_names: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_domain_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub current_deployment: Option<RemoteDeployment>,
    #[serde(default)]
    pub next_deployment: Option<RemoteDeployment>,
    #[serde(default)]
    pub is_disabled: bool,
}

impl RemoteServiceState {
    pub fn to_service_spec(&self) -> ServiceSpec {
        ServiceSpec::new(&self.container_service_name, self.power, self.scale)
    }

    /// Names of every container in the current and the pending deployment,
    /// deduplicated and in lexicographic order.
    pub fn live_container_names(&self) -> BTreeSet<String> {
        [&self.current_deployment, &self.next_deployment]
            .into_iter()
            .flatten()
            .flat_map(|deployment| deployment.spec.containers.keys().cloned())
            .collect()
    }

    pub fn summary(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("ServiceName:", self.container_service_name.clone()),
            ("State:", self.state.clone()),
            ("Power:", self.power.to_string()),
            ("Scale:", self.scale.to_string()),
            ("URL:", self.url.clone()),
        ];
        for names in self.public_domain_names.values() {
            for name in names {
                fields.push(("PublicDomainName:", name.clone()));
            }
        }
        fields.push(("IsDisabled:", self.is_disabled.to_string()));
        fields
    }
}
