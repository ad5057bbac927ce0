use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    Http,
    Https,
    Tcp,
    Udp,
}

impl Protocol {
    pub const ALL: [Protocol; 4] = [Protocol::Http, Protocol::Https, Protocol::Tcp, Protocol::Udp];

    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "HTTP",
            Protocol::Https => "HTTPS",
            Protocol::Tcp => "TCP",
            Protocol::Udp => "UDP",
        }
    }

    pub fn is_web(&self) -> bool {
        matches!(self, Protocol::Http | Protocol::Https)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Protocol::ALL
            .iter()
            .find(|protocol| protocol.as_str() == s)
            .copied()
            .ok_or_else(|| Error::Validation(format!("invalid protocol {}", s)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerSpec {
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    #[serde(default)]
    pub ports: BTreeMap<String, Protocol>,
}

impl ContainerSpec {
    pub fn exposes(&self, port: u16) -> bool {
        self.ports.keys().any(|key| key.parse::<u16>() == Ok(port))
    }

    /// Port keys in ascending numeric order. Keys that are not numbers keep
    /// their relative order and come last.
    pub fn sorted_ports(&self) -> Vec<String> {
        let mut ports: Vec<String> = self.ports.keys().cloned().collect();
        ports.sort_by_key(|port| match port.parse::<u64>() {
            Ok(n) => (0, n),
            Err(_) => (1, 0),
        });
        ports
    }

    pub fn serves_web(&self) -> bool {
        self.ports.values().any(Protocol::is_web)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HealthCheckPolicy {
    pub healthy_threshold: u32,
    pub interval_seconds: u32,
    pub path: String,
    pub success_codes: String,
    pub timeout_seconds: u32,
    pub unhealthy_threshold: u32,
}

impl Default for HealthCheckPolicy {
    fn default() -> Self {
        HealthCheckPolicy {
            healthy_threshold: 2,
            interval_seconds: 5,
            path: "/".to_string(),
            success_codes: "200-499".to_string(),
            timeout_seconds: 2,
            unhealthy_threshold: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicEndpoint {
    pub container_name: String,
    pub container_port: u16,
    #[serde(default)]
    pub health_check: HealthCheckPolicy,
}

/// A deployment revision: the containers to run and the one that is public.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentSpec {
    #[serde(default)]
    pub containers: BTreeMap<String, ContainerSpec>,
    #[serde(default)]
    pub public_endpoint: Option<PublicEndpoint>,
}

impl DeploymentSpec {
    /// Checks that the public endpoint, if any, names a declared container
    /// and one of its declared ports.
    pub fn validate(&self) -> Result<()> {
        let endpoint = match &self.public_endpoint {
            Some(endpoint) => endpoint,
            None => return Ok(()),
        };

        let container = self.containers.get(&endpoint.container_name).ok_or_else(|| {
            Error::Validation(format!(
                "public endpoint container {} is not defined in containers",
                endpoint.container_name
            ))
        })?;

        if !container.exposes(endpoint.container_port) {
            return Err(Error::Validation(format!(
                "public endpoint port {} is not open on container {}",
                endpoint.container_port, endpoint.container_name
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container(ports: &[(&str, Protocol)]) -> ContainerSpec {
        ContainerSpec {
            image: "nginx:latest".into(),
            ports: ports.iter().map(|(p, proto)| (p.to_string(), *proto)).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn ports_sort_numerically_with_names_last() {
        let c = container(&[
            ("8080", Protocol::Http),
            ("admin", Protocol::Tcp),
            ("443", Protocol::Https),
            ("80", Protocol::Http),
            ("debug", Protocol::Udp),
        ]);
        assert_eq!(c.sorted_ports(), vec!["80", "443", "8080", "admin", "debug"]);
    }

    #[test]
    fn validate_rejects_dangling_endpoint() {
        let mut spec = DeploymentSpec::default();
        spec.containers.insert("web".into(), container(&[("80", Protocol::Http)]));

        spec.public_endpoint = Some(PublicEndpoint {
            container_name: "api".into(),
            container_port: 80,
            health_check: HealthCheckPolicy::default(),
        });
        assert!(matches!(spec.validate(), Err(Error::Validation(_))));

        spec.public_endpoint = Some(PublicEndpoint {
            container_name: "web".into(),
            container_port: 8080,
            health_check: HealthCheckPolicy::default(),
        });
        assert!(matches!(spec.validate(), Err(Error::Validation(_))));

        spec.public_endpoint = Some(PublicEndpoint {
            container_name: "web".into(),
            container_port: 80,
            health_check: HealthCheckPolicy::default(),
        });
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn dump_shape_keeps_containers_and_endpoint_only() {
        let mut spec = DeploymentSpec::default();
        spec.containers.insert("web".into(), container(&[("80", Protocol::Http)]));
        let value = serde_json::to_value(&spec).unwrap();

        let mut keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, vec!["containers", "publicEndpoint"]);
        assert!(value["publicEndpoint"].is_null());
        assert_eq!(value["containers"]["web"]["ports"]["80"], "HTTP");
        assert!(value["containers"]["web"].get("command").is_none());
    }

    #[test]
    fn health_check_fills_missing_fields_with_defaults() {
        let doc = r#"{
            "containers": {"web": {"image": "nginx", "ports": {"80": "HTTP"}}},
            "publicEndpoint": {
                "containerName": "web",
                "containerPort": 80,
                "healthCheck": {"path": "/healthz"}
            }
        }"#;
        let spec: DeploymentSpec = serde_json::from_str(doc).unwrap();
        let health = &spec.public_endpoint.as_ref().unwrap().health_check;
        assert_eq!(health.path, "/healthz");
        assert_eq!(health.success_codes, "200-499");
        assert_eq!(health.interval_seconds, 5);
        assert!(spec.validate().is_ok());
    }
}
