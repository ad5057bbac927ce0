pub mod prompter;

pub use prompter::{Prompter, TerminalPrompter};

use crate::container::{
    ContainerSpec, DeploymentSpec, HealthCheckPolicy, Power, Protocol, PublicEndpoint, ServiceSpec,
    DEFAULT_SCALE, SCALES,
};
use crate::error::{Error, Result};
use tracing::debug;

pub const NO_ENDPOINT: &str = "No endpoint";

/// Builds a service and a deployment specification from operator answers.
/// Nothing is written to disk here.
pub struct Bootstrapper<'a> {
    prompter: &'a mut dyn Prompter,
}

impl<'a> Bootstrapper<'a> {
    pub fn new(prompter: &'a mut dyn Prompter) -> Self {
        Bootstrapper { prompter }
    }

    pub fn run(&mut self, service_name: &str) -> Result<(ServiceSpec, DeploymentSpec)> {
        let service = self.service(service_name)?;
        let deployment = self.deployment()?;
        deployment.validate()?;
        Ok((service, deployment))
    }

    fn service(&mut self, service_name: &str) -> Result<ServiceSpec> {
        let powers: Vec<String> = Power::ALL.iter().map(Power::to_string).collect();
        let power = self
            .prompter
            .choose("Choose the power", &powers, Power::default().as_str())?
            .parse::<Power>()?;

        let scales: Vec<String> = SCALES.iter().map(u32::to_string).collect();
        let answer = self
            .prompter
            .choose("Choose the scale", &scales, &DEFAULT_SCALE.to_string())?;
        let scale = match answer.parse::<u32>() {
            Ok(scale) => scale,
            Err(_) => return Err(Error::Validation(format!("invalid scale {}", answer))),
        };

        Ok(ServiceSpec::new(service_name, power, scale))
    }

    fn deployment(&mut self) -> Result<DeploymentSpec> {
        let mut deployment = DeploymentSpec::default();
        let mut candidates = vec![NO_ENDPOINT.to_string()];

        loop {
            let (name, container) = self.container()?;
            // Only the first container serving HTTP(S) is offered as the public endpoint.
            if candidates.len() == 1 && container.serves_web() {
                candidates.push(name.clone());
            }
            deployment.containers.insert(name, container);

            if !self.prompter.confirm("Add an another container entry?", false)? {
                break;
            }
        }

        deployment.public_endpoint = self.public_endpoint(&deployment, &candidates)?;
        Ok(deployment)
    }

    fn container(&mut self) -> Result<(String, ContainerSpec)> {
        let name = self.prompter.prompt("Container name", "")?;
        if name.is_empty() {
            return Err(Error::Validation("container name must not be empty".to_string()));
        }

        let mut container = ContainerSpec {
            image: self.prompter.prompt("Image", "")?,
            ..Default::default()
        };

        let command = self.prompter.prompt("Launch command", "")?;
        if !command.is_empty() {
            container.command = Some(vec![command]);
        }

        while self.prompter.confirm("Add an environment variable?", false)? {
            let key = self.prompter.prompt("Key", "")?;
            let value = self.prompter.prompt("Value", "")?;
            container.environment.insert(key, value);
        }

        let protocols: Vec<String> = Protocol::ALL.iter().map(Protocol::to_string).collect();
        while self.prompter.confirm("Add an open port?", false)? {
            let port = self.prompter.prompt("Port", "")?;
            let protocol = self
                .prompter
                .choose("Protocol", &protocols, Protocol::Http.as_str())?
                .parse::<Protocol>()?;
            container.ports.insert(port, protocol);
        }

        debug!(container = %name, image = %container.image, "container entry added");
        Ok((name, container))
    }

    fn public_endpoint(
        &mut self,
        deployment: &DeploymentSpec,
        candidates: &[String],
    ) -> Result<Option<PublicEndpoint>> {
        let chosen = self
            .prompter
            .choose("Public endpoint container", candidates, NO_ENDPOINT)?;
        if chosen == NO_ENDPOINT {
            return Ok(None);
        }

        let container = match deployment.containers.get(&chosen) {
            Some(container) => container,
            None => return Ok(None),
        };

        let ports = container.sorted_ports();
        let first = ports.first().cloned().unwrap_or_default();
        let port = self.prompter.choose("Public endpoint port", &ports, &first)?;
        let container_port = match port.parse::<u16>() {
            Ok(port) => port,
            Err(_) => {
                return Err(Error::Validation(format!(
                    "public endpoint port {} is not a port number",
                    port
                )))
            }
        };

        Ok(Some(PublicEndpoint {
            container_name: chosen,
            container_port,
            health_check: HealthCheckPolicy::default(),
        }))
    }
}
