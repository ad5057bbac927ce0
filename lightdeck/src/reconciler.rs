use crate::bootstrap::{Bootstrapper, Prompter};
use crate::config::{ConfigStore, WriteOutcome};
use crate::container::{RemoteServiceState, ServiceSpec};
use crate::control_plane::{ControlPlane, ServiceLookup};
use crate::error::{Error, Result, ResultExt};
use crate::utils::{print_field, print_step};
use std::io::Write;
use std::path::Path;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, Copy, Default)]
pub struct DeployOptions {
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployOutcome {
    Created,
    Applied,
    Aborted,
    DryRun,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    Dumped,
    Bootstrapped,
    Declined,
}

/// Brings the remote container service in line with the local documents,
/// and seeds the local documents from the remote service.
pub struct ServiceReconciler<'a, C: ControlPlane> {
    store: &'a ConfigStore,
    client: &'a C,
    prompter: &'a mut dyn Prompter,
}

impl<'a, C: ControlPlane> ServiceReconciler<'a, C> {
    pub fn new(store: &'a ConfigStore, client: &'a C, prompter: &'a mut dyn Prompter) -> Self {
        ServiceReconciler {
            store,
            client,
            prompter,
        }
    }

    /// Creates the service when it does not exist yet, otherwise rolls out a
    /// new deployment revision.
    #[instrument(level = "debug", skip_all)]
    pub async fn deploy(&mut self, options: DeployOptions, out: &mut dyn Write) -> Result<DeployOutcome> {
        let service = self.store.load_service().context("failed to load service config")?;
        let lookup = self
            .client
            .get_service_state(service.name())
            .await
            .context("failed to get container service")?;

        if matches!(lookup, ServiceLookup::NotFound) {
            return self.create(&service, options, out).await;
        }

        let deployment = self
            .store
            .load_deployment()
            .and_then(|deployment| deployment.validate().map(|_| deployment))
            .context("failed to load deployment config")?;

        let step = format!("Deploy {}", service.name());
        if options.dry_run {
            self.store.print_deployment(out)?;
            print_step(out, &step, false)?;
            return Ok(DeployOutcome::DryRun);
        }

        self.client
            .create_deployment_revision(service.name(), &deployment)
            .await
            .context("failed to create deployment")?;
        info!(service = %service.name(), "new deployment is created");
        print_step(out, &step, true)?;
        Ok(DeployOutcome::Applied)
    }

    async fn create(
        &mut self,
        service: &ServiceSpec,
        options: DeployOptions,
        out: &mut dyn Write,
    ) -> Result<DeployOutcome> {
        info!(service = %service.name(), "service and deployment will be created as below");
        self.store.print_service(out).context("failed to load service config")?;
        self.store.print_deployment(out).context("failed to load deployment config")?;

        let deployment = self
            .store
            .load_deployment()
            .and_then(|deployment| deployment.validate().map(|_| deployment))
            .context("failed to load deployment config")?;

        let step = format!("Create {}", service.name());
        if options.dry_run {
            print_step(out, &step, false)?;
            return Ok(DeployOutcome::DryRun);
        }
        if !self.prompter.confirm("Do you create container service?", false)? {
            print_step(out, &step, false)?;
            return Ok(DeployOutcome::Aborted);
        }

        info!(service = %service.name(), "creating container service");
        self.client
            .create_service(service, &deployment)
            .await
            .context("failed to create service")?;
        print_step(out, &step, true)?;
        Ok(DeployOutcome::Created)
    }

    /// Applies power and scale from the service document. Containers are
    /// left alone.
    pub async fn update(&mut self, out: &mut dyn Write) -> Result<()> {
        let service = self.store.load_service().context("failed to load service config")?;
        self.client
            .update_service_attributes(service.name(), service.power, service.scale)
            .await
            .context("failed to update service")?;
        info!(service = %service.name(), power = %service.power, scale = service.scale, "service updated");
        print_step(out, &format!("Update {}", service.name()), true)
    }

    pub async fn init(&mut self, service_name: &str, out: &mut dyn Write) -> Result<InitOutcome> {
        let lookup = self
            .client
            .get_service_state(service_name)
            .await
            .context("failed to get container service")?;

        match lookup {
            ServiceLookup::Found(state) => {
                self.persist_remote(&state, out).await?;
                Ok(InitOutcome::Dumped)
            }
            ServiceLookup::NotFound => {
                let question = format!("{} does not exist. Create new configuration files?", service_name);
                if !self.prompter.confirm(&question, false)? {
                    return Ok(InitOutcome::Declined);
                }

                let (service, deployment) = Bootstrapper::new(&mut *self.prompter).run(service_name)?;
                let outcome = self
                    .store
                    .dump_service(&service, &mut *self.prompter)
                    .context("failed to dump service")?;
                print_write(out, self.store.service_path(), outcome)?;
                let outcome = self
                    .store
                    .dump_deployment(&deployment, &mut *self.prompter)
                    .context("failed to dump deployment")?;
                print_write(out, self.store.deployment_path(), outcome)?;
                Ok(InitOutcome::Bootstrapped)
            }
        }
    }

    /// Overwrites the local documents with the remote service and its most
    /// recent deployment. A missing service is an error.
    pub async fn dump(&mut self, service_name: &str, out: &mut dyn Write) -> Result<()> {
        let state = self
            .client
            .get_service_state(service_name)
            .await
            .and_then(|lookup| lookup.require(service_name))
            .context("failed to get container service")?;
        self.persist_remote(&state, out).await
    }

    // The service document is written before the history is fetched, so a
    // failure past that point leaves only the service document updated.
    async fn persist_remote(&mut self, state: &RemoteServiceState, out: &mut dyn Write) -> Result<()> {
        let name = state.container_service_name.as_str();
        let outcome = self
            .store
            .dump_service(&state.to_service_spec(), &mut *self.prompter)
            .context("failed to dump service")?;
        print_write(out, self.store.service_path(), outcome)?;

        let latest = self
            .client
            .get_deployment_history(name)
            .await
            .and_then(|history| {
                history.into_iter().next().ok_or_else(|| {
                    Error::remote("GetContainerServiceDeployments", format!("{} has no deployments", name))
                })
            })
            .context("failed to get container service deployment")?;
        debug!(service = %name, version = ?latest.version, "latest deployment");

        let outcome = self
            .store
            .dump_deployment(&latest.spec, &mut *self.prompter)
            .context("failed to dump deployment")?;
        print_write(out, self.store.deployment_path(), outcome)
    }

    pub async fn status(&self, detail: bool, out: &mut dyn Write) -> Result<()> {
        let service = self.store.load_service().context("failed to load service config")?;
        let state = self
            .client
            .get_service_state(service.name())
            .await
            .and_then(|lookup| lookup.require(service.name()))
            .context("failed to get container service")?;

        if detail {
            let document = serde_json::to_string_pretty(&state).map_err(std::io::Error::from)?;
            writeln!(out, "{}", document)?;
            return Ok(());
        }
        for (label, value) in state.summary() {
            print_field(out, label, &value)?;
        }
        Ok(())
    }
}

fn print_write(out: &mut dyn Write, path: &Path, outcome: WriteOutcome) -> Result<()> {
    print_step(out, &format!("Write {}", path.display()), outcome == WriteOutcome::Written)
}
