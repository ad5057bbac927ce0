use super::pointer::PointerConfig;
use super::template::{render_with_env, Syntax};
use crate::bootstrap::Prompter;
use crate::container::{DeploymentSpec, ServiceSpec};
use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    Skipped,
}

/// Reads and writes the service and deployment documents a pointer config
/// refers to. Documents are always read and written whole.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    pointer: PointerConfig,
}

impl ConfigStore {
    pub fn new(pointer: PointerConfig) -> Self {
        ConfigStore { pointer }
    }

    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(PointerConfig::load(path)?))
    }

    pub fn service_path(&self) -> &Path {
        &self.pointer.service
    }

    pub fn deployment_path(&self) -> &Path {
        &self.pointer.deployment
    }

    pub fn load_service(&self) -> Result<ServiceSpec> {
        let spec: ServiceSpec = load_json(self.service_path())?;
        spec.validate()?;
        Ok(spec)
    }

    pub fn load_deployment(&self) -> Result<DeploymentSpec> {
        load_json(self.deployment_path())
    }

    pub fn dump_service(&self, spec: &ServiceSpec, prompter: &mut dyn Prompter) -> Result<WriteOutcome> {
        save_json(self.service_path(), spec, prompter)
    }

    pub fn dump_deployment(
        &self,
        spec: &DeploymentSpec,
        prompter: &mut dyn Prompter,
    ) -> Result<WriteOutcome> {
        save_json(self.deployment_path(), spec, prompter)
    }

    pub fn print_service(&self, out: &mut dyn Write) -> Result<()> {
        print_file(self.service_path(), out)
    }

    pub fn print_deployment(&self, out: &mut dyn Write) -> Result<()> {
        print_file(self.deployment_path(), out)
    }
}

#[instrument(level = "trace", skip_all, fields(path = %path.display()))]
fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let origin = path.display().to_string();
    let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigLoad {
        path: origin.clone(),
        reason: e.to_string(),
    })?;
    let rendered = render_with_env(&contents, &origin, Syntax::Json)?;
    serde_json::from_str(&rendered).map_err(|e| Error::ConfigLoad {
        path: origin,
        reason: e.to_string(),
    })
}

fn save_json<T: Serialize>(path: &Path, value: &T, prompter: &mut dyn Prompter) -> Result<WriteOutcome> {
    let mut bytes = match serde_json::to_vec_pretty(value) {
        Ok(bytes) => bytes,
        Err(e) => return Err(Error::Io(e.into())),
    };
    bytes.push(b'\n');

    if path.exists() {
        let question = format!("Overwrite existing file {}?", path.display());
        if !prompter.confirm(&question, false)? {
            warn!(path = %path.display(), "skipping");
            return Ok(WriteOutcome::Skipped);
        }
    }

    info!(path = %path.display(), "writing file");
    std::fs::write(path, bytes)?;
    Ok(WriteOutcome::Written)
}

fn print_file(path: &Path, out: &mut dyn Write) -> Result<()> {
    let mut file = std::fs::File::open(path)?;
    std::io::copy(&mut file, out)?;
    Ok(())
}
