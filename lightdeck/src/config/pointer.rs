use super::template::{render_with_env, Syntax};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration: where the service and deployment documents live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointerConfig {
    pub service: PathBuf,
    pub deployment: PathBuf,
}

impl PointerConfig {
    /// Loads the pointer document. Relative document paths are resolved
    /// against the directory the pointer document sits in.
    pub fn load(path: &Path) -> Result<Self> {
        let origin = path.display().to_string();
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                return Err(Error::ConfigLoad {
                    path: origin,
                    reason: e.to_string(),
                })
            }
        };

        let rendered = render_with_env(&contents, &origin, Syntax::Yaml)?;
        let config: PointerConfig = match serde_yaml::from_str(&rendered) {
            Ok(config) => config,
            Err(e) => {
                return Err(Error::ConfigLoad {
                    path: origin,
                    reason: e.to_string(),
                })
            }
        };

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Ok(config.resolve(base))
    }

    fn resolve(self, base: &Path) -> Self {
        PointerConfig {
            service: base.join(self.service),
            deployment: base.join(self.deployment),
        }
    }
}
