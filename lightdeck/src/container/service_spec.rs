use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Compute tier of a container service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Power {
    Nano,
    #[default]
    Micro,
    Small,
    Medium,
    Large,
    Xlarge,
}

impl Power {
    pub const ALL: [Power; 6] = [
        Power::Nano,
        Power::Micro,
        Power::Small,
        Power::Medium,
        Power::Large,
        Power::Xlarge,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Power::Nano => "nano",
            Power::Micro => "micro",
            Power::Small => "small",
            Power::Medium => "medium",
            Power::Large => "large",
            Power::Xlarge => "xlarge",
        }
    }
}

impl fmt::Display for Power {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Power {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Power::ALL
            .iter()
            .find(|power| power.as_str() == s)
            .copied()
            .ok_or_else(|| Error::Validation(format!("invalid power {}", s)))
    }
}

/// Scale values offered when bootstrapping a service.
pub const SCALES: [u32; 4] = [1, 2, 3, 4];
pub const DEFAULT_SCALE: u32 = 1;

/// Identity and size of a container service.
///
/// Only these three fields are written to the service document; anything
/// else found in a dumped document is ignored on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSpec {
    pub container_service_name: String,
    #[serde(default)]
    pub power: Power,
    #[serde(default = "default_scale")]
    pub scale: u32,
}

fn default_scale() -> u32 {
    DEFAULT_SCALE
}

impl ServiceSpec {
    pub fn new(name: &str, power: Power, scale: u32) -> Self {
        ServiceSpec {
            container_service_name: name.to_string(),
            power,
            scale,
        }
    }

    pub fn name(&self) -> &str {
        &self.container_service_name
    }

    /// Scale must be one of `SCALES`.
    pub fn validate(&self) -> Result<()> {
        if !SCALES.contains(&self.scale) {
            return Err(Error::Validation(format!(
                "scale {} of {} is out of range {}-{}",
                self.scale,
                self.container_service_name,
                SCALES[0],
                SCALES[SCALES.len() - 1]
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_round_trips_through_strings() {
        for power in Power::ALL {
            assert_eq!(power.to_string().parse::<Power>().unwrap(), power);
        }
        assert!(matches!("huge".parse::<Power>(), Err(Error::Validation(_))));
    }

    #[test]
    fn load_ignores_remote_only_fields() {
        let doc = r#"{
            "containerServiceName": "web",
            "power": "small",
            "scale": 2,
            "state": "RUNNING",
            "url": "https://web.example.com/"
        }"#;
        let spec: ServiceSpec = serde_json::from_str(doc).unwrap();
        assert_eq!(spec, ServiceSpec::new("web", Power::Small, 2));
    }

    #[test]
    fn scale_outside_offered_range_is_rejected() {
        assert!(ServiceSpec::new("web", Power::Micro, 4).validate().is_ok());
        for scale in [0, 5, 100] {
            let err = ServiceSpec::new("web", Power::Micro, scale).validate().unwrap_err();
            assert!(matches!(err, Error::Validation(_)), "{}", scale);
        }
    }

    #[test]
    fn serializes_exactly_three_fields() {
        let value = serde_json::to_value(ServiceSpec::new("web", Power::Nano, 1)).unwrap();
        let mut keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, vec!["containerServiceName", "power", "scale"]);
        assert_eq!(value["power"], "nano");
    }
}
