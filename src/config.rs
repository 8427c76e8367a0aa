use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::protocol::base_url;
use crate::{Error, Result};

pub const CONF_UNIQUE_ID: &str = "unique_id";
pub const CONF_NAME: &str = "name";
pub const CONF_IP_ADDRESS: &str = "ip_address";
pub const CONF_API_KEY: &str = "api_key";

const REQUIRED_FIELDS: [&str; 4] = [CONF_UNIQUE_ID, CONF_NAME, CONF_IP_ADDRESS, CONF_API_KEY];

/// One climate remote as configured by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub unique_id: String,
    pub name: String,
    pub ip_address: String,
    pub api_key: String,
}

impl DeviceConfig {
    pub fn new(
        unique_id: impl Into<String>,
        name: impl Into<String>,
        ip_address: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            unique_id: unique_id.into(),
            name: name.into(),
            ip_address: ip_address.into(),
            api_key: api_key.into(),
        }
    }

    /// Build from a host configuration mapping. Extra keys (e.g. `platform`)
    /// are ignored.
    pub fn from_value(value: &Value) -> Result<Self> {
        let map = value
            .as_object()
            .ok_or_else(|| Error::InvalidConfig("expected a mapping".to_string()))?;

        for field in REQUIRED_FIELDS {
            match map.get(field) {
                None | Some(Value::Null) => return Err(Error::MissingField(field)),
                Some(Value::String(_)) => {}
                Some(other) => {
                    return Err(Error::InvalidConfig(format!(
                        "`{field}` must be a string, got {other}"
                    )));
                }
            }
        }

        let field = |name: &str| map[name].as_str().unwrap_or_default().to_string();
        let config = Self {
            unique_id: field(CONF_UNIQUE_ID),
            name: field(CONF_NAME),
            ip_address: field(CONF_IP_ADDRESS),
            api_key: field(CONF_API_KEY),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.unique_id.trim().is_empty() {
            return Err(Error::InvalidConfig(format!("`{CONF_UNIQUE_ID}` is empty")));
        }
        if self.name.trim().is_empty() {
            return Err(Error::InvalidConfig(format!("`{CONF_NAME}` is empty")));
        }
        let ip = self.ip_address.trim();
        if ip.is_empty() {
            return Err(Error::InvalidConfig(format!("`{CONF_IP_ADDRESS}` is empty")));
        }
        if base_url(ip).is_err() {
            return Err(Error::InvalidConfig(format!(
                "`{CONF_IP_ADDRESS}` must be a bare host[:port], got {ip:?}"
            )));
        }
        Ok(())
    }

    /// The key to send, unchanged, or `None` when it is blank.
    pub fn api_key(&self) -> Option<&str> {
        (!self.api_key.trim().is_empty()).then_some(self.api_key.as_str())
    }
}

/// A platform file: one `[[climate]]` table per remote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformConfig {
    #[serde(default, rename = "climate")]
    pub devices: Vec<DeviceConfig>,
}

impl PlatformConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for device in &self.devices {
            device.validate()?;
            if !seen.insert(device.unique_id.as_str()) {
                return Err(Error::DuplicateUniqueId(device.unique_id.clone()));
            }
        }
        Ok(())
    }
}

impl From<DeviceConfig> for PlatformConfig {
    fn from(device: DeviceConfig) -> Self {
        Self { devices: vec![device] }
    }
}
