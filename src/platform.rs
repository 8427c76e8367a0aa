use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::info;

use crate::config::{DeviceConfig, PlatformConfig};
use crate::device::{ClimateDevice, ClimateDeviceBuilder};
use crate::protocol::DEFAULT_TIMEOUT;
use crate::types::*;
use crate::{Error, Result};

type EntryStateCallback = Arc<dyn Fn(&str, &DeviceState) + Send + Sync>;

/// Capabilities advertised to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityFeatures {
    pub target_temperature: bool,
    pub fan_mode: bool,
}

/// The surface a host framework drives: state reporting plus commands.
///
/// Command methods take host-shaped values. Range checks that the host UI
/// would normally perform happen here rather than in the controller.
#[allow(async_fn_in_trait)]
pub trait ClimateEntity {
    fn unique_id(&self) -> &str;
    fn name(&self) -> &str;
    fn hvac_mode(&self) -> HvacMode;
    fn fan_mode(&self) -> FanMode;
    fn target_temperature(&self) -> i32;
    fn current_temperature(&self) -> i32;

    fn hvac_modes(&self) -> &'static [HvacMode] {
        &HvacMode::SUPPORTED
    }

    fn fan_modes(&self) -> &'static [FanMode] {
        &FanMode::SUPPORTED
    }

    fn min_temp(&self) -> i32 {
        MIN_TEMP
    }

    fn max_temp(&self) -> i32 {
        MAX_TEMP
    }

    fn temperature_unit(&self) -> &'static str {
        TEMPERATURE_UNIT
    }

    fn supported_features(&self) -> EntityFeatures {
        EntityFeatures {
            target_temperature: true,
            fan_mode: true,
        }
    }

    async fn request_hvac_mode(&mut self, mode: HvacMode) -> Result<()>;
    async fn request_fan_mode(&mut self, fan: FanMode) -> Result<()>;

    /// Rounds to a whole degree and clamps into `min_temp..=max_temp`.
    async fn request_temperature(&mut self, temperature: f64) -> Result<()>;
}

impl ClimateEntity for ClimateDevice {
    fn unique_id(&self) -> &str {
        ClimateDevice::unique_id(self)
    }

    fn name(&self) -> &str {
        ClimateDevice::name(self)
    }

    fn hvac_mode(&self) -> HvacMode {
        self.state().hvac_mode
    }

    fn fan_mode(&self) -> FanMode {
        self.state().fan_mode
    }

    fn target_temperature(&self) -> i32 {
        self.state().target_temperature
    }

    fn current_temperature(&self) -> i32 {
        self.state().current_temperature
    }

    async fn request_hvac_mode(&mut self, mode: HvacMode) -> Result<()> {
        self.set_hvac_mode(mode).await
    }

    async fn request_fan_mode(&mut self, fan: FanMode) -> Result<()> {
        self.set_fan_mode(fan).await
    }

    async fn request_temperature(&mut self, temperature: f64) -> Result<()> {
        if !temperature.is_finite() {
            return Err(Error::InvalidTemperature(temperature));
        }
        let clamped = (temperature.round() as i32).clamp(self.min_temp(), self.max_temp());
        self.set_temperature(clamped).await;
        Ok(())
    }
}

/// Build the entities for one host configuration mapping with default
/// transport settings.
pub fn setup_platform(config: &Value) -> Result<Vec<ClimateDevice>> {
    let config = DeviceConfig::from_value(config)?;
    let device = ClimateDeviceBuilder::from_config(&config).build()?;
    info!(device = %config.unique_id, name = %config.name, "climate entity set up");
    Ok(vec![device])
}

/// Owns the devices of every set-up config entry.
pub struct PlatformContext {
    http: reqwest::Client,
    timeout: Duration,
    state_callbacks: Vec<EntryStateCallback>,
    entries: BTreeMap<String, Vec<ClimateDevice>>,
}

impl PlatformContext {
    pub fn new() -> Result<Self> {
        Ok(Self::with_client(reqwest::Client::builder().build()?))
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        Self {
            http,
            timeout: DEFAULT_TIMEOUT,
            state_callbacks: Vec::new(),
            entries: BTreeMap::new(),
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Called with the device's unique id after every state change of any
    /// device set up afterwards.
    pub fn on_state(mut self, f: impl Fn(&str, &DeviceState) + Send + Sync + 'static) -> Self {
        self.state_callbacks.push(Arc::new(f));
        self
    }

    pub fn setup_entry(
        &mut self,
        entry_id: impl Into<String>,
        config: &PlatformConfig,
    ) -> Result<&mut [ClimateDevice]> {
        let entry_id = entry_id.into();
        if self.entries.contains_key(&entry_id) {
            return Err(Error::DuplicateEntry(entry_id));
        }
        config.validate()?;
        if let Some(dup) = config
            .devices
            .iter()
            .find(|d| self.device(&d.unique_id).is_some())
        {
            return Err(Error::DuplicateUniqueId(dup.unique_id.clone()));
        }

        let mut devices = Vec::with_capacity(config.devices.len());
        for device_config in &config.devices {
            let mut builder = ClimateDeviceBuilder::from_config(device_config)
                .http_client(self.http.clone())
                .timeout(self.timeout);
            for cb in &self.state_callbacks {
                let cb = Arc::clone(cb);
                let id = device_config.unique_id.clone();
                builder = builder.on_state(move |state| cb(&id, state));
            }
            devices.push(builder.build()?);
        }

        info!(entry = %entry_id, devices = devices.len(), "config entry set up");
        let slot = self.entries.entry(entry_id).or_insert(devices);
        Ok(slot.as_mut_slice())
    }

    pub fn unload_entry(&mut self, entry_id: &str) -> bool {
        match self.entries.remove(entry_id) {
            Some(devices) => {
                info!(entry = %entry_id, devices = devices.len(), "config entry unloaded");
                true
            }
            None => false,
        }
    }

    pub fn entry(&self, entry_id: &str) -> Option<&[ClimateDevice]> {
        self.entries.get(entry_id).map(Vec::as_slice)
    }

    pub fn device(&self, unique_id: &str) -> Option<&ClimateDevice> {
        self.devices().find(|d| d.unique_id() == unique_id)
    }

    pub fn device_mut(&mut self, unique_id: &str) -> Option<&mut ClimateDevice> {
        self.entries
            .values_mut()
            .flatten()
            .find(|d| d.unique_id() == unique_id)
    }

    pub fn devices(&self) -> impl Iterator<Item = &ClimateDevice> {
        self.entries.values().flatten()
    }
}
