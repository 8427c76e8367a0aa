use std::time::{Duration, Instant};

use reqwest::Url;
use tracing::{debug, trace, warn};

use crate::config::DeviceConfig;
use crate::logger::{MessageLogMode, MessageLogger};
use crate::protocol::{base_url, command_url, redact_key, CommandFormat, DEFAULT_TIMEOUT};
use crate::types::*;
use crate::{Error, Result};

type StateCallback = Box<dyn Fn(&DeviceState) + Send + Sync>;

pub struct ClimateDeviceBuilder {
    unique_id: String,
    name: String,
    ip: String,
    api_key: Option<String>,
    format: CommandFormat,
    timeout: Duration,
    http: Option<reqwest::Client>,
    state_callbacks: Vec<StateCallback>,
    log_mode: Option<MessageLogMode>,
    log_path: Option<String>,
}

impl ClimateDeviceBuilder {
    pub fn new(
        unique_id: impl Into<String>,
        name: impl Into<String>,
        ip: impl Into<String>,
    ) -> Self {
        Self {
            unique_id: unique_id.into(),
            name: name.into(),
            ip: ip.into(),
            api_key: None,
            format: CommandFormat::default(),
            timeout: DEFAULT_TIMEOUT,
            http: None,
            state_callbacks: Vec::new(),
            log_mode: None,
            log_path: None,
        }
    }

    pub fn from_config(config: &DeviceConfig) -> Self {
        let builder = Self::new(&config.unique_id, &config.name, config.ip_address.trim());
        match config.api_key() {
            Some(key) => builder.api_key(key),
            None => builder,
        }
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn command_format(mut self, format: CommandFormat) -> Self {
        self.format = format;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Share a connection pool with other devices.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http = Some(client);
        self
    }

    pub fn on_state(mut self, f: impl Fn(&DeviceState) + Send + Sync + 'static) -> Self {
        self.state_callbacks.push(Box::new(f));
        self
    }

    pub fn message_log(mut self, mode: MessageLogMode, path: impl Into<String>) -> Self {
        self.log_mode = Some(mode);
        self.log_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<ClimateDevice> {
        let http = match self.http {
            Some(client) => client,
            None => reqwest::Client::builder().build()?,
        };

        let logger = match (self.log_mode, self.log_path) {
            (Some(mode), Some(path)) => Some(MessageLogger::new(mode, &path)?),
            _ => None,
        };

        let base_url = base_url(&self.ip)?;

        Ok(ClimateDevice {
            http,
            base_url,
            unique_id: self.unique_id,
            name: self.name,
            api_key: self.api_key,
            format: self.format,
            timeout: self.timeout,
            state: DeviceState::default(),
            state_callbacks: self.state_callbacks,
            logger,
        })
    }
}

/// A climate remote on the LAN. Holds the last commanded state and pushes the
/// whole of it to the device on every change.
pub struct ClimateDevice {
    http: reqwest::Client,
    base_url: String,
    unique_id: String,
    name: String,
    api_key: Option<String>,
    format: CommandFormat,
    timeout: Duration,
    state: DeviceState,
    state_callbacks: Vec<StateCallback>,
    logger: Option<MessageLogger>,
}

impl std::fmt::Debug for ClimateDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClimateDevice")
            .field("base_url", &self.base_url)
            .field("unique_id", &self.unique_id)
            .field("name", &self.name)
            .field("format", &self.format)
            .field("timeout", &self.timeout)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl ClimateDevice {
    pub fn builder(
        unique_id: impl Into<String>,
        name: impl Into<String>,
        ip: impl Into<String>,
    ) -> ClimateDeviceBuilder {
        ClimateDeviceBuilder::new(unique_id, name, ip)
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    pub fn snapshot(&self) -> StateSnapshot {
        self.state.to_snapshot()
    }

    // -- Command methods --

    /// Set the operating mode. `HeatCool` is rejected without contacting the
    /// device.
    pub async fn set_hvac_mode(&mut self, mode: HvacMode) -> Result<()> {
        if !mode.is_supported() {
            return Err(Error::UnsupportedMode(mode));
        }
        self.state.hvac_mode = mode;
        trace!(device = %self.unique_id, %mode, "hvac mode set");
        self.notify();
        self.push("set_hvac_mode").await;
        Ok(())
    }

    pub async fn set_fan_mode(&mut self, fan: FanMode) -> Result<()> {
        if !fan.is_supported() {
            return Err(Error::UnsupportedFanMode(fan));
        }
        self.state.fan_mode = fan;
        trace!(device = %self.unique_id, %fan, "fan mode set");
        self.notify();
        self.push("set_fan_mode").await;
        Ok(())
    }

    /// Set the target temperature. No clamping happens here; callers keep it
    /// within [`MIN_TEMP`, `MAX_TEMP`]. The remote has no sensor, so the
    /// current temperature mirrors the target.
    pub async fn set_temperature(&mut self, temperature: i32) {
        self.state.target_temperature = temperature;
        self.state.current_temperature = temperature;
        trace!(device = %self.unique_id, temperature, "target temperature set");
        self.notify();
        self.push("set_temperature").await;
    }

    /// Adopt a persisted snapshot and resynchronise the physical device.
    pub async fn restore_state(&mut self, snapshot: &StateSnapshot) {
        self.state = DeviceState::from_snapshot(snapshot);
        debug!(
            device = %self.unique_id,
            mode = %self.state.hvac_mode,
            fan = %self.state.fan_mode,
            temperature = self.state.target_temperature,
            "restored state"
        );
        self.notify();
        self.push("restore_state").await;
    }

    /// Push the current state. Failures are logged and otherwise ignored; the
    /// in-memory state stays as commanded.
    pub async fn send_state(&mut self) {
        self.push("send_state").await;
    }

    /// Push the current state, returning any transport or HTTP status error.
    pub async fn try_send_state(&mut self) -> Result<()> {
        self.try_push("send_state").await
    }

    // -- Helpers --

    fn notify(&self) {
        for cb in &self.state_callbacks {
            cb(&self.state);
        }
    }

    async fn push(&mut self, action: &str) {
        if let Err(e) = self.try_push(action).await {
            warn!(device = %self.unique_id, action, "failed to send state: {e}");
        }
    }

    async fn try_push(&mut self, action: &str) -> Result<()> {
        let url = match command_url(
            self.format,
            &self.base_url,
            self.api_key.as_deref(),
            &self.state,
        ) {
            Ok(url) => url,
            Err(e) => {
                if let Some(ref mut logger) = self.logger {
                    logger.log_failure(&e.to_string());
                }
                return Err(e);
            }
        };
        let redacted = redact_key(&url);
        debug!(device = %self.unique_id, url = %redacted, action, "sending state");

        if let Some(ref mut logger) = self.logger {
            logger.log_command(action, &self.unique_id, &redacted, &self.state);
        }

        let started = Instant::now();
        match self.get(url).await {
            Ok(status) => {
                debug!(
                    device = %self.unique_id,
                    status,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "device accepted state"
                );
                if let Some(ref mut logger) = self.logger {
                    logger.log_success(status);
                }
                Ok(())
            }
            Err(e) => {
                if let Some(ref mut logger) = self.logger {
                    logger.log_failure(&e.to_string());
                }
                Err(e)
            }
        }
    }

    async fn get(&self, url: Url) -> Result<u16> {
        let resp = self
            .http
            .get(url)
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?;
        let status = resp.status().as_u16();
        // drained so the pooled connection can be reused
        resp.bytes().await?;
        Ok(status)
    }
}
