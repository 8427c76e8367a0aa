use std::fs::{File, OpenOptions};
use std::io::Write;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::warn;

use crate::types::DeviceState;

pub enum MessageLogMode {
    /// Every command and every result.
    Full,
    /// Only commands whose request failed, together with the failure.
    FailuresOnly,
}

pub(crate) struct MessageLogger {
    mode: MessageLogMode,
    file: File,
    pending: Option<Value>,
}

impl MessageLogger {
    pub fn new(mode: MessageLogMode, path: &str) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(Self {
            mode,
            file,
            pending: None,
        })
    }

    /// `url` must already have its api key redacted.
    pub fn log_command(&mut self, action: &str, device: &str, url: &str, state: &DeviceState) {
        let entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "dir": "cmd",
            "action": action,
            "device": device,
            "url": url,
            "state": {
                "power": state.power(),
                "mode": state.hvac_mode.as_str(),
                "fan": state.fan_mode.to_string(),
                "temperature": state.target_temperature,
            },
        });
        match self.mode {
            MessageLogMode::Full => self.write_line(&entry),
            MessageLogMode::FailuresOnly => self.pending = Some(entry),
        }
    }

    pub fn log_success(&mut self, status: u16) {
        match self.mode {
            MessageLogMode::Full => {
                let entry = json!({
                    "ts": Utc::now().to_rfc3339(),
                    "dir": "result",
                    "ok": true,
                    "status": status,
                });
                self.write_line(&entry);
            }
            MessageLogMode::FailuresOnly => self.pending = None,
        }
    }

    pub fn log_failure(&mut self, error: &str) {
        if let Some(cmd) = self.pending.take() {
            self.write_line(&cmd);
        }
        let entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "dir": "result",
            "ok": false,
            "error": error,
        });
        self.write_line(&entry);
    }

    fn write_line(&mut self, entry: &Value) {
        if let Ok(line) = serde_json::to_string(entry)
            && let Err(e) = writeln!(self.file, "{line}")
        {
            warn!("failed to write log entry: {e}");
        }
    }
}
