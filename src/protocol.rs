use std::time::Duration;

use reqwest::Url;

use crate::types::DeviceState;
use crate::{Error, Result};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

pub const STATE_PATH: &str = "/state";
pub const ON_PATH: &str = "/on";
pub const OFF_PATH: &str = "/off";

const REDACTED: &str = "***";

/// Which firmware API the remote speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommandFormat {
    /// `GET /state?...` carrying the whole desired state.
    #[default]
    State,
    /// Early firmware: `GET /on` or `GET /off`, nothing else.
    Power,
}

/// `http://{host}` for a bare `host[:port]`. Userinfo, paths, queries and
/// fragments would move the request away from the device API, so they are
/// rejected.
pub fn base_url(host: &str) -> Result<String> {
    let raw = format!("http://{host}");
    if host.is_empty() || host.contains(['/', '?', '#', '@']) || host.contains(char::is_whitespace) {
        return Err(Error::InvalidUrl(raw));
    }
    let bare = match Url::parse(&raw) {
        Ok(url) => {
            url.host_str().is_some()
                && url.username().is_empty()
                && url.password().is_none()
                && url.query().is_none()
                && url.fragment().is_none()
                && url.path() == "/"
        }
        Err(_) => false,
    };
    if bare { Ok(raw) } else { Err(Error::InvalidUrl(raw)) }
}

pub fn state_url(base_url: &str, api_key: Option<&str>, state: &DeviceState) -> Result<Url> {
    let mut url = parse(base_url, STATE_PATH)?;
    {
        let mut query = url.query_pairs_mut();
        if let Some(key) = api_key {
            query.append_pair("key", key);
        }
        query
            .append_pair("power", if state.power() { "1" } else { "0" })
            .append_pair("mode", state.hvac_mode.as_str())
            .append_pair("temperature", &state.target_temperature.to_string())
            .append_pair("fan", &state.fan_mode.to_string());
    }
    Ok(url)
}

pub fn power_url(base_url: &str, on: bool) -> Result<Url> {
    parse(base_url, if on { ON_PATH } else { OFF_PATH })
}

pub fn command_url(
    format: CommandFormat,
    base_url: &str,
    api_key: Option<&str>,
    state: &DeviceState,
) -> Result<Url> {
    match format {
        CommandFormat::State => state_url(base_url, api_key, state),
        CommandFormat::Power => power_url(base_url, state.power()),
    }
}

/// URL text safe for logs: the `key` query value is masked.
pub fn redact_key(url: &Url) -> String {
    if !url.query_pairs().any(|(k, _)| k == "key") {
        return url.to_string();
    }
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "key" { REDACTED.to_string() } else { v.into_owned() };
            (k.into_owned(), v)
        })
        .collect();
    let mut redacted = url.clone();
    redacted.query_pairs_mut().clear().extend_pairs(pairs);
    redacted.to_string()
}

fn parse(base_url: &str, path: &str) -> Result<Url> {
    let raw = format!("{}{path}", base_url.trim_end_matches('/'));
    Url::parse(&raw).map_err(|_| Error::InvalidUrl(raw))
}
