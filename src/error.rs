use std::fmt;

use crate::types::{FanMode, HvacMode};

#[derive(Debug)]
pub enum Error {
    Http(reqwest::Error),
    Io(std::io::Error),
    ConfigParse(String),
    MissingField(&'static str),
    InvalidConfig(String),
    UnsupportedMode(HvacMode),
    UnsupportedFanMode(FanMode),
    InvalidTemperature(f64),
    DuplicateEntry(String),
    DuplicateUniqueId(String),
    InvalidUrl(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Http(e) => write!(f, "HTTP error: {e}"),
            Error::Io(e) => write!(f, "IO error: {e}"),
            Error::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Error::MissingField(field) => write!(f, "missing required config field: {field}"),
            Error::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Error::UnsupportedMode(mode) => write!(f, "unsupported hvac mode: {}", mode.as_str()),
            Error::UnsupportedFanMode(fan) => write!(f, "unsupported fan mode: {fan}"),
            Error::InvalidTemperature(t) => write!(f, "invalid temperature: {t}"),
            Error::DuplicateEntry(id) => write!(f, "config entry already set up: {id}"),
            Error::DuplicateUniqueId(id) => write!(f, "duplicate unique_id: {id}"),
            Error::InvalidUrl(url) => write!(f, "invalid device url: {url}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Http(e) => Some(e),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Http(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::ConfigParse(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
