use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const MIN_TEMP: i32 = 10;
pub const MAX_TEMP: i32 = 32;
pub const DEFAULT_TEMPERATURE: i32 = 23;
pub const TEMPERATURE_UNIT: &str = "°C";

pub const ATTR_TEMPERATURE: &str = "temperature";
pub const ATTR_FAN_MODE: &str = "fan_mode";
pub const ATTR_CURRENT_TEMPERATURE: &str = "current_temperature";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HvacMode {
    #[default]
    Off,
    Heat,
    Cool,
    HeatCool,
    Auto,
    Dry,
    FanOnly,
}

impl HvacMode {
    pub const ALL: [HvacMode; 7] = [
        HvacMode::Off,
        HvacMode::Heat,
        HvacMode::Cool,
        HvacMode::HeatCool,
        HvacMode::Auto,
        HvacMode::Dry,
        HvacMode::FanOnly,
    ];

    /// Modes the remote can actually drive. `HeatCool` needs two setpoints,
    /// which the device API has no room for.
    pub const SUPPORTED: [HvacMode; 6] = [
        HvacMode::Off,
        HvacMode::Heat,
        HvacMode::Cool,
        HvacMode::Auto,
        HvacMode::Dry,
        HvacMode::FanOnly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HvacMode::Off => "off",
            HvacMode::Heat => "heat",
            HvacMode::Cool => "cool",
            HvacMode::HeatCool => "heat_cool",
            HvacMode::Auto => "auto",
            HvacMode::Dry => "dry",
            HvacMode::FanOnly => "fan_only",
        }
    }

    pub fn from_device_str(s: &str) -> Option<Self> {
        match s {
            "off" => Some(HvacMode::Off),
            "heat" => Some(HvacMode::Heat),
            "cool" => Some(HvacMode::Cool),
            "heat_cool" => Some(HvacMode::HeatCool),
            "auto" => Some(HvacMode::Auto),
            "dry" => Some(HvacMode::Dry),
            "fan_only" => Some(HvacMode::FanOnly),
            _ => None,
        }
    }

    pub fn is_supported(&self) -> bool {
        Self::SUPPORTED.contains(self)
    }
}

impl fmt::Display for HvacMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FanMode {
    #[default]
    Auto,
    Silent,
    Level(u8),
}

impl FanMode {
    pub const SUPPORTED: [FanMode; 7] = [
        FanMode::Auto,
        FanMode::Silent,
        FanMode::Level(1),
        FanMode::Level(2),
        FanMode::Level(3),
        FanMode::Level(4),
        FanMode::Level(5),
    ];

    /// Case-insensitive; `quiet` is accepted for `Silent`.
    pub fn from_device_str(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("auto") {
            return Some(FanMode::Auto);
        }
        if s.eq_ignore_ascii_case("silent") || s.eq_ignore_ascii_case("quiet") {
            return Some(FanMode::Silent);
        }
        match s.parse::<u8>() {
            Ok(level @ 1..=5) => Some(FanMode::Level(level)),
            _ => None,
        }
    }

    pub fn is_supported(&self) -> bool {
        Self::SUPPORTED.contains(self)
    }
}

impl fmt::Display for FanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FanMode::Auto => f.write_str("Auto"),
            FanMode::Silent => f.write_str("Silent"),
            FanMode::Level(n) => write!(f, "{n}"),
        }
    }
}

/// Last commanded state of a device. The device never reports back, so this
/// is what the controller believes the appliance is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceState {
    pub hvac_mode: HvacMode,
    pub fan_mode: FanMode,
    pub target_temperature: i32,
    pub current_temperature: i32,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            hvac_mode: HvacMode::Off,
            fan_mode: FanMode::Auto,
            target_temperature: DEFAULT_TEMPERATURE,
            current_temperature: DEFAULT_TEMPERATURE,
        }
    }
}

impl DeviceState {
    pub fn power(&self) -> bool {
        self.hvac_mode != HvacMode::Off
    }

    /// Build state from a persisted snapshot, falling back to the defaults
    /// field by field when a value is missing, unparseable or unsupported.
    pub fn from_snapshot(snapshot: &StateSnapshot) -> Self {
        let defaults = Self::default();

        let hvac_mode = HvacMode::from_device_str(&snapshot.state)
            .filter(HvacMode::is_supported)
            .unwrap_or(defaults.hvac_mode);

        let fan_mode = snapshot
            .attributes
            .get(ATTR_FAN_MODE)
            .and_then(|v| v.as_str())
            .and_then(FanMode::from_device_str)
            .unwrap_or(defaults.fan_mode);

        let target_temperature = snapshot
            .attributes
            .get(ATTR_TEMPERATURE)
            .and_then(temperature_from_value)
            .unwrap_or(defaults.target_temperature);

        Self {
            hvac_mode,
            fan_mode,
            target_temperature,
            current_temperature: target_temperature,
        }
    }

    pub fn to_snapshot(&self) -> StateSnapshot {
        let mut attributes = Map::new();
        attributes.insert(ATTR_TEMPERATURE.to_string(), Value::from(self.target_temperature));
        attributes.insert(ATTR_FAN_MODE.to_string(), Value::from(self.fan_mode.to_string()));
        attributes.insert(
            ATTR_CURRENT_TEMPERATURE.to_string(),
            Value::from(self.current_temperature),
        );
        StateSnapshot {
            state: self.hvac_mode.as_str().to_string(),
            attributes,
        }
    }
}

fn temperature_from_value(value: &Value) -> Option<i32> {
    let t = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64))?,
        Value::String(s) => s.trim().parse::<f64>().ok()?.round() as i64,
        _ => return None,
    };
    let t = i32::try_from(t).ok()?;
    (MIN_TEMP..=MAX_TEMP).contains(&t).then_some(t)
}

/// Persisted entity state as the host stores it between restarts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub state: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}
