mod config;
mod device;
mod error;
mod logger;
mod platform;
mod protocol;
mod types;

pub use config::{DeviceConfig, PlatformConfig};
pub use device::{ClimateDevice, ClimateDeviceBuilder};
pub use error::{Error, Result};
pub use logger::MessageLogMode;
pub use platform::{setup_platform, ClimateEntity, EntityFeatures, PlatformContext};
pub use protocol::{CommandFormat, DEFAULT_TIMEOUT};
pub use types::*;
