//! Configuration for the register bridge.

use modbridge_common::LoggingConfig;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use crate::client::Endpoint;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] json5::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Complete configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModbridgeConfig {
    /// Source/destination pair to bridge
    pub modbus: BridgeConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// The single source → destination pair bridged by this process.
///
/// Every field is required; there are no defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    pub source_host: String,
    #[serde(deserialize_with = "in_range")]
    pub source_port: u16,
    #[serde(deserialize_with = "in_range")]
    pub source_unit: u8,
    #[serde(deserialize_with = "in_range")]
    pub source_address: u16,

    pub destination_host: String,
    #[serde(deserialize_with = "in_range")]
    pub destination_port: u16,
    #[serde(deserialize_with = "in_range")]
    pub destination_unit: u8,
    #[serde(deserialize_with = "in_range")]
    pub destination_address: u16,

    /// What to read on the source side (`holding`, `input` or `coil`)
    pub register_type: RegisterType,

    /// Cycle interval in seconds, cycles start on multiples of it
    #[serde(deserialize_with = "in_range")]
    pub interval: u32,
}

/// Deserialize an integer, rejecting values that do not fit `T`.
///
/// `json5` saturates out-of-range numbers to the target type's bounds.
fn in_range<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<i64>,
{
    let value = i64::deserialize(deserializer)?;
    T::try_from(value).map_err(|_| {
        D::Error::custom(format!(
            "{} is out of range for {}",
            value,
            std::any::type_name::<T>()
        ))
    })
}

impl BridgeConfig {
    pub fn source(&self) -> Endpoint<'_> {
        Endpoint {
            host: &self.source_host,
            port: self.source_port,
        }
    }

    pub fn destination(&self) -> Endpoint<'_> {
        Endpoint {
            host: &self.destination_host,
            port: self.destination_port,
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval == 0 {
            return Err(ConfigError::Validation(
                "interval must be at least 1 second".to_string(),
            ));
        }

        if self.source_host.trim().is_empty() {
            return Err(ConfigError::Validation(
                "source_host cannot be empty".to_string(),
            ));
        }

        if self.destination_host.trim().is_empty() {
            return Err(ConfigError::Validation(
                "destination_host cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Modbus data tables a value can be read from.
///
/// Any other name is kept as [`RegisterType::Unknown`]; reads of it fail
/// every cycle without touching the device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RegisterType {
    /// Holding registers (read/write, 16-bit)
    Holding,
    /// Input registers (read-only, 16-bit)
    Input,
    /// Discrete output coils (read/write, 1-bit)
    Coil,
    /// Unrecognized name, as written in the configuration
    Unknown(String),
}

impl RegisterType {
    /// Return the string name for this register type.
    pub fn as_str(&self) -> &str {
        match self {
            RegisterType::Holding => "holding",
            RegisterType::Input => "input",
            RegisterType::Coil => "coil",
            RegisterType::Unknown(name) => name,
        }
    }
}

impl fmt::Display for RegisterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for RegisterType {
    fn from(value: &str) -> Self {
        match value {
            "holding" => RegisterType::Holding,
            "input" => RegisterType::Input,
            "coil" => RegisterType::Coil,
            other => RegisterType::Unknown(other.to_string()),
        }
    }
}

impl From<String> for RegisterType {
    fn from(value: String) -> Self {
        RegisterType::from(value.as_str())
    }
}

impl From<RegisterType> for String {
    fn from(value: RegisterType) -> Self {
        value.as_str().to_string()
    }
}

impl ModbridgeConfig {
    /// Load configuration from a JSON5 file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        content.parse()
    }
}

impl FromStr for ModbridgeConfig {
    type Err = ConfigError;

    fn from_str(content: &str) -> Result<Self, Self::Err> {
        let config: ModbridgeConfig = json5::from_str(content)?;
        config.modbus.validate()?;
        Ok(config)
    }
}
