//! Register-type dispatch for single-value reads and writes.

use std::fmt;

use tracing::{error, info};

use crate::client::{ClientError, RegisterClient};
use crate::config::RegisterType;

/// A single register value.
///
/// Holding and input registers carry the raw 16-bit word; coils are 0 or 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegisterValue(u16);

impl RegisterValue {
    pub fn new(raw: u16) -> Self {
        Self(raw)
    }

    pub fn from_coil(on: bool) -> Self {
        Self(u16::from(on))
    }

    pub fn raw(self) -> u16 {
        self.0
    }
}

impl fmt::Display for RegisterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Failed register access.
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("Unknown register type '{0}' (use holding, input, or coil)")]
    UnknownType(String),
    #[error("Failed to read {register_type} register at address {address}, unit {unit}: {source}")]
    ReadFailed {
        register_type: RegisterType,
        address: u16,
        unit: u8,
        #[source]
        source: ClientError,
    },
    #[error("Failed to write value {value} to register at address {address}, unit {unit}: {source}")]
    WriteFailed {
        address: u16,
        unit: u8,
        value: RegisterValue,
        #[source]
        source: ClientError,
    },
}

/// Read one value of the given type.
///
/// Issues exactly one client request for a single element, or none for an
/// unknown type.
pub async fn read<C: RegisterClient>(
    client: &mut C,
    register_type: &RegisterType,
    address: u16,
    unit: u8,
) -> Result<RegisterValue, AccessError> {
    let result = match register_type {
        RegisterType::Holding => client
            .read_holding_registers(unit, address, 1)
            .await
            .and_then(|words| first(words).map(RegisterValue::new)),
        RegisterType::Input => client
            .read_input_registers(unit, address, 1)
            .await
            .and_then(|words| first(words).map(RegisterValue::new)),
        RegisterType::Coil => client
            .read_coils(unit, address, 1)
            .await
            .and_then(|bits| first(bits).map(RegisterValue::from_coil)),
        RegisterType::Unknown(name) => {
            error!(register_type = %name, address, unit, "Unknown register type");
            return Err(AccessError::UnknownType(name.clone()));
        }
    };

    match result {
        Ok(value) => {
            info!(%register_type, address, unit, %value, "Read register value");
            Ok(value)
        }
        Err(e) => {
            error!(%register_type, address, unit, error = %e, "Failed to read register");
            Err(AccessError::ReadFailed {
                register_type: register_type.clone(),
                address,
                unit,
                source: e,
            })
        }
    }
}

/// Write one value to a holding register.
pub async fn write<C: RegisterClient>(
    client: &mut C,
    address: u16,
    value: RegisterValue,
    unit: u8,
) -> Result<(), AccessError> {
    match client.write_register(unit, address, value.raw()).await {
        Ok(()) => {
            info!(address, unit, %value, "Wrote register value");
            Ok(())
        }
        Err(e) => {
            error!(address, unit, %value, error = %e, "Failed to write register");
            Err(AccessError::WriteFailed {
                address,
                unit,
                value,
                source: e,
            })
        }
    }
}

fn first<T>(values: Vec<T>) -> Result<T, ClientError> {
    values.into_iter().next().ok_or(ClientError::EmptyResponse)
}
