//! Modbus register bridge.
//!
//! Periodically reads one holding register, input register or coil from a
//! source device and writes the value to a holding register on a destination
//! device (Modbus TCP).
//!
//! - [`config`] - JSON5 configuration of the source/destination pair
//! - [`client`] - Connection capability and the `tokio-modbus` implementation
//! - [`accessor`] - Register-type dispatch for single values
//! - [`scheduler`] - Interval alignment to wall-clock boundaries
//! - [`bridge`] - The cycle state machine and the endless loop

pub mod accessor;
pub mod bridge;
pub mod client;
pub mod config;
pub mod scheduler;

pub use accessor::{AccessError, RegisterValue};
pub use bridge::BridgeLoop;
pub use client::{ClientError, Connector, Endpoint, RegisterClient, TcpConnector};
pub use config::{BridgeConfig, ConfigError, ModbridgeConfig, RegisterType};
pub use scheduler::{Clock, IntervalScheduler, SystemClock, Wait};
