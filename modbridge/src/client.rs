//! Register client capability and its Modbus TCP implementation.
//!
//! The bridge only talks to devices through [`Connector`] and
//! [`RegisterClient`], so the control loop can be driven by an in-memory
//! fake in tests.

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use tokio_modbus::client::{Client as _, Context, Reader as _, Writer as _, tcp};
use tokio_modbus::prelude::{Slave, SlaveContext as _};
use tracing::debug;

/// Connect timeout applied by [`TcpConnector::default`].
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Error type for client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Failed to resolve {endpoint}: {source}")]
    Resolve {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },
    #[error("No address found for {0}")]
    NoAddress(String),
    #[error("Connection to {0} timed out")]
    Timeout(String),
    #[error("Connection failed: {0}")]
    Connect(#[from] std::io::Error),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Exception: {0}")]
    Exception(String),
    #[error("Empty response")]
    EmptyResponse,
}

/// A `host:port` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint<'a> {
    pub host: &'a str,
    pub port: u16,
}

impl fmt::Display for Endpoint<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Opens connections to endpoints.
#[allow(async_fn_in_trait)]
pub trait Connector {
    type Client: RegisterClient;

    async fn connect(&self, endpoint: Endpoint<'_>) -> Result<Self::Client, ClientError>;
}

/// An open connection to one device.
///
/// `unit` selects the device behind the connection for each request.
#[allow(async_fn_in_trait)]
pub trait RegisterClient {
    async fn read_holding_registers(
        &mut self,
        unit: u8,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, ClientError>;

    async fn read_input_registers(
        &mut self,
        unit: u8,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, ClientError>;

    async fn read_coils(
        &mut self,
        unit: u8,
        address: u16,
        count: u16,
    ) -> Result<Vec<bool>, ClientError>;

    async fn write_register(
        &mut self,
        unit: u8,
        address: u16,
        value: u16,
    ) -> Result<(), ClientError>;

    /// Release the connection. Never fails; problems are only logged.
    async fn close(self);
}

/// Connector for Modbus TCP devices.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    timeout: Duration,
}

impl TcpConnector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for TcpConnector {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECT_TIMEOUT)
    }
}

impl Connector for TcpConnector {
    type Client = TcpClient;

    async fn connect(&self, endpoint: Endpoint<'_>) -> Result<TcpClient, ClientError> {
        let addr: SocketAddr = tokio::net::lookup_host((endpoint.host, endpoint.port))
            .await
            .map_err(|e| ClientError::Resolve {
                endpoint: endpoint.to_string(),
                source: e,
            })?
            .next()
            .ok_or_else(|| ClientError::NoAddress(endpoint.to_string()))?;

        let ctx = tokio::time::timeout(self.timeout, tcp::connect(addr))
            .await
            .map_err(|_| ClientError::Timeout(endpoint.to_string()))??;

        debug!(%endpoint, %addr, "Connected");
        Ok(TcpClient { ctx, addr })
    }
}

/// An open Modbus TCP connection.
pub struct TcpClient {
    ctx: Context,
    addr: SocketAddr,
}

impl RegisterClient for TcpClient {
    async fn read_holding_registers(
        &mut self,
        unit: u8,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, ClientError> {
        self.ctx.set_slave(Slave(unit));
        self.ctx
            .read_holding_registers(address, count)
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?
            .map_err(|e| ClientError::Exception(format!("{:?}", e)))
    }

    async fn read_input_registers(
        &mut self,
        unit: u8,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, ClientError> {
        self.ctx.set_slave(Slave(unit));
        self.ctx
            .read_input_registers(address, count)
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?
            .map_err(|e| ClientError::Exception(format!("{:?}", e)))
    }

    async fn read_coils(
        &mut self,
        unit: u8,
        address: u16,
        count: u16,
    ) -> Result<Vec<bool>, ClientError> {
        self.ctx.set_slave(Slave(unit));
        self.ctx
            .read_coils(address, count)
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?
            .map_err(|e| ClientError::Exception(format!("{:?}", e)))
    }

    async fn write_register(
        &mut self,
        unit: u8,
        address: u16,
        value: u16,
    ) -> Result<(), ClientError> {
        self.ctx.set_slave(Slave(unit));
        self.ctx
            .write_single_register(address, value)
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?
            .map_err(|e| ClientError::Exception(format!("{:?}", e)))
    }

    async fn close(mut self) {
        if let Err(e) = self.ctx.disconnect().await {
            debug!(addr = %self.addr, error = %e, "Disconnect failed");
        }
    }
}
