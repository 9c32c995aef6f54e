//! Modbus register bridge.
//!
//! Reads one register from a source device and writes it to a destination
//! device on a wall-clock-aligned schedule, forever.

use anyhow::{Context, Result};
use modbridge::{BridgeLoop, ModbridgeConfig, SystemClock, TcpConnector};
use modbridge_common::BridgeArgs;
use tracing::info;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = BridgeArgs::parse_with_default("modbridge.json5");

    // Load configuration
    let config = ModbridgeConfig::load_from_file(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;

    // Initialize logging
    let log_config = config.logging.with_level_override(args.log_level.as_deref());
    modbridge_common::init_tracing(&log_config)
        .map_err(|e| anyhow::anyhow!("Failed to init tracing: {}", e))?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting modbridge");
    info!("Loaded configuration from {:?}", args.config);

    let bridge = BridgeLoop::new(config.modbus, TcpConnector::default(), SystemClock);
    match bridge.run().await {}
}
