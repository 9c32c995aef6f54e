//! The bridge control loop.
//!
//! Each cycle walks an explicit state machine:
//!
//! ```text
//! ConnectSource → ReadSource → CloseSource → ConnectDestination
//!     → WriteDestination → CloseDestination → (wait)
//! ```
//!
//! A step either moves to the next state or ends the cycle with the [`Wait`]
//! to perform. A failed source connect, a failed read (including an unknown
//! register type) or a failed destination connect ends the cycle with a fixed
//! one-interval delay. A write failure is only logged. Only a cycle that
//! reaches the destination ends with an aligned wait.

use std::convert::Infallible;
use std::ops::ControlFlow;

use tracing::{error, info, trace, warn};

use crate::accessor::{self, RegisterValue};
use crate::client::{Connector, RegisterClient};
use crate::config::{BridgeConfig, RegisterType};
use crate::scheduler::{Clock, IntervalScheduler, Wait};

/// One step of a bridge cycle.
///
/// Connections are owned by the state that uses them, so a client can
/// never outlive its step or overlap with the other endpoint's client.
enum CycleState<C> {
    ConnectSource,
    ReadSource(C),
    CloseSource(C, Option<RegisterValue>),
    ConnectDestination(RegisterValue),
    WriteDestination(C, RegisterValue),
    CloseDestination(C),
}

impl<C> CycleState<C> {
    fn name(&self) -> &'static str {
        match self {
            CycleState::ConnectSource => "connect_source",
            CycleState::ReadSource(_) => "read_source",
            CycleState::CloseSource(..) => "close_source",
            CycleState::ConnectDestination(_) => "connect_destination",
            CycleState::WriteDestination(..) => "write_destination",
            CycleState::CloseDestination(_) => "close_destination",
        }
    }
}

/// Bridges one register from the source device to the destination device.
pub struct BridgeLoop<N, K> {
    config: BridgeConfig,
    connector: N,
    scheduler: IntervalScheduler<K>,
}

impl<N: Connector, K: Clock> BridgeLoop<N, K> {
    pub fn new(config: BridgeConfig, connector: N, clock: K) -> Self {
        let scheduler = IntervalScheduler::new(clock, config.interval);
        Self {
            config,
            connector,
            scheduler,
        }
    }

    /// Run cycles forever.
    pub async fn run(&self) -> Infallible {
        info!(
            source = %self.config.source(),
            destination = %self.config.destination(),
            register_type = %self.config.register_type,
            interval_secs = self.config.interval,
            "Starting bridge loop"
        );

        if let RegisterType::Unknown(name) = &self.config.register_type {
            warn!(register_type = %name, "Unknown register type, every read will fail");
        }

        loop {
            self.iterate().await;
        }
    }

    /// Run one cycle and the wait that follows it.
    pub async fn iterate(&self) -> Wait {
        let wait = self.run_cycle().await;
        self.scheduler.wait(wait).await;
        wait
    }

    /// Run one cycle and return the wait it ended with.
    pub async fn run_cycle(&self) -> Wait {
        let mut state = CycleState::ConnectSource;
        loop {
            trace!(state = state.name(), "Cycle step");
            match self.step(state).await {
                ControlFlow::Continue(next) => state = next,
                ControlFlow::Break(wait) => {
                    trace!(?wait, "Cycle finished");
                    return wait;
                }
            }
        }
    }

    async fn step(&self, state: CycleState<N::Client>) -> ControlFlow<Wait, CycleState<N::Client>> {
        let config = &self.config;

        match state {
            CycleState::ConnectSource => {
                let endpoint = config.source();
                info!(%endpoint, "Connecting to source host");
                match self.connector.connect(endpoint).await {
                    Ok(client) => ControlFlow::Continue(CycleState::ReadSource(client)),
                    Err(e) => {
                        error!(%endpoint, error = %e, "Failed to connect to source");
                        ControlFlow::Break(Wait::Fixed)
                    }
                }
            }
            CycleState::ReadSource(mut client) => {
                let value = accessor::read(
                    &mut client,
                    &config.register_type,
                    config.source_address,
                    config.source_unit,
                )
                .await
                .ok();
                ControlFlow::Continue(CycleState::CloseSource(client, value))
            }
            CycleState::CloseSource(client, value) => {
                client.close().await;
                match value {
                    Some(value) => ControlFlow::Continue(CycleState::ConnectDestination(value)),
                    None => ControlFlow::Break(Wait::Fixed),
                }
            }
            CycleState::ConnectDestination(value) => {
                let endpoint = config.destination();
                info!(%endpoint, "Connecting to destination host");
                match self.connector.connect(endpoint).await {
                    Ok(client) => ControlFlow::Continue(CycleState::WriteDestination(client, value)),
                    Err(e) => {
                        error!(
                            %endpoint, error = %e, discarded = %value,
                            "Failed to connect to destination"
                        );
                        ControlFlow::Break(Wait::Fixed)
                    }
                }
            }
            CycleState::WriteDestination(mut client, value) => {
                // Failures are logged by the accessor and not retried.
                if let Err(e) = accessor::write(
                    &mut client,
                    config.destination_address,
                    value,
                    config.destination_unit,
                )
                .await
                {
                    trace!(error = %e, "Write not retried");
                }
                ControlFlow::Continue(CycleState::CloseDestination(client))
            }
            CycleState::CloseDestination(client) => {
                client.close().await;
                ControlFlow::Break(Wait::Aligned)
            }
        }
    }
}
