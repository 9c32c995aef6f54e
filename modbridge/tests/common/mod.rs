//! In-memory devices and a virtual clock for driving the bridge in tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use modbridge::{
    BridgeConfig, ClientError, Clock, Connector, Endpoint, RegisterClient, RegisterType,
};

pub const SOURCE: &str = "source.plc:502";
pub const DESTINATION: &str = "destination.plc:5020";

/// Configuration matching [`SOURCE`] and [`DESTINATION`].
pub fn bridge_config(register_type: RegisterType) -> BridgeConfig {
    BridgeConfig {
        source_host: "source.plc".to_string(),
        source_port: 502,
        source_unit: 1,
        source_address: 10,
        destination_host: "destination.plc".to_string(),
        destination_port: 5020,
        destination_unit: 3,
        destination_address: 20,
        register_type,
        interval: 60,
    }
}

/// Every interaction with a fake device, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Connect(String),
    ReadHolding { endpoint: String, unit: u8, address: u16, count: u16 },
    ReadInput { endpoint: String, unit: u8, address: u16, count: u16 },
    ReadCoils { endpoint: String, unit: u8, address: u16, count: u16 },
    Write { endpoint: String, unit: u8, address: u16, value: u16 },
    Close(String),
}

impl Call {
    pub fn endpoint(&self) -> &str {
        match self {
            Call::Connect(endpoint) | Call::Close(endpoint) => endpoint,
            Call::ReadHolding { endpoint, .. }
            | Call::ReadInput { endpoint, .. }
            | Call::ReadCoils { endpoint, .. }
            | Call::Write { endpoint, .. } => endpoint,
        }
    }
}

#[derive(Default)]
struct Devices {
    calls: Vec<Call>,
    unreachable: HashSet<String>,
    failing: HashSet<String>,
    registers: HashMap<(String, u16), u16>,
    coils: HashMap<(String, u16), bool>,
    open: usize,
    max_open: usize,
}

/// Connector to a set of simulated devices keyed by `host:port`.
#[derive(Clone, Default)]
pub struct FakeConnector {
    devices: Arc<Mutex<Devices>>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_register(&self, endpoint: &str, address: u16, value: u16) {
        let mut devices = self.devices.lock().unwrap();
        devices.registers.insert((endpoint.to_string(), address), value);
    }

    pub fn set_coil(&self, endpoint: &str, address: u16, on: bool) {
        let mut devices = self.devices.lock().unwrap();
        devices.coils.insert((endpoint.to_string(), address), on);
    }

    pub fn register(&self, endpoint: &str, address: u16) -> Option<u16> {
        let devices = self.devices.lock().unwrap();
        devices.registers.get(&(endpoint.to_string(), address)).copied()
    }

    /// Refuse connections to `endpoint` while `down` is true.
    pub fn set_unreachable(&self, endpoint: &str, down: bool) {
        let mut devices = self.devices.lock().unwrap();
        if down {
            devices.unreachable.insert(endpoint.to_string());
        } else {
            devices.unreachable.remove(endpoint);
        }
    }

    /// Answer every request on `endpoint` with a Modbus exception.
    pub fn set_failing(&self, endpoint: &str) {
        let mut devices = self.devices.lock().unwrap();
        devices.failing.insert(endpoint.to_string());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.devices.lock().unwrap().calls.clone()
    }

    pub fn take_calls(&self) -> Vec<Call> {
        std::mem::take(&mut self.devices.lock().unwrap().calls)
    }

    /// Highest number of simultaneously open connections seen.
    pub fn max_open(&self) -> usize {
        self.devices.lock().unwrap().max_open
    }

    pub fn open(&self) -> usize {
        self.devices.lock().unwrap().open
    }
}

impl Connector for FakeConnector {
    type Client = FakeClient;

    async fn connect(&self, endpoint: Endpoint<'_>) -> Result<FakeClient, ClientError> {
        let endpoint = endpoint.to_string();
        let mut devices = self.devices.lock().unwrap();
        devices.calls.push(Call::Connect(endpoint.clone()));

        if devices.unreachable.contains(&endpoint) {
            return Err(ClientError::Connect(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            )));
        }

        devices.open += 1;
        devices.max_open = devices.max_open.max(devices.open);

        Ok(FakeClient {
            endpoint,
            devices: self.devices.clone(),
        })
    }
}

/// Open connection to one simulated device.
pub struct FakeClient {
    endpoint: String,
    devices: Arc<Mutex<Devices>>,
}

impl FakeClient {
    fn check(&self, devices: &Devices) -> Result<(), ClientError> {
        if devices.failing.contains(&self.endpoint) {
            Err(ClientError::Exception("IllegalDataAddress".to_string()))
        } else {
            Ok(())
        }
    }

    fn words(&self, devices: &Devices, address: u16) -> Result<Vec<u16>, ClientError> {
        self.check(devices)?;
        devices
            .registers
            .get(&(self.endpoint.clone(), address))
            .map(|value| vec![*value])
            .ok_or_else(|| ClientError::Exception("IllegalDataAddress".to_string()))
    }
}

impl RegisterClient for FakeClient {
    async fn read_holding_registers(
        &mut self,
        unit: u8,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, ClientError> {
        let mut devices = self.devices.lock().unwrap();
        devices.calls.push(Call::ReadHolding {
            endpoint: self.endpoint.clone(),
            unit,
            address,
            count,
        });
        self.words(&devices, address)
    }

    async fn read_input_registers(
        &mut self,
        unit: u8,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, ClientError> {
        let mut devices = self.devices.lock().unwrap();
        devices.calls.push(Call::ReadInput {
            endpoint: self.endpoint.clone(),
            unit,
            address,
            count,
        });
        self.words(&devices, address)
    }

    async fn read_coils(
        &mut self,
        unit: u8,
        address: u16,
        count: u16,
    ) -> Result<Vec<bool>, ClientError> {
        let mut devices = self.devices.lock().unwrap();
        devices.calls.push(Call::ReadCoils {
            endpoint: self.endpoint.clone(),
            unit,
            address,
            count,
        });
        self.check(&devices)?;
        devices
            .coils
            .get(&(self.endpoint.clone(), address))
            .map(|on| vec![*on])
            .ok_or_else(|| ClientError::Exception("IllegalDataAddress".to_string()))
    }

    async fn write_register(
        &mut self,
        unit: u8,
        address: u16,
        value: u16,
    ) -> Result<(), ClientError> {
        let mut devices = self.devices.lock().unwrap();
        devices.calls.push(Call::Write {
            endpoint: self.endpoint.clone(),
            unit,
            address,
            value,
        });
        self.check(&devices)?;
        devices
            .registers
            .insert((self.endpoint.clone(), address), value);
        Ok(())
    }

    async fn close(self) {
        let mut devices = self.devices.lock().unwrap();
        devices.calls.push(Call::Close(self.endpoint.clone()));
        devices.open -= 1;
    }
}

#[derive(Default)]
struct ClockState {
    now: i64,
    sleeps: Vec<Duration>,
}

/// Clock whose sleeps advance a simulated Unix time without blocking.
#[derive(Clone, Default)]
pub struct FakeClock {
    state: Arc<Mutex<ClockState>>,
}

impl FakeClock {
    pub fn at(now: i64) -> Self {
        let clock = Self::default();
        clock.state.lock().unwrap().now = now;
        clock
    }

    pub fn now(&self) -> i64 {
        self.state.lock().unwrap().now
    }

    pub fn take_sleeps(&self) -> Vec<Duration> {
        std::mem::take(&mut self.state.lock().unwrap().sleeps)
    }

    pub fn total_slept(&self) -> Duration {
        self.state.lock().unwrap().sleeps.iter().sum()
    }
}

impl Clock for FakeClock {
    fn unix_time(&self) -> i64 {
        self.now()
    }

    async fn sleep(&self, duration: Duration) {
        let mut state = self.state.lock().unwrap();
        state.now += duration.as_secs() as i64;
        state.sleeps.push(duration);
    }
}
