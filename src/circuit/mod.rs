//! Logic-circuit model built by the parser.
//!
//! The [`Circuit`] struct bundles the name table with the device list, the
//! wiring rules and the monitoring points, in a form suitable for cycle-based
//! simulation.

mod devices;
mod model;
mod monitors;
mod network;

pub use devices::{
    DTypePorts, Device, DeviceError, DeviceKind, DeviceState, Devices, OutputRef, Signal,
    MAX_GATE_INPUTS,
};
pub use model::Circuit;
pub use monitors::{Monitor, MonitorOutcome, Monitors};
pub use network::{ConnectOutcome, Network, NetworkConfig, DEFAULT_MAX_ITERATIONS};
