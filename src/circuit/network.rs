//! Connections between devices and cycle-by-cycle network execution.

use log::{debug, trace};

use super::devices::{Device, DeviceKind, DeviceState, Devices, OutputRef, Signal};
use crate::names::NameId;

/// Default number of settle passes per cycle before declaring oscillation.
pub const DEFAULT_MAX_ITERATIONS: usize = 20;

/// Outcome of [`Network::make_connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    Ok,
    DeviceAbsent,
    InputToInput,
    OutputToOutput,
    InputConnected,
    PortAbsent,
}

/// Configuration for network execution.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Maximum settle passes per cycle.
    pub max_iterations: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl NetworkConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum settle passes per cycle.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}

/// Wiring and execution rules over a [`Devices`] list.
#[derive(Debug, Clone, Default)]
pub struct Network {
    config: NetworkConfig,
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: NetworkConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Wire an output to an input. Either side may name the output.
    pub fn make_connection(
        &self,
        devices: &mut Devices,
        first_id: NameId,
        first_port: Option<NameId>,
        second_id: NameId,
        second_port: Option<NameId>,
    ) -> ConnectOutcome {
        let (first, second) = match (devices.get_device(first_id), devices.get_device(second_id)) {
            (Some(first), Some(second)) => (first, second),
            _ => return ConnectOutcome::DeviceAbsent,
        };

        let (input, output): ((NameId, NameId), OutputRef) =
            if let Some(port) = first_port.filter(|p| first.has_input(*p)) {
                if first.inputs[&port].is_some() {
                    return ConnectOutcome::InputConnected;
                }
                if second_port.map_or(false, |p| second.has_input(p)) {
                    return ConnectOutcome::InputToInput;
                }
                if !second.has_output(second_port) {
                    return ConnectOutcome::PortAbsent;
                }
                ((first_id, port), (second_id, second_port))
            } else if first.has_output(first_port) {
                if second.has_output(second_port) {
                    return ConnectOutcome::OutputToOutput;
                }
                let Some(port) = second_port.filter(|p| second.has_input(*p)) else {
                    return ConnectOutcome::PortAbsent;
                };
                if second.inputs[&port].is_some() {
                    return ConnectOutcome::InputConnected;
                }
                ((second_id, port), (first_id, first_port))
            } else {
                return ConnectOutcome::PortAbsent;
            };

        if let Some(device) = devices.get_device_mut(input.0) {
            device.inputs.insert(input.1, Some(output));
        }
        ConnectOutcome::Ok
    }

    /// Input ports of `device` that nothing drives.
    pub fn floating_inputs(&self, device: &Device) -> Vec<NameId> {
        device
            .inputs
            .iter()
            .filter(|(_, source)| source.is_none())
            .map(|(port, _)| *port)
            .collect()
    }

    /// Whether every input of every device is wired.
    pub fn check_network(&self, devices: &Devices) -> bool {
        devices.iter().all(|d| self.floating_inputs(d).is_empty())
    }

    pub fn get_connected_output(
        &self,
        devices: &Devices,
        id: NameId,
        port: NameId,
    ) -> Option<OutputRef> {
        devices.get_device(id)?.inputs.get(&port).copied().flatten()
    }

    pub fn get_output_signal(
        &self,
        devices: &Devices,
        id: NameId,
        port: Option<NameId>,
    ) -> Option<Signal> {
        devices.get_device(id)?.outputs.get(&port).copied()
    }

    pub fn get_input_signal(&self, devices: &Devices, id: NameId, port: NameId) -> Option<Signal> {
        let (source, source_port) = self.get_connected_output(devices, id, port)?;
        self.get_output_signal(devices, source, source_port)
    }

    /// Advance the network by one cycle.
    ///
    /// Returns false if some input is unwired or the gates fail to settle.
    pub fn execute_network(&self, devices: &mut Devices) -> bool {
        for device in devices.iter_mut() {
            update_source(device);
        }

        let ports = devices.dtype;
        for id in devices.find_devices(Some(DeviceKind::DType)) {
            let Some(clk) = self.get_input_signal(devices, id, ports.clk) else {
                return false;
            };
            if clk != Signal::Rising {
                continue;
            }
            let Some(data) = self.get_input_signal(devices, id, ports.data) else {
                return false;
            };
            if let Some(device) = devices.get_device_mut(id) {
                if let DeviceState::DType { memory } = &mut device.state {
                    *memory = data.settled();
                }
            }
        }

        let order = devices.find_devices(None);
        for pass in 0..self.config.max_iterations {
            let mut steady = true;
            for id in &order {
                let Some(outputs) = self.evaluate(devices, *id) else {
                    return false;
                };
                let Some(device) = devices.get_device_mut(*id) else {
                    continue;
                };
                // SET and CLEAR persist in memory
                if let (DeviceState::DType { memory }, Some((_, level))) =
                    (&mut device.state, outputs.first())
                {
                    *memory = *level;
                }
                for (port, signal) in outputs {
                    if device.outputs.insert(port, signal) != Some(signal) {
                        steady = false;
                    }
                }
            }
            if steady {
                trace!("network settled after {} pass(es)", pass + 1);
                return true;
            }
        }
        debug!(
            "network did not settle within {} passes",
            self.config.max_iterations
        );
        false
    }

    /// New output values for a gate or D-type from its current inputs; sources
    /// yield no outputs. None if an input is unwired.
    fn evaluate(&self, devices: &Devices, id: NameId) -> Option<Vec<(Option<NameId>, Signal)>> {
        let device = devices.get_device(id)?;
        match device.kind {
            DeviceKind::DType => {
                let ports = devices.dtype;
                let set = self.get_input_signal(devices, id, ports.set)?;
                let clear = self.get_input_signal(devices, id, ports.clear)?;
                let DeviceState::DType { memory } = &device.state else {
                    return Some(Vec::new());
                };
                let level = if set.is_high() {
                    Signal::High
                } else if clear.is_high() {
                    Signal::Low
                } else {
                    *memory
                };
                Some(vec![(Some(ports.q), level), (Some(ports.qbar), level.invert())])
            }
            kind if kind.is_gate() => {
                let mut high = 0;
                for port in device.inputs.keys() {
                    if self.get_input_signal(devices, id, *port)?.is_high() {
                        high += 1;
                    }
                }
                let all = high == device.inputs.len();
                let level = match kind {
                    DeviceKind::And => all,
                    DeviceKind::Nand => !all,
                    DeviceKind::Or => high > 0,
                    DeviceKind::Nor => high == 0,
                    _ => high % 2 == 1,
                };
                Some(vec![(None, Signal::from_bool(level))])
            }
            _ => Some(Vec::new()),
        }
    }
}

/// Step clocks, signal generators and switches.
fn update_source(device: &mut Device) {
    match &mut device.state {
        DeviceState::Clock {
            half_period,
            counter,
        } => {
            let current = device.outputs.get(&None).copied().unwrap_or(Signal::Low);
            *counter += 1;
            let next = if *counter >= *half_period {
                *counter = 0;
                if current.is_high() {
                    Signal::Falling
                } else {
                    Signal::Rising
                }
            } else {
                current.settled()
            };
            device.outputs.insert(None, next);
        }
        DeviceState::SigGen { high, low, counter } => {
            // counter: cycles already spent at the current level
            let current = device.outputs.get(&None).copied().map_or(true, Signal::is_high);
            let length = if current { *high } else { *low };
            let next = if *counter < length {
                *counter += 1;
                current
            } else {
                *counter = 1;
                !current
            };
            device.outputs.insert(None, Signal::from_bool(next));
        }
        DeviceState::Switch { state } => {
            device.outputs.insert(None, *state);
        }
        // D-types latch after every clock has stepped
        DeviceState::DType { .. } | DeviceState::Gate => {}
    }
}
