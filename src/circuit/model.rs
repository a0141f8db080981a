//! The complete circuit: names, devices, network and monitors.

use log::{info, warn};

use super::devices::{DeviceKind, Devices, Signal};
use super::monitors::Monitors;
use super::network::{Network, NetworkConfig};
use crate::error::{LogsimError, Result};
use crate::names::Names;

/// A circuit ready for simulation.
///
/// Each parse needs its own `Circuit`; none of the parts are shared.
#[derive(Debug, Clone)]
pub struct Circuit {
    pub names: Names,
    pub devices: Devices,
    pub network: Network,
    pub monitors: Monitors,
    cycles_completed: usize,
}

impl Circuit {
    /// Create an empty circuit with default network configuration.
    pub fn new() -> Self {
        Self::with_config(NetworkConfig::default())
    }

    /// Create an empty circuit with custom network configuration.
    pub fn with_config(config: NetworkConfig) -> Self {
        let mut names = Names::new();
        let devices = Devices::new(&mut names);
        Self {
            names,
            devices,
            network: Network::with_config(config),
            monitors: Monitors::new(),
            cycles_completed: 0,
        }
    }

    pub fn cycles_completed(&self) -> usize {
        self.cycles_completed
    }

    /// Start from cold and run `cycles` cycles, recording monitors.
    pub fn run(&mut self, cycles: usize) -> Result<()> {
        self.devices.cold_startup();
        self.monitors.reset_monitors();
        self.cycles_completed = 0;
        self.continue_run(cycles)
    }

    /// Run `cycles` more cycles without resetting.
    pub fn continue_run(&mut self, cycles: usize) -> Result<()> {
        for _ in 0..cycles {
            if !self.network.execute_network(&mut self.devices) {
                warn!("network oscillating at cycle {}", self.cycles_completed);
                return Err(LogsimError::Oscillation {
                    cycle: self.cycles_completed,
                });
            }
            self.monitors.record_signals(&self.devices);
            self.cycles_completed += 1;
        }
        info!("ran {} cycle(s), {} total", cycles, self.cycles_completed);
        Ok(())
    }

    /// Set a switch by its declared name.
    pub fn set_switch_by_name(&mut self, name: &str, high: bool) -> Result<()> {
        let id = self
            .names
            .query(name)
            .filter(|id| {
                self.devices
                    .get_device(*id)
                    .map_or(false, |d| d.kind == DeviceKind::Switch)
            })
            .ok_or_else(|| LogsimError::UnknownSwitch {
                name: name.to_string(),
            })?;
        self.devices.set_switch(id, Signal::from_bool(high));
        Ok(())
    }

    /// Monitor traces as text.
    pub fn display_signals(&self) -> String {
        self.monitors.display_signals(&self.names, &self.devices)
    }
}

impl Default for Circuit {
    fn default() -> Self {
        Self::new()
    }
}
