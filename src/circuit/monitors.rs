//! Monitoring points: per-output signal histories recorded cycle by cycle.

use super::devices::{Devices, Signal};
use crate::names::{NameId, Names};

/// Outcome of [`Monitors::make_monitor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorOutcome {
    Ok,
    NotOutput,
    DeviceAbsent,
    AlreadyMonitored,
}

/// One monitored output and its history.
#[derive(Debug, Clone)]
pub struct Monitor {
    pub device: NameId,
    pub port: Option<NameId>,
    pub trace: Vec<Signal>,
}

/// All monitoring points, in the order they were added.
#[derive(Debug, Clone, Default)]
pub struct Monitors {
    monitors: Vec<Monitor>,
}

impl Monitors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start monitoring an output. A monitor added after `cycles_completed`
    /// cycles is back-filled with [`Signal::Blank`].
    pub fn make_monitor(
        &mut self,
        devices: &Devices,
        device: NameId,
        port: Option<NameId>,
        cycles_completed: usize,
    ) -> MonitorOutcome {
        let Some(target) = devices.get_device(device) else {
            return MonitorOutcome::DeviceAbsent;
        };
        if !target.has_output(port) {
            return MonitorOutcome::NotOutput;
        }
        if self.position(device, port).is_some() {
            return MonitorOutcome::AlreadyMonitored;
        }
        self.monitors.push(Monitor {
            device,
            port,
            trace: vec![Signal::Blank; cycles_completed],
        });
        MonitorOutcome::Ok
    }

    /// Stop monitoring an output. Returns false if it was not monitored.
    pub fn remove_monitor(&mut self, device: NameId, port: Option<NameId>) -> bool {
        match self.position(device, port) {
            Some(index) => {
                self.monitors.remove(index);
                true
            }
            None => false,
        }
    }

    /// History of a monitored output.
    pub fn get_monitor_signal(&self, device: NameId, port: Option<NameId>) -> Option<&[Signal]> {
        self.position(device, port)
            .map(|index| self.monitors[index].trace.as_slice())
    }

    /// Append the current value of every monitored output.
    pub fn record_signals(&mut self, devices: &Devices) {
        for monitor in &mut self.monitors {
            let signal = devices
                .get_device(monitor.device)
                .and_then(|d| d.outputs.get(&monitor.port).copied())
                .unwrap_or(Signal::Blank);
            monitor.trace.push(signal);
        }
    }

    /// Clear every history, keeping the monitoring points.
    pub fn reset_monitors(&mut self) {
        for monitor in &mut self.monitors {
            monitor.trace.clear();
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Monitor> {
        self.monitors.iter()
    }

    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }

    /// Names of monitored outputs and of every other output.
    pub fn signal_names(&self, names: &Names, devices: &Devices) -> (Vec<String>, Vec<String>) {
        let monitored = self
            .monitors
            .iter()
            .filter_map(|m| devices.signal_name(names, m.device, m.port))
            .collect();
        let mut unmonitored = Vec::new();
        for device in devices.iter() {
            for port in device.outputs.keys() {
                if self.position(device.id, *port).is_none() {
                    if let Some(name) = devices.signal_name(names, device.id, *port) {
                        unmonitored.push(name);
                    }
                }
            }
        }
        (monitored, unmonitored)
    }

    /// Render every trace as one text line: `-` high, `_` low.
    pub fn display_signals(&self, names: &Names, devices: &Devices) -> String {
        let labels: Vec<String> = self
            .monitors
            .iter()
            .map(|m| {
                devices
                    .signal_name(names, m.device, m.port)
                    .unwrap_or_else(|| names.display(m.device))
            })
            .collect();
        let margin = labels.iter().map(String::len).max().unwrap_or(0);

        let mut out = String::new();
        for (label, monitor) in labels.iter().zip(&self.monitors) {
            let wave: String = monitor
                .trace
                .iter()
                .map(|signal| match signal {
                    Signal::High => '-',
                    Signal::Low => '_',
                    Signal::Rising => '/',
                    Signal::Falling => '\\',
                    Signal::Blank => ' ',
                })
                .collect();
            out.push_str(&format!("{:<width$} : {}\n", label, wave, width = margin));
        }
        out
    }

    fn position(&self, device: NameId, port: Option<NameId>) -> Option<usize> {
        self.monitors
            .iter()
            .position(|m| m.device == device && m.port == port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::DeviceKind;

    fn setup() -> (Names, Devices, NameId, NameId) {
        let mut names = Names::new();
        let mut devices = Devices::new(&mut names);
        let sw = names.lookup_one("SW1");
        let ff = names.lookup_one("FF1");
        devices.make_device(sw, DeviceKind::Switch, Some(1), None).unwrap();
        devices.make_device(ff, DeviceKind::DType, None, None).unwrap();
        (names, devices, sw, ff)
    }

    #[test]
    fn test_make_monitor_outcomes() {
        let (mut names, devices, sw, ff) = setup();
        let mut monitors = Monitors::new();
        let missing = names.lookup_one("NOPE");
        let data = Some(devices.dtype.data);
        let q = Some(devices.dtype.q);

        assert_eq!(monitors.make_monitor(&devices, sw, None, 0), MonitorOutcome::Ok);
        assert_eq!(
            monitors.make_monitor(&devices, sw, None, 0),
            MonitorOutcome::AlreadyMonitored
        );
        assert_eq!(
            monitors.make_monitor(&devices, missing, None, 0),
            MonitorOutcome::DeviceAbsent
        );
        assert_eq!(
            monitors.make_monitor(&devices, ff, data, 0),
            MonitorOutcome::NotOutput
        );
        assert_eq!(monitors.make_monitor(&devices, ff, q, 0), MonitorOutcome::Ok);
        assert_eq!(monitors.len(), 2);
        assert!(monitors.remove_monitor(sw, None));
        assert!(!monitors.remove_monitor(sw, None));
    }

    #[test]
    fn test_record_and_display() {
        let (names, devices, sw, ff) = setup();
        let mut monitors = Monitors::new();
        monitors.make_monitor(&devices, sw, None, 0);
        monitors.record_signals(&devices);
        monitors.make_monitor(&devices, ff, Some(devices.dtype.qbar), 1);
        monitors.record_signals(&devices);

        assert_eq!(
            monitors.get_monitor_signal(sw, None),
            Some(&[Signal::High, Signal::High][..])
        );
        assert_eq!(
            monitors.display_signals(&names, &devices),
            "SW1      : --\nFF1.QBAR :  -\n"
        );

        let (monitored, unmonitored) = monitors.signal_names(&names, &devices);
        assert_eq!(monitored, vec!["SW1", "FF1.QBAR"]);
        assert_eq!(unmonitored, vec!["FF1.Q"]);

        monitors.reset_monitors();
        assert_eq!(monitors.get_monitor_signal(sw, None), Some(&[][..]));
    }
}
