//! Device model: logic gates, clocks, switches, D-type flip-flops and
//! signal generators.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use thiserror::Error;

use crate::names::{NameId, Names};

/// Maximum number of inputs on an AND/OR/NAND/NOR gate.
pub const MAX_GATE_INPUTS: u64 = 16;

/// Logic level on a port. `Rising` and `Falling` mark a clock edge during the
/// cycle in which it happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    Low,
    High,
    Rising,
    Falling,
    /// No value recorded (monitor added mid-run)
    Blank,
}

impl Signal {
    pub fn from_bool(high: bool) -> Self {
        if high {
            Self::High
        } else {
            Self::Low
        }
    }

    /// Whether the level reads as logic 1.
    pub fn is_high(self) -> bool {
        matches!(self, Self::High | Self::Rising)
    }

    pub fn invert(self) -> Self {
        match self {
            Self::Low => Self::High,
            Self::High => Self::Low,
            Self::Rising => Self::Falling,
            Self::Falling => Self::Rising,
            Self::Blank => Self::Blank,
        }
    }

    /// Drop edge information.
    pub fn settled(self) -> Self {
        match self {
            Self::Rising => Self::High,
            Self::Falling => Self::Low,
            other => other,
        }
    }
}

/// Device kinds supported by the definition language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    And,
    Or,
    Nand,
    Nor,
    Xor,
    Clock,
    Switch,
    DType,
    /// Signal generator: a repeating high/low pattern
    SigGen,
}

impl DeviceKind {
    /// All kinds, gates first.
    pub const ALL: [DeviceKind; 9] = [
        Self::And,
        Self::Or,
        Self::Nand,
        Self::Nor,
        Self::Xor,
        Self::Clock,
        Self::Switch,
        Self::DType,
        Self::SigGen,
    ];

    /// Type name as written in a definition file.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
            Self::Nand => "NAND",
            Self::Nor => "NOR",
            Self::Xor => "XOR",
            Self::Clock => "CLOCK",
            Self::Switch => "SWITCH",
            Self::DType => "DTYPE",
            Self::SigGen => "SIGGEN",
        }
    }

    pub fn is_gate(&self) -> bool {
        matches!(
            self,
            Self::And | Self::Or | Self::Nand | Self::Nor | Self::Xor
        )
    }

    /// Number of numeric parameters a declaration of this kind carries.
    pub fn parameter_count(&self) -> usize {
        match self {
            Self::Xor | Self::DType => 0,
            Self::And | Self::Or | Self::Nand | Self::Nor | Self::Clock | Self::Switch => 1,
            Self::SigGen => 2,
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An output terminal: device id plus port (None for single-output devices).
pub type OutputRef = (NameId, Option<NameId>);

/// Kind-specific device state.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceState {
    Gate,
    Clock { half_period: u64, counter: u64 },
    Switch { state: Signal },
    DType { memory: Signal },
    SigGen { high: u64, low: u64, counter: u64 },
}

/// A device instance.
#[derive(Debug, Clone)]
pub struct Device {
    pub id: NameId,
    pub kind: DeviceKind,
    /// Input port -> the output driving it, if wired
    pub inputs: BTreeMap<NameId, Option<OutputRef>>,
    /// Output port -> current signal
    pub outputs: BTreeMap<Option<NameId>, Signal>,
    pub state: DeviceState,
}

impl Device {
    fn new(id: NameId, kind: DeviceKind, state: DeviceState) -> Self {
        Self {
            id,
            kind,
            inputs: BTreeMap::new(),
            outputs: BTreeMap::new(),
            state,
        }
    }

    pub fn has_input(&self, port: NameId) -> bool {
        self.inputs.contains_key(&port)
    }

    pub fn has_output(&self, port: Option<NameId>) -> bool {
        self.outputs.contains_key(&port)
    }
}

/// Reasons the device model refuses a declaration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("a device with this name already exists")]
    DevicePresent,
    #[error("a parameter is required")]
    NoQualifier,
    #[error("parameter {0} is out of range")]
    InvalidQualifier(u64),
    #[error("no parameter is accepted")]
    QualifierPresent,
}

/// Port ids of the D-type flip-flop.
#[derive(Debug, Clone, Copy)]
pub struct DTypePorts {
    pub clk: NameId,
    pub set: NameId,
    pub clear: NameId,
    pub data: NameId,
    pub q: NameId,
    pub qbar: NameId,
}

impl DTypePorts {
    pub fn inputs(&self) -> [NameId; 4] {
        [self.clk, self.set, self.clear, self.data]
    }

    pub fn outputs(&self) -> [NameId; 2] {
        [self.q, self.qbar]
    }
}

/// All declared devices plus the fixed id sets for kinds and ports.
#[derive(Debug, Clone)]
pub struct Devices {
    devices: Vec<Device>,
    kind_ids: HashMap<NameId, DeviceKind>,
    gate_inputs: Vec<NameId>,
    /// D-type port ids
    pub dtype: DTypePorts,
}

impl Devices {
    /// Create an empty device list, interning type and port names.
    pub fn new(names: &mut Names) -> Self {
        let kind_ids = DeviceKind::ALL
            .iter()
            .map(|kind| (names.lookup_one(kind.as_str()), *kind))
            .collect();

        let [clk, set, clear, data, q, qbar] = [
            names.lookup_one("CLK"),
            names.lookup_one("SET"),
            names.lookup_one("CLEAR"),
            names.lookup_one("DATA"),
            names.lookup_one("Q"),
            names.lookup_one("QBAR"),
        ];

        let gate_inputs = (1..=MAX_GATE_INPUTS)
            .map(|n| names.lookup_one(&format!("I{}", n)))
            .collect();

        Self {
            devices: Vec::new(),
            kind_ids,
            gate_inputs,
            dtype: DTypePorts {
                clk,
                set,
                clear,
                data,
                q,
                qbar,
            },
        }
    }

    /// Resolve a type name id to a device kind.
    pub fn kind_of(&self, id: NameId) -> Option<DeviceKind> {
        self.kind_ids.get(&id).copied()
    }

    pub fn is_dtype_input(&self, id: NameId) -> bool {
        self.dtype.inputs().contains(&id)
    }

    pub fn is_dtype_output(&self, id: NameId) -> bool {
        self.dtype.outputs().contains(&id)
    }

    /// Whether `id` names a device type or a D-type port.
    pub fn is_reserved(&self, id: NameId) -> bool {
        self.kind_of(id).is_some() || self.is_dtype_input(id) || self.is_dtype_output(id)
    }

    pub fn get_device(&self, id: NameId) -> Option<&Device> {
        self.devices.iter().find(|d| d.id == id)
    }

    pub fn get_device_mut(&mut self, id: NameId) -> Option<&mut Device> {
        self.devices.iter_mut().find(|d| d.id == id)
    }

    /// Ids of all devices, or of all devices of `kind`, in declaration order.
    pub fn find_devices(&self, kind: Option<DeviceKind>) -> Vec<NameId> {
        self.devices
            .iter()
            .filter(|d| kind.map_or(true, |k| d.kind == k))
            .map(|d| d.id)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Device> {
        self.devices.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Device> {
        self.devices.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Create a device of `kind` with its parameters.
    pub fn make_device(
        &mut self,
        id: NameId,
        kind: DeviceKind,
        param: Option<u64>,
        param2: Option<u64>,
    ) -> Result<(), DeviceError> {
        if self.get_device(id).is_some() {
            return Err(DeviceError::DevicePresent);
        }
        if kind != DeviceKind::SigGen && param2.is_some() {
            return Err(DeviceError::QualifierPresent);
        }

        match kind {
            DeviceKind::And | DeviceKind::Or | DeviceKind::Nand | DeviceKind::Nor => {
                let inputs = param.ok_or(DeviceError::NoQualifier)?;
                if !(1..=MAX_GATE_INPUTS).contains(&inputs) {
                    return Err(DeviceError::InvalidQualifier(inputs));
                }
                self.make_gate(id, kind, inputs as usize);
            }
            DeviceKind::Xor => {
                if param.is_some() {
                    return Err(DeviceError::QualifierPresent);
                }
                self.make_gate(id, kind, 2);
            }
            DeviceKind::Clock => {
                let half_period = param.ok_or(DeviceError::NoQualifier)?;
                if half_period == 0 {
                    return Err(DeviceError::InvalidQualifier(half_period));
                }
                let mut device = Device::new(
                    id,
                    kind,
                    DeviceState::Clock {
                        half_period,
                        counter: 0,
                    },
                );
                device.outputs.insert(None, Signal::Low);
                self.devices.push(device);
            }
            DeviceKind::Switch => {
                let state = param.ok_or(DeviceError::NoQualifier)?;
                if state > 1 {
                    return Err(DeviceError::InvalidQualifier(state));
                }
                self.make_switch(id, Signal::from_bool(state == 1));
            }
            DeviceKind::DType => {
                if param.is_some() {
                    return Err(DeviceError::QualifierPresent);
                }
                let mut device = Device::new(id, kind, DeviceState::DType { memory: Signal::Low });
                for port in self.dtype.inputs() {
                    device.inputs.insert(port, None);
                }
                device.outputs.insert(Some(self.dtype.q), Signal::Low);
                device.outputs.insert(Some(self.dtype.qbar), Signal::High);
                self.devices.push(device);
            }
            DeviceKind::SigGen => {
                let high = param.ok_or(DeviceError::NoQualifier)?;
                let low = param2.ok_or(DeviceError::NoQualifier)?;
                for value in [high, low] {
                    if value == 0 {
                        return Err(DeviceError::InvalidQualifier(value));
                    }
                }
                let mut device = Device::new(
                    id,
                    kind,
                    DeviceState::SigGen {
                        high,
                        low,
                        counter: 0,
                    },
                );
                device.outputs.insert(None, Signal::High);
                self.devices.push(device);
            }
        }
        Ok(())
    }

    /// Create a switch in the given state. Used directly for the ground source.
    pub fn make_switch(&mut self, id: NameId, state: Signal) {
        let mut device = Device::new(id, DeviceKind::Switch, DeviceState::Switch { state });
        device.outputs.insert(None, state);
        self.devices.push(device);
    }

    fn make_gate(&mut self, id: NameId, kind: DeviceKind, inputs: usize) {
        let mut device = Device::new(id, kind, DeviceState::Gate);
        for port in &self.gate_inputs[..inputs] {
            device.inputs.insert(*port, None);
        }
        device.outputs.insert(None, Signal::Low);
        self.devices.push(device);
    }

    /// Set a switch's state. Returns false if `id` is not a switch.
    pub fn set_switch(&mut self, id: NameId, level: Signal) -> bool {
        match self.get_device_mut(id) {
            Some(device) => match &mut device.state {
                DeviceState::Switch { state } => {
                    *state = level.settled();
                    device.outputs.insert(None, *state);
                    true
                }
                _ => false,
            },
            None => false,
        }
    }

    /// Put every device into its start-of-run state.
    pub fn cold_startup(&mut self) {
        let q = self.dtype.q;
        let qbar = self.dtype.qbar;
        for device in &mut self.devices {
            match &mut device.state {
                DeviceState::Gate => {
                    device.outputs.insert(None, Signal::Low);
                }
                DeviceState::Clock { counter, .. } => {
                    *counter = 0;
                    device.outputs.insert(None, Signal::Low);
                }
                DeviceState::Switch { state } => {
                    device.outputs.insert(None, *state);
                }
                DeviceState::DType { memory } => {
                    *memory = Signal::Low;
                    device.outputs.insert(Some(q), Signal::Low);
                    device.outputs.insert(Some(qbar), Signal::High);
                }
                DeviceState::SigGen { counter, .. } => {
                    *counter = 0;
                    device.outputs.insert(None, Signal::High);
                }
            }
        }
    }

    /// Printable name of an output, e.g. `G1` or `FF1.QBAR`.
    pub fn signal_name(&self, names: &Names, id: NameId, port: Option<NameId>) -> Option<String> {
        let device = self.get_device(id)?;
        let device_name = names.get_name_string(device.id)?;
        match port {
            None => Some(device_name.to_string()),
            Some(port) => Some(format!("{}.{}", device_name, names.get_name_string(port)?)),
        }
    }
}
