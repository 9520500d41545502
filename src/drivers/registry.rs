use std::fmt;
use log::{debug, info};
use serialport::{SerialPortInfo, SerialPortType};
use crate::config::SerialConfig;
use crate::drivers::{DeviceDriver, DriverKind};
use crate::error::{NanoVnaError, Result};
/// USB identity of a supported instrument.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeviceSignature {
    pub name: &'static str,
    pub vid: u16,
    pub pid: u16,
    pub kind: DriverKind,
}
/// Every instrument the registry knows how to drive.
pub const SIGNATURES: &[DeviceSignature] = &[
    DeviceSignature {
        name: "nanovna",
        vid: 0x0483,
        pid: 0x5740,
        kind: DriverKind::AsciiText,
    },
    DeviceSignature {
        name: "saa2",
        vid: 0x04b4,
        pid: 0x0008,
        kind: DriverKind::BinaryFifo,
    },
];
/// The parts of an enumerated serial port the registry cares about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PortDescriptor {
    pub port_name: String,
    pub vid: u16,
    pub pid: u16,
    pub product: Option<String>,
}
impl PortDescriptor {
    /// `None` for ports that are not USB devices.
    pub fn from_serial(info: &SerialPortInfo) -> Option<Self> {
        match &info.port_type {
            SerialPortType::UsbPort(usb) => Some(Self {
                port_name: info.port_name.clone(),
                vid: usb.vid,
                pid: usb.pid,
                product: usb.product.clone(),
            }),
            _ => None,
        }
    }
}
/// A port whose USB identity matched a known signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProbedDevice {
    pub signature: DeviceSignature,
    pub port: PortDescriptor,
}
impl fmt::Display for ProbedDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.signature.name, self.port.port_name)
    }
}
pub struct DeviceRegistry {
    signatures: &'static [DeviceSignature],
    serial: SerialConfig,
}
impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new(SerialConfig::default())
    }
}
impl DeviceRegistry {
    pub fn new(serial: SerialConfig) -> Self {
        Self {
            signatures: SIGNATURES,
            serial,
        }
    }
    /// Enumerates the host's serial ports and keeps the recognized ones.
    pub fn probe(&self) -> Result<Vec<ProbedDevice>> {
        let ports = serialport::available_ports()?;
        debug!("probing {} serial ports", ports.len());
        Ok(self.match_ports(ports.iter().filter_map(PortDescriptor::from_serial)))
    }
    /// Pairs ports with signatures, grouped by signature table order.
    pub fn match_ports(&self, ports: impl IntoIterator<Item = PortDescriptor>) -> Vec<ProbedDevice> {
        let ports: Vec<PortDescriptor> = ports.into_iter().collect();
        self.signatures
            .iter()
            .flat_map(|signature| {
                ports
                    .iter()
                    .filter(move |port| port.vid == signature.vid && port.pid == signature.pid)
                    .map(move |port| ProbedDevice {
                        signature: *signature,
                        port: port.clone(),
                    })
            })
            .collect()
    }
    /// Picks exactly one candidate. `explicit` may name a port or a driver.
    pub fn select<'a>(
        candidates: &'a [ProbedDevice],
        explicit: Option<&str>,
    ) -> Result<&'a ProbedDevice> {
        if candidates.is_empty() {
            return Err(NanoVnaError::DeviceNotFound);
        }
        let chosen: Vec<&ProbedDevice> = match explicit {
            None => candidates.iter().collect(),
            Some(wanted) => {
                let by_port: Vec<&ProbedDevice> = candidates
                    .iter()
                    .filter(|c| c.port.port_name == wanted)
                    .collect();
                if by_port.is_empty() {
                    candidates
                        .iter()
                        .filter(|c| c.signature.name == wanted)
                        .collect()
                } else {
                    by_port
                }
            }
        };
        match chosen.as_slice() {
            [] => Err(NanoVnaError::DeviceNotFound),
            [only] => Ok(*only),
            many => Err(NanoVnaError::DeviceAmbiguous {
                candidates: many.iter().map(|c| c.to_string()).collect(),
            }),
        }
    }
    /// Probes, selects and opens the instrument.
    pub fn get_driver(&self, explicit: Option<&str>) -> Result<DeviceDriver> {
        let candidates = self.probe()?;
        let device = Self::select(&candidates, explicit)?;
        self.open(device)
    }
    pub fn open(&self, device: &ProbedDevice) -> Result<DeviceDriver> {
        info!("opening {device}");
        let port = serialport::new(&device.port.port_name, self.serial.baud_rate)
            .timeout(self.serial.timeout)
            .open()?;
        Ok(device.signature.kind.bind(port))
    }
}
