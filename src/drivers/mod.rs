// src/drivers/mod.rs
pub mod nanovna;
pub mod registry;
pub mod saa2;
pub mod simulated;
pub mod source;
use std::fmt;
use std::io::{Read, Write};
use serialport::SerialPort;
use crate::error::Result;
use crate::types::RawSweep;
pub use nanovna::AsciiTextDriver;
pub use registry::{DeviceRegistry, DeviceSignature, PortDescriptor, ProbedDevice};
pub use saa2::{BinaryFifoDriver, FifoRecord};
pub use simulated::{ErrorModel, SimulatedSource, TwoPort};
pub use source::{ManualSource, SweepRequest, SweepSource};
/// Lifecycle of one driver connection during a sweep.
///
/// `Closing` is entered by the release step on every exit path and always
/// settles back to `Idle`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    Syncing,
    CalibrationDisabled,
    Sweeping,
    Closing,
}
/// Wire protocol family a device speaks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverKind {
    AsciiText,
    BinaryFifo,
}
impl DriverKind {
    pub fn name(self) -> &'static str {
        match self {
            DriverKind::AsciiText => nanovna::NAME,
            DriverKind::BinaryFifo => saa2::NAME,
        }
    }
    pub fn max_points(self) -> usize {
        match self {
            DriverKind::AsciiText => nanovna::MAX_POINTS,
            DriverKind::BinaryFifo => saa2::MAX_POINTS,
        }
    }
    /// Binds a driver of this kind to an open transport.
    pub fn bind<P: Read + Write>(self, port: P) -> DeviceDriver<P> {
        match self {
            DriverKind::AsciiText => DeviceDriver::AsciiText(AsciiTextDriver::new(port)),
            DriverKind::BinaryFifo => DeviceDriver::BinaryFifo(BinaryFifoDriver::new(port)),
        }
    }
}
impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
/// A connected instrument, one variant per supported protocol.
pub enum DeviceDriver<P = Box<dyn SerialPort>> {
    AsciiText(AsciiTextDriver<P>),
    BinaryFifo(BinaryFifoDriver<P>),
}
impl<P: Read + Write> DeviceDriver<P> {
    pub fn kind(&self) -> DriverKind {
        match self {
            DeviceDriver::AsciiText(_) => DriverKind::AsciiText,
            DeviceDriver::BinaryFifo(_) => DriverKind::BinaryFifo,
        }
    }
    pub fn state(&self) -> DriverState {
        match self {
            DeviceDriver::AsciiText(driver) => driver.state(),
            DeviceDriver::BinaryFifo(driver) => driver.state(),
        }
    }
}
impl<P: Read + Write> SweepSource for DeviceDriver<P> {
    fn name(&self) -> &'static str {
        self.kind().name()
    }
    fn max_points(&self) -> usize {
        self.kind().max_points()
    }
    fn sweep(
        &mut self,
        start_hz: u64,
        stop_hz: u64,
        points: usize,
        repetitions: usize,
    ) -> Result<RawSweep> {
        match self {
            DeviceDriver::AsciiText(driver) => driver.sweep(start_hz, stop_hz, points, repetitions),
            DeviceDriver::BinaryFifo(driver) => driver.sweep(start_hz, stop_hz, points, repetitions),
        }
    }
}
