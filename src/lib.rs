//! Acquisition core for small vector network analyzers.
//!
//! Drives NanoVNA-class (ASCII shell) and SAA2-class (binary FIFO)
//! instruments over USB serial, applies one-path SOLT error correction and
//! reads and writes Touchstone files.
pub mod calibration;
pub mod config;
pub mod drivers;
pub mod error;
pub mod session;
pub mod sweep;
pub mod touchstone;
pub mod types;
pub use calibration::{CalibrationRecord, CalibrationStore, Standard};
pub use drivers::{DeviceDriver, DeviceRegistry, SweepSource};
pub use error::{NanoVnaError, Result};
pub use session::Analyzer;
pub use types::{DataTag, MeasurementResult, RawSweep, SParams};
