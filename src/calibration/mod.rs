// src/calibration/mod.rs
pub mod correction;
pub mod record;
pub mod store;
pub use correction::{calibrate, correct, ErrorCoefficients, ErrorTerms};
pub use record::{CalibrationRecord, Standard, Standards};
pub use store::CalibrationStore;
