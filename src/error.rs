use thiserror::Error;
#[derive(Debug, Error)]
pub enum NanoVnaError {
    #[error("no supported VNA found on any serial port")]
    DeviceNotFound,
    #[error("more than one VNA found, select one of: {}", candidates.join(", "))]
    DeviceAmbiguous { candidates: Vec<String> },
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
    #[error("no calibration named `{0}`, initialize one first")]
    CalibrationMissing(String),
    #[error("frequency axis mismatch: {0}")]
    AxisMismatch(String),
    #[error("unsupported touchstone header: {0}")]
    InvalidTouchstoneHeader(String),
    #[error("malformed touchstone data on line {line}: {reason}")]
    InvalidTouchstoneData { line: usize, reason: String },
    #[error("sweep rejected by {driver}: {reason}")]
    InvalidSweep { driver: &'static str, reason: String },
    #[error("invalid calibration parameters: {0}")]
    InvalidCalibration(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Serial(#[from] serialport::Error),
    #[error("calibration file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
impl NanoVnaError {
    pub(crate) fn protocol(reason: impl Into<String>) -> Self {
        NanoVnaError::ProtocolViolation(reason.into())
    }
}
pub type Result<T, E = NanoVnaError> = std::result::Result<T, E>;
