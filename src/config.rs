use std::time::Duration;
use serde::{Deserialize, Serialize};
/// Calibration used when the caller does not name one.
pub const DEFAULT_CALIBRATION: &str = "cal";
/// Repetitions per frequency point.
pub const DEFAULT_SAMPLES: usize = 3;
pub const DEFAULT_START_HZ: f64 = 10e3;
pub const DEFAULT_STOP_HZ: f64 = 10.01e6;
pub const DEFAULT_POINTS: usize = 101;
/// Settings used when opening a device's serial port.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SerialConfig {
    pub baud_rate: u32,
    #[serde(with = "millis")]
    pub timeout: Duration,
}
impl Default for SerialConfig {
    fn default() -> Self {
        // Both devices are USB CDC, the baud rate is nominal.
        Self {
            baud_rate: 115_200,
            timeout: Duration::from_secs(5),
        }
    }
}
/// How repeated samples of one frequency point are reduced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Aggregation {
    #[default]
    Median,
    Mean,
}
impl Aggregation {
    pub fn from_average_flag(average: bool) -> Self {
        if average {
            Aggregation::Mean
        } else {
            Aggregation::Median
        }
    }
}
/// Axis and acquisition settings for a new calibration. Unset fields fall back
/// to the crate defaults when the record is created.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationParams {
    pub start: Option<f64>,
    pub stop: Option<f64>,
    pub points: Option<usize>,
    pub segment: Option<usize>,
    pub samples: Option<usize>,
    pub average: bool,
    pub log: bool,
}
/// Per-measurement axis overrides. The stored calibration is interpolated
/// onto the overridden axis for the duration of one measurement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepOverrides {
    pub start: Option<f64>,
    pub stop: Option<f64>,
    pub points: Option<usize>,
}
impl SweepOverrides {
    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.stop.is_none() && self.points.is_none()
    }
}
mod millis {
    use std::time::Duration;
    use serde::{Deserialize, Deserializer, Serializer};
    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
