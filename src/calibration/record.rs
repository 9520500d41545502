use std::fmt;
use std::str::FromStr;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use crate::config::{
    CalibrationParams, SweepOverrides, DEFAULT_POINTS, DEFAULT_SAMPLES, DEFAULT_START_HZ,
    DEFAULT_STOP_HZ,
};
use crate::error::{NanoVnaError, Result};
use crate::sweep::{interp, FrequencyAxis};
use crate::types::SParams;
/// SOLT reference standards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Standard {
    Open,
    Short,
    Load,
    Thru,
}
impl Standard {
    pub const ALL: [Standard; 4] = [Standard::Open, Standard::Short, Standard::Load, Standard::Thru];
    pub fn name(self) -> &'static str {
        match self {
            Standard::Open => "open",
            Standard::Short => "short",
            Standard::Load => "load",
            Standard::Thru => "thru",
        }
    }
}
impl fmt::Display for Standard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
impl FromStr for Standard {
    type Err = NanoVnaError;
    fn from_str(s: &str) -> Result<Self> {
        Standard::ALL
            .into_iter()
            .find(|standard| standard.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| NanoVnaError::InvalidCalibration(format!("unknown standard `{s}`")))
    }
}
/// Raw reflection (and thru transmission) measured for each standard.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Standards {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open: Option<Vec<Complex64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short: Option<Vec<Complex64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load: Option<Vec<Complex64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thru: Option<Vec<Complex64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thru21: Option<Vec<Complex64>>,
}
impl Standards {
    pub fn get(&self, standard: Standard) -> Option<&[Complex64]> {
        match standard {
            Standard::Open => self.open.as_deref(),
            Standard::Short => self.short.as_deref(),
            Standard::Load => self.load.as_deref(),
            Standard::Thru => self.thru.as_deref(),
        }
    }
    pub fn is_empty(&self) -> bool {
        self.arrays().next().is_none()
    }
    fn arrays(&self) -> impl Iterator<Item = &Vec<Complex64>> {
        [&self.open, &self.short, &self.load, &self.thru, &self.thru21]
            .into_iter()
            .flatten()
    }
    fn arrays_mut(&mut self) -> impl Iterator<Item = &mut Vec<Complex64>> {
        [
            &mut self.open,
            &mut self.short,
            &mut self.load,
            &mut self.thru,
            &mut self.thru21,
        ]
        .into_iter()
        .flatten()
    }
}
fn default_samples() -> usize {
    DEFAULT_SAMPLES
}
/// Sweep axis of a calibration plus the standards measured on it.
///
/// Every stored array has exactly `points` entries aligned with [`axis`].
///
/// [`axis`]: CalibrationRecord::axis
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRecord {
    start: f64,
    stop: f64,
    points: usize,
    segment: usize,
    #[serde(default = "default_samples")]
    samples: usize,
    #[serde(default)]
    average: bool,
    #[serde(default)]
    log: bool,
    #[serde(flatten)]
    standards: Standards,
}
impl CalibrationRecord {
    pub fn new(params: &CalibrationParams) -> Result<Self> {
        let record = Self {
            start: params.start.unwrap_or(DEFAULT_START_HZ),
            stop: params.stop.unwrap_or(DEFAULT_STOP_HZ),
            points: params.points.unwrap_or(DEFAULT_POINTS),
            segment: params.segment.unwrap_or(DEFAULT_POINTS),
            samples: params.samples.unwrap_or(DEFAULT_SAMPLES),
            average: params.average,
            log: params.log,
            standards: Standards::default(),
        };
        record.validate_axis()?;
        Ok(record)
    }
    pub fn start(&self) -> f64 {
        self.start
    }
    pub fn stop(&self) -> f64 {
        self.stop
    }
    pub fn points(&self) -> usize {
        self.points
    }
    pub fn segment(&self) -> usize {
        self.segment
    }
    pub fn samples(&self) -> usize {
        self.samples
    }
    /// Mean instead of median aggregation.
    pub fn average(&self) -> bool {
        self.average
    }
    pub fn log(&self) -> bool {
        self.log
    }
    pub fn standards(&self) -> &Standards {
        &self.standards
    }
    pub fn axis(&self) -> FrequencyAxis {
        if self.log {
            FrequencyAxis::segmented_log(self.start, self.stop, self.points, self.segment)
        } else {
            FrequencyAxis::linear(self.start, self.stop, self.points)
        }
    }
    /// Stores a measurement of `standard`; a thru also keeps its transmission.
    pub fn record_standard(&mut self, standard: Standard, measured: &SParams) -> Result<()> {
        if measured.nrows() != self.points || measured.ncols() != 2 {
            return Err(NanoVnaError::AxisMismatch(format!(
                "{standard} measurement has shape {:?}, calibration expects [{}, 2]",
                measured.shape(),
                self.points
            )));
        }
        let s11 = Some(measured.column(0).to_vec());
        match standard {
            Standard::Open => self.standards.open = s11,
            Standard::Short => self.standards.short = s11,
            Standard::Load => self.standards.load = s11,
            Standard::Thru => {
                self.standards.thru = s11;
                self.standards.thru21 = Some(measured.column(1).to_vec());
            }
        }
        Ok(())
    }
    /// Standards present in this record.
    pub fn measured_standards(&self) -> Vec<Standard> {
        Standard::ALL
            .into_iter()
            .filter(|s| self.standards.get(*s).is_some())
            .collect()
    }
    /// Copy of this record resampled onto an overridden axis.
    ///
    /// Stored arrays are interpolated linearly in frequency and clamped at the
    /// ends. Unset overrides, or overrides equal to the stored axis, leave the
    /// record untouched.
    pub fn interpolate(&self, overrides: &SweepOverrides) -> Result<CalibrationRecord> {
        let start = overrides.start.unwrap_or(self.start);
        let stop = overrides.stop.unwrap_or(self.stop);
        let points = overrides.points.unwrap_or(self.points);
        if start == self.start && stop == self.stop && points == self.points {
            return Ok(self.clone());
        }
        let mut resampled = CalibrationRecord {
            start,
            stop,
            points,
            ..self.clone()
        };
        resampled.validate_axis()?;
        let old_axis = self.axis();
        let new_axis = resampled.axis();
        for array in resampled.standards.arrays_mut() {
            let source = std::mem::take(array);
            *array = new_axis
                .values()
                .iter()
                .map(|&f| interp(f, old_axis.values(), &source))
                .collect();
        }
        Ok(resampled)
    }
    pub(crate) fn validate_axis(&self) -> Result<()> {
        let reason = if !(self.start.is_finite() && self.stop.is_finite()) {
            "start and stop must be finite".to_string()
        } else if self.stop < self.start {
            format!("stop {} Hz below start {} Hz", self.stop, self.start)
        } else if self.points == 0 {
            "points must be positive".to_string()
        } else if self.segment == 0 {
            "segment must be positive".to_string()
        } else if self.samples == 0 {
            "samples must be positive".to_string()
        } else if self.log && self.start <= 0.0 {
            "log spacing needs a positive start frequency".to_string()
        } else {
            return Ok(());
        };
        Err(NanoVnaError::InvalidCalibration(reason))
    }
    /// Checks that every stored array matches the axis length.
    pub(crate) fn validate_standards(&self) -> Result<()> {
        match self.standards.arrays().find(|a| a.len() != self.points) {
            Some(bad) => Err(NanoVnaError::AxisMismatch(format!(
                "stored standard has {} points, calibration axis has {}",
                bad.len(),
                self.points
            ))),
            None => Ok(()),
        }
    }
}
