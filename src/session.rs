// src/session.rs
use log::info;
use crate::calibration::{
    calibrate, correct, CalibrationRecord, CalibrationStore, ErrorCoefficients, Standard,
};
use crate::config::SweepOverrides;
use crate::drivers::{DeviceDriver, DeviceRegistry, SweepSource};
use crate::error::Result;
use crate::sweep::{FrequencyAxis, SweepSegmenter};
use crate::types::{DataTag, MeasurementResult};
/// A sweep source bound to one named calibration.
///
/// Measurements run on the stored axis, or on the overridden axis with the
/// standards interpolated onto it. Standards are always acquired on the
/// stored axis.
pub struct Analyzer<S = DeviceDriver> {
    store: CalibrationStore,
    name: String,
    overrides: SweepOverrides,
    record: CalibrationRecord,
    active: CalibrationRecord,
    coefficients: ErrorCoefficients,
    source: S,
}
impl Analyzer<DeviceDriver> {
    /// Probes for an instrument and opens calibration `name` against it.
    pub fn connect(
        store: CalibrationStore,
        name: &str,
        overrides: SweepOverrides,
        registry: &DeviceRegistry,
        device: Option<&str>,
    ) -> Result<Self> {
        // Load first so a missing calibration never touches the port.
        let record = store.load(name)?;
        let driver = registry.get_driver(device)?;
        Self::with_record(store, name, overrides, record, driver)
    }
}
impl<S: SweepSource> Analyzer<S> {
    pub fn open(
        store: CalibrationStore,
        name: &str,
        overrides: SweepOverrides,
        source: S,
    ) -> Result<Self> {
        let record = store.load(name)?;
        Self::with_record(store, name, overrides, record, source)
    }
    fn with_record(
        store: CalibrationStore,
        name: &str,
        overrides: SweepOverrides,
        record: CalibrationRecord,
        source: S,
    ) -> Result<Self> {
        let active = record.interpolate(&overrides)?;
        let coefficients = calibrate(&active)?;
        info!(
            "calibration `{name}` on {}: {} points, standards {:?}",
            source.name(),
            active.points(),
            record.measured_standards()
        );
        Ok(Self {
            store,
            name: name.to_string(),
            overrides,
            record,
            active,
            coefficients,
            source,
        })
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    /// The calibration as stored.
    pub fn record(&self) -> &CalibrationRecord {
        &self.record
    }
    /// Axis measurements run on.
    pub fn axis(&self) -> FrequencyAxis {
        self.active.axis()
    }
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }
    pub fn into_source(self) -> S {
        self.source
    }
    pub fn measure_raw(&mut self) -> Result<MeasurementResult> {
        let axis = self.active.axis();
        let data = SweepSegmenter::for_record(&self.active).measure(&mut self.source, &axis)?;
        Ok(MeasurementResult {
            axis,
            data,
            tag: DataTag::Raw,
        })
    }
    /// Raw sweep run through the calibration's error terms.
    pub fn measure(&mut self) -> Result<MeasurementResult> {
        let raw = self.measure_raw()?;
        let data = correct(&self.coefficients, &raw.data)?;
        Ok(MeasurementResult {
            axis: raw.axis,
            data,
            tag: DataTag::Corrected,
        })
    }
    /// Sweeps whatever is connected as `standard` and stores it.
    pub fn acquire_standard(&mut self, standard: Standard) -> Result<()> {
        let axis = self.record.axis();
        let measured = SweepSegmenter::for_record(&self.record).measure(&mut self.source, &axis)?;
        self.record.record_standard(standard, &measured)?;
        self.store.save(&self.record, &self.name)?;
        info!("stored {standard} standard in `{}`", self.name);
        self.active = self.record.interpolate(&self.overrides)?;
        self.coefficients = calibrate(&self.active)?;
        Ok(())
    }
}
