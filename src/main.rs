// src/main.rs
use anyhow::{Context, Result};
use nanovna::config::{SweepOverrides, DEFAULT_CALIBRATION};
use nanovna::touchstone::{self, DataFormat, FrequencyUnit};
use nanovna::{Analyzer, CalibrationStore, DeviceRegistry};
fn main() -> Result<()> {
    env_logger::init();
    let name = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CALIBRATION.to_string());
    let mut analyzer = Analyzer::connect(
        CalibrationStore::default(),
        &name,
        SweepOverrides::default(),
        &DeviceRegistry::default(),
        None,
    )
    .with_context(|| format!("failed to open calibration `{name}`"))?;
    let result = analyzer.measure().context("measurement failed")?;
    let text = touchstone::write(
        &result.axis,
        &result.data,
        DataFormat::MA,
        false,
        FrequencyUnit::MHz,
    )?;
    print!("{text}");
    Ok(())
}
