use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use log::{debug, info};
use crate::calibration::{CalibrationRecord, Standard};
use crate::config::CalibrationParams;
use crate::error::{NanoVnaError, Result};
use crate::types::SParams;
const EXTENSION: &str = "json";
/// Directory of named calibration records, one JSON file each.
#[derive(Clone, Debug)]
pub struct CalibrationStore {
    root: PathBuf,
}
impl Default for CalibrationStore {
    fn default() -> Self {
        Self::new(".")
    }
}
impl CalibrationStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
    pub fn root(&self) -> &Path {
        &self.root
    }
    /// File backing `name`; `.json` is appended when the name has no extension.
    pub fn path_for(&self, name: &str) -> PathBuf {
        let path = self.root.join(name);
        if path.extension().is_some() {
            path
        } else {
            path.with_extension(EXTENSION)
        }
    }
    pub fn exists(&self, name: &str) -> bool {
        self.path_for(name).is_file()
    }
    /// Starts a fresh calibration, replacing any record stored under `name`.
    pub fn init(&self, name: &str, params: &CalibrationParams) -> Result<CalibrationRecord> {
        let record = CalibrationRecord::new(params)?;
        self.save(&record, name)?;
        info!(
            "initialized calibration `{name}`: {}..{} Hz, {} points",
            record.start(),
            record.stop(),
            record.points()
        );
        Ok(record)
    }
    pub fn load(&self, name: &str) -> Result<CalibrationRecord> {
        let path = self.path_for(name);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(NanoVnaError::CalibrationMissing(name.to_string()));
            }
            Err(err) => return Err(err.into()),
        };
        let record: CalibrationRecord = serde_json::from_reader(BufReader::new(file))?;
        record.validate_axis()?;
        record.validate_standards()?;
        debug!("loaded calibration from {}", path.display());
        Ok(record)
    }
    pub fn save(&self, record: &CalibrationRecord, name: &str) -> Result<()> {
        record.validate_axis()?;
        record.validate_standards()?;
        let path = self.path_for(name);
        let mut writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(&mut writer, record)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        debug!("saved calibration to {}", path.display());
        Ok(())
    }
    /// Records `standard` into the stored calibration and persists it.
    pub fn record_standard(
        &self,
        name: &str,
        standard: Standard,
        measured: &SParams,
    ) -> Result<CalibrationRecord> {
        let mut record = self.load(name)?;
        record.record_standard(standard, measured)?;
        self.save(&record, name)?;
        info!("stored {standard} standard in `{name}`");
        Ok(record)
    }
}
