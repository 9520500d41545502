// src/types.rs
use ndarray::{Array2, Array3, ArrayView1};
use num_complex::Complex64;
use crate::sweep::FrequencyAxis;
/// Raw device output: repetitions x points x [reflection, transmission].
pub type RawSweep = Array3<Complex64>;
/// Per-frequency S-parameters: points x [S11, S21].
pub type SParams = Array2<Complex64>;
/// Whether a measurement went through error correction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataTag {
    Raw,
    Corrected,
}
/// Frequency axis plus the forward-path S-parameters measured on it.
#[derive(Clone, Debug)]
pub struct MeasurementResult {
    pub axis: FrequencyAxis,
    pub data: SParams,
    pub tag: DataTag,
}
impl MeasurementResult {
    pub fn len(&self) -> usize {
        self.axis.len()
    }
    pub fn is_empty(&self) -> bool {
        self.axis.is_empty()
    }
    pub fn s11(&self) -> ArrayView1<'_, Complex64> {
        self.data.column(0)
    }
    pub fn s21(&self) -> ArrayView1<'_, Complex64> {
        self.data.column(1)
    }
    pub fn is_corrected(&self) -> bool {
        self.tag == DataTag::Corrected
    }
}
