//! One-path 12-term error correction.
//!
//! Follows Rytting, "Network analyzer error models and calibration methods",
//! with the forward isolation term e30 taken as zero. Every frequency bin is
//! solved independently.
//!
//! Missing standards fall back to their ideal values: open = 1, short = -1,
//! load = 0, thru reflection = 0. The thru transmission defaults to 1 rather
//! than 0, which would turn every corrected S21 into NaN; without a measured
//! thru the S21 correction only removes the reflection-path error.
use ndarray::Array2;
use num_complex::Complex64;
use crate::calibration::CalibrationRecord;
use crate::error::{NanoVnaError, Result};
use crate::types::SParams;
/// Error terms for one frequency bin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ErrorTerms {
    /// Directivity.
    pub e00: Complex64,
    /// Source match.
    pub e11: Complex64,
    /// `e00 * e11 - e10e01`
    pub delta_e: Complex64,
    /// Reflection tracking.
    pub e10e01: Complex64,
    /// Load match.
    pub e22: Complex64,
    /// Transmission tracking.
    pub e10e32: Complex64,
}
impl ErrorTerms {
    /// Solves the error terms from the raw readings of each standard.
    pub fn solve(
        open: Complex64,
        short: Complex64,
        load: Complex64,
        thru: Complex64,
        thru21: Complex64,
    ) -> Self {
        let e00 = load;
        let e11 = (open + short - load * 2.0) / (open - short);
        let delta_e = (open * short * 2.0 - load * short - load * open) / (open - short);
        let e10e01 = e00 * e11 - delta_e;
        let e22 = (thru - load) / (thru * e11 - delta_e);
        let e10e32 = thru21 * (Complex64::new(1.0, 0.0) - e11 * e22);
        Self {
            e00,
            e11,
            delta_e,
            e10e01,
            e22,
            e10e32,
        }
    }
    /// Corrected (S11, S21) from raw (S11m, S21m).
    pub fn correct(&self, s11m: Complex64, s21m: Complex64) -> (Complex64, Complex64) {
        let s11 = (s11m - self.e00) / (s11m * self.e11 - self.delta_e);
        let s21 = s21m / self.e10e32 * self.e10e01 / (self.e11 * s11m - self.delta_e);
        (s11, s21)
    }
}
/// Error terms for every bin of a calibration axis.
#[derive(Clone, Debug, PartialEq)]
pub struct ErrorCoefficients {
    terms: Vec<ErrorTerms>,
}
impl ErrorCoefficients {
    pub fn terms(&self) -> &[ErrorTerms] {
        &self.terms
    }
    pub fn len(&self) -> usize {
        self.terms.len()
    }
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}
/// Derives per-bin error terms from the standards stored in `record`.
///
/// Fails with `AxisMismatch` when a stored array does not cover the record's
/// axis point for point.
pub fn calibrate(record: &CalibrationRecord) -> Result<ErrorCoefficients> {
    record.validate_standards()?;
    let standards = record.standards();
    let pick = |array: &Option<Vec<Complex64>>, i: usize, ideal: f64| match array {
        Some(values) => values[i],
        None => Complex64::new(ideal, 0.0),
    };
    let terms = (0..record.points())
        .map(|i| {
            ErrorTerms::solve(
                pick(&standards.open, i, 1.0),
                pick(&standards.short, i, -1.0),
                pick(&standards.load, i, 0.0),
                pick(&standards.thru, i, 0.0),
                pick(&standards.thru21, i, 1.0),
            )
        })
        .collect();
    Ok(ErrorCoefficients { terms })
}
/// Applies `coefficients` to raw `[S11m, S21m]` rows.
pub fn correct(coefficients: &ErrorCoefficients, raw: &SParams) -> Result<SParams> {
    if raw.nrows() != coefficients.len() || raw.ncols() != 2 {
        return Err(NanoVnaError::AxisMismatch(format!(
            "measurement has shape {:?}, calibration covers {} points",
            raw.shape(),
            coefficients.len()
        )));
    }
    let mut out = Array2::zeros((raw.nrows(), 2));
    for (i, terms) in coefficients.terms.iter().enumerate() {
        let (s11, s21) = terms.correct(raw[[i, 0]], raw[[i, 1]]);
        out[[i, 0]] = s11;
        out[[i, 1]] = s21;
    }
    Ok(out)
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::Standard;
    use crate::config::CalibrationParams;
    use crate::drivers::{ErrorModel, TwoPort};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    fn close(a: Complex64, b: Complex64) -> bool {
        (a - b).norm() < 1e-9
    }
    fn random_c(rng: &mut StdRng, scale: f64) -> Complex64 {
        Complex64::new(rng.gen_range(-scale..scale), rng.gen_range(-scale..scale))
    }
    fn random_model(rng: &mut StdRng) -> ErrorModel {
        ErrorModel {
            e00: random_c(rng, 0.1),
            e11: random_c(rng, 0.1),
            e10e01: Complex64::new(0.8, 0.0) + random_c(rng, 0.1),
            e22: random_c(rng, 0.1),
            e10e32: Complex64::new(0.7, 0.0) + random_c(rng, 0.1),
        }
    }
    /// Record whose standards were observed through `models[i]` at bin `i`.
    fn record_through(models: &[ErrorModel]) -> CalibrationRecord {
        let params = CalibrationParams {
            start: Some(1e6),
            stop: Some(2e6),
            points: Some(models.len()),
            ..CalibrationParams::default()
        };
        let mut record = CalibrationRecord::new(&params).unwrap();
        for (standard, dut) in [
            (Standard::Open, TwoPort::open()),
            (Standard::Short, TwoPort::short()),
            (Standard::Load, TwoPort::load()),
            (Standard::Thru, TwoPort::thru()),
        ] {
            let measured = Array2::from_shape_fn((models.len(), 2), |(i, j)| {
                models[i].observe(&dut)[j]
            });
            record.record_standard(standard, &measured).unwrap();
        }
        record
    }
    #[test]
    fn standards_correct_to_their_ideal_values() {
        let mut rng = StdRng::seed_from_u64(42);
        let models: Vec<ErrorModel> = (0..16).map(|_| random_model(&mut rng)).collect();
        let record = record_through(&models);
        let coefficients = calibrate(&record).unwrap();
        let standards = record.standards();
        for (i, terms) in coefficients.terms().iter().enumerate() {
            let zero = Complex64::new(0.0, 0.0);
            let (load, _) = terms.correct(standards.load.as_ref().unwrap()[i], zero);
            let (open, _) = terms.correct(standards.open.as_ref().unwrap()[i], zero);
            let (short, _) = terms.correct(standards.short.as_ref().unwrap()[i], zero);
            assert!(close(load, zero), "bin {i}: load corrected to {load}");
            assert!(close(open, Complex64::new(1.0, 0.0)), "bin {i}: open {open}");
            assert!(close(short, Complex64::new(-1.0, 0.0)), "bin {i}: short {short}");
        }
    }
    #[test]
    fn solved_terms_match_the_model() {
        let mut rng = StdRng::seed_from_u64(7);
        let models: Vec<ErrorModel> = (0..8).map(|_| random_model(&mut rng)).collect();
        let coefficients = calibrate(&record_through(&models)).unwrap();
        for (model, terms) in models.iter().zip(coefficients.terms()) {
            assert!(close(terms.e00, model.e00));
            assert!(close(terms.e11, model.e11));
            assert!(close(terms.e10e01, model.e10e01));
            assert!(close(terms.e22, model.e22));
            assert!(close(terms.e10e32, model.e10e32));
        }
    }
    #[test]
    fn matched_dut_is_recovered_exactly() {
        let mut rng = StdRng::seed_from_u64(3);
        let models: Vec<ErrorModel> = (0..8).map(|_| random_model(&mut rng)).collect();
        let coefficients = calibrate(&record_through(&models)).unwrap();
        let dut = TwoPort {
            s11: Complex64::new(0.2, -0.1),
            ..TwoPort::matched(Complex64::new(0.5, 0.25))
        };
        let raw = Array2::from_shape_fn((models.len(), 2), |(i, j)| models[i].observe(&dut)[j]);
        let corrected = correct(&coefficients, &raw).unwrap();
        for row in corrected.rows() {
            assert!(close(row[0], dut.s11));
            assert!(close(row[1], dut.s21));
        }
    }
    #[test]
    fn empty_record_is_the_identity() {
        let record = CalibrationRecord::new(&CalibrationParams {
            points: Some(4),
            ..CalibrationParams::default()
        })
        .unwrap();
        let coefficients = calibrate(&record).unwrap();
        let raw = Array2::from_elem((4, 2), Complex64::new(0.3, 0.4));
        let corrected = correct(&coefficients, &raw).unwrap();
        for value in corrected.iter() {
            assert!(close(*value, Complex64::new(0.3, 0.4)));
        }
        let terms = coefficients.terms()[0];
        assert!(terms.e10e32.re.is_finite() && terms.e10e32.im.is_finite());
    }
    #[test]
    fn length_mismatch_is_rejected() {
        let record = CalibrationRecord::new(&CalibrationParams::default()).unwrap();
        let raw = Array2::zeros((5, 2));
        let err = correct(&calibrate(&record).unwrap(), &raw).unwrap_err();
        assert!(matches!(err, NanoVnaError::AxisMismatch(_)));
    }
    #[test]
    fn standards_off_the_axis_are_rejected_not_truncated() {
        // Four load readings stored against a record that claims two or six points.
        let load = serde_json::json!([[0.0, 0.0], [0.1, 0.0], [0.2, 0.0], [0.3, 0.0]]);
        for points in [2, 6] {
            let record: CalibrationRecord = serde_json::from_value(serde_json::json!({
                "start": 1e6,
                "stop": 2e6,
                "points": points,
                "segment": 101,
                "load": load.clone(),
            }))
            .unwrap();
            let err = calibrate(&record).unwrap_err();
            assert!(matches!(err, NanoVnaError::AxisMismatch(_)), "{points} points");
        }
    }
}
