use ndarray::Axis;
use num_complex::Complex64;
use crate::config::Aggregation;
use crate::types::{RawSweep, SParams};
/// Collapses the repetition axis of a raw sweep into one sample per point.
pub fn aggregate(raw: &RawSweep, mode: Aggregation) -> SParams {
    raw.map_axis(Axis(0), |lane| {
        let values: Vec<Complex64> = lane.iter().copied().collect();
        match mode {
            Aggregation::Median => median(&values),
            Aggregation::Mean => mean(&values),
        }
    })
}
/// Component-wise median; even counts average the two middle values.
pub fn median(values: &[Complex64]) -> Complex64 {
    let re: Vec<f64> = values.iter().map(|v| v.re).collect();
    let im: Vec<f64> = values.iter().map(|v| v.im).collect();
    Complex64::new(median_real(re), median_real(im))
}
pub fn mean(values: &[Complex64]) -> Complex64 {
    if values.is_empty() {
        return Complex64::new(f64::NAN, f64::NAN);
    }
    values.iter().sum::<Complex64>() / values.len() as f64
}
fn median_real(mut values: Vec<f64>) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        values[mid]
    } else {
        (values[mid - 1] + values[mid]) / 2.0
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;
    fn reals(values: &[f64]) -> Vec<Complex64> {
        values.iter().map(|&v| Complex64::new(v, 0.0)).collect()
    }
    #[test]
    fn median_and_mean_agree_on_well_behaved_samples() {
        let samples = reals(&[1.0, 3.0, 2.0]);
        assert_eq!(median(&samples), Complex64::new(2.0, 0.0));
        assert_eq!(mean(&samples), Complex64::new(2.0, 0.0));
    }
    #[test]
    fn median_ignores_a_single_outlier() {
        let samples = reals(&[1.0, 1.0, 100.0]);
        assert_eq!(median(&samples), Complex64::new(1.0, 0.0));
        assert!((mean(&samples).re - 34.0).abs() < 1e-12);
    }
    #[test]
    fn median_works_per_component() {
        let samples = vec![
            Complex64::new(1.0, 9.0),
            Complex64::new(5.0, -1.0),
            Complex64::new(3.0, 4.0),
            Complex64::new(7.0, 0.0),
        ];
        assert_eq!(median(&samples), Complex64::new(4.0, 2.0));
    }
    #[test]
    fn aggregate_reduces_repetitions_only() {
        let mut raw = Array3::<Complex64>::zeros((3, 2, 2));
        for (rep, value) in [1.0, 100.0, 1.0].into_iter().enumerate() {
            raw[[rep, 0, 0]] = Complex64::new(value, 0.0);
            raw[[rep, 1, 1]] = Complex64::new(0.0, rep as f64);
        }
        let med = aggregate(&raw, Aggregation::Median);
        assert_eq!(med.shape(), &[2, 2]);
        assert_eq!(med[[0, 0]], Complex64::new(1.0, 0.0));
        assert_eq!(med[[1, 1]], Complex64::new(0.0, 1.0));
        let avg = aggregate(&raw, Aggregation::Mean);
        assert_eq!(avg[[0, 0]], Complex64::new(34.0, 0.0));
    }
}
