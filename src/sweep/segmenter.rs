use log::{debug, info};
use ndarray::{s, Array2};
use crate::calibration::CalibrationRecord;
use crate::config::Aggregation;
use crate::drivers::SweepSource;
use crate::error::{NanoVnaError, Result};
use crate::sweep::{aggregate, linear_residual, FrequencyAxis};
use crate::types::SParams;
/// Largest tolerated L2 deviation, in Hz, of a chunk from a linear ramp.
pub const MAX_LINEAR_RESIDUAL_HZ: f64 = 1.0;
/// Splits an axis into device-sized linear sweeps and reassembles the results.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SweepSegmenter {
    pub segment: usize,
    pub repetitions: usize,
    pub aggregation: Aggregation,
}
impl SweepSegmenter {
    pub fn new(segment: usize, repetitions: usize, aggregation: Aggregation) -> Self {
        Self {
            segment,
            repetitions,
            aggregation,
        }
    }
    /// Uses the segment size and sampling settings stored with a calibration.
    pub fn for_record(record: &CalibrationRecord) -> Self {
        Self::new(
            record.segment(),
            record.samples(),
            Aggregation::from_average_flag(record.average()),
        )
    }
    pub fn with_repetitions(mut self, repetitions: usize) -> Self {
        self.repetitions = repetitions;
        self
    }
    /// Contiguous chunks of at most `min(segment, max_points)` frequencies,
    /// each verified to be linearly spaced.
    pub fn chunks<'a>(&self, axis: &'a FrequencyAxis, max_points: usize) -> Result<Vec<&'a [f64]>> {
        let size = self.segment.min(max_points);
        if size == 0 {
            return Err(NanoVnaError::AxisMismatch(
                "segment size must be positive".into(),
            ));
        }
        axis.values()
            .chunks(size)
            .map(|chunk| {
                let residual = linear_residual(chunk);
                if residual < MAX_LINEAR_RESIDUAL_HZ {
                    Ok(chunk)
                } else {
                    Err(NanoVnaError::AxisMismatch(format!(
                        "segment starting at {} Hz deviates {residual:.3} Hz from linear spacing",
                        chunk[0]
                    )))
                }
            })
            .collect()
    }
    /// Sweeps every chunk of `axis` and returns one aggregated sample per frequency.
    pub fn measure<S: SweepSource + ?Sized>(
        &self,
        source: &mut S,
        axis: &FrequencyAxis,
    ) -> Result<SParams> {
        if self.repetitions == 0 {
            return Err(NanoVnaError::InvalidSweep {
                driver: source.name(),
                reason: "at least one repetition is required".into(),
            });
        }
        let chunks = self.chunks(axis, source.max_points())?;
        info!(
            "measuring {} points in {} segment(s) on {}",
            axis.len(),
            chunks.len(),
            source.name()
        );
        let mut out = Array2::zeros((axis.len(), 2));
        let mut offset = 0;
        for chunk in chunks {
            let start = chunk[0].round() as u64;
            let stop = chunk[chunk.len() - 1].round() as u64;
            debug!("segment {start}..{stop} Hz, {} points", chunk.len());
            let raw = source.sweep(start, stop, chunk.len(), self.repetitions)?;
            let expected = [self.repetitions, chunk.len(), 2];
            if raw.shape() != expected {
                return Err(NanoVnaError::protocol(format!(
                    "{} returned shape {:?}, expected {expected:?}",
                    source.name(),
                    raw.shape()
                )));
            }
            let reduced = aggregate(&raw, self.aggregation);
            out.slice_mut(s![offset..offset + chunk.len(), ..])
                .assign(&reduced);
            offset += chunk.len();
        }
        Ok(out)
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::{ErrorModel, ManualSource, SimulatedSource, TwoPort};
    use ndarray::Array3;
    use num_complex::Complex64;
    fn tagged_sweep(reps: usize, points: usize, tag: f64) -> Array3<Complex64> {
        let mut raw = Array3::zeros((reps, points, 2));
        for rep in 0..reps {
            for i in 0..points {
                raw[[rep, i, 0]] = Complex64::new(tag, i as f64);
                raw[[rep, i, 1]] = Complex64::new(rep as f64, 0.0);
            }
        }
        raw
    }
    #[test]
    fn thousand_points_in_segments_of_one_hundred() {
        let axis = FrequencyAxis::linear(1e6, 1000e6, 1000);
        let sweeps = (0..10).map(|k| tagged_sweep(3, 100, k as f64));
        let mut source = ManualSource::new(sweeps);
        let segmenter = SweepSegmenter::new(100, 3, Aggregation::Median);
        let data = segmenter.measure(&mut source, &axis).unwrap();
        let requests = source.requests();
        assert_eq!(requests.len(), 10);
        assert!(requests.iter().all(|r| r.points <= 100 && r.repetitions == 3));
        assert!(requests.windows(2).all(|w| w[0].stop_hz < w[1].start_hz));
        assert_eq!(requests[0].start_hz, 1_000_000);
        assert_eq!(requests[9].stop_hz, 1_000_000_000);
        assert_eq!(data.shape(), &[1000, 2]);
        for (row, value) in data.column(0).iter().enumerate() {
            assert_eq!(*value, Complex64::new((row / 100) as f64, (row % 100) as f64));
        }
        // Median over repetitions 0, 1, 2.
        assert_eq!(data[[500, 1]], Complex64::new(1.0, 0.0));
    }
    #[test]
    fn device_ceiling_further_limits_chunk_size() {
        let axis = FrequencyAxis::linear(1e6, 2e6, 200);
        let segmenter = SweepSegmenter::new(100, 1, Aggregation::Mean);
        let mut source = SimulatedSource::new(|_| ErrorModel::ideal()).with_max_points(40);
        source.connect(|_| TwoPort::open());
        let data = segmenter.measure(&mut source, &axis).unwrap();
        assert_eq!(source.sweep_count(), 5);
        assert!(data.column(0).iter().all(|v| *v == Complex64::new(1.0, 0.0)));
    }
    #[test]
    fn log_axis_chunks_line_up_with_segments() {
        let axis = FrequencyAxis::segmented_log(10e3, 1e9, 505, 101);
        let segmenter = SweepSegmenter::new(101, 1, Aggregation::Median);
        let chunks = segmenter.chunks(&axis, 401).unwrap();
        assert_eq!(chunks.len(), 5);
        assert!(chunks.iter().all(|c| c.len() == 101));
    }
    #[test]
    fn non_linear_chunk_is_an_axis_mismatch() {
        let axis = FrequencyAxis::segmented_log(10e3, 1e9, 505, 101);
        // A segment size that straddles the log boundaries cannot be swept linearly.
        let segmenter = SweepSegmenter::new(150, 1, Aggregation::Median);
        let mut source = ManualSource::new(Vec::new());
        let err = segmenter.measure(&mut source, &axis).unwrap_err();
        assert!(matches!(err, NanoVnaError::AxisMismatch(_)));
        assert!(source.requests().is_empty());
    }
    #[test]
    fn wrong_shape_from_source_is_a_protocol_violation() {
        let axis = FrequencyAxis::linear(1e6, 2e6, 10);
        let mut source = ManualSource::new(vec![tagged_sweep(1, 9, 0.0)]);
        let segmenter = SweepSegmenter::new(10, 1, Aggregation::Median);
        let err = segmenter.measure(&mut source, &axis).unwrap_err();
        assert!(matches!(err, NanoVnaError::ProtocolViolation(_)));
    }
}
