use crate::error::{NanoVnaError, Result};
/// Ordered, nondecreasing list of sweep frequencies in Hz.
#[derive(Clone, Debug, PartialEq)]
pub struct FrequencyAxis {
    values: Vec<f64>,
}
impl FrequencyAxis {
    /// Evenly spaced axis including both end points.
    pub fn linear(start: f64, stop: f64, points: usize) -> Self {
        Self {
            values: linspace(start, stop, points),
        }
    }
    /// Piecewise-linear axis over logarithmically spaced segments.
    ///
    /// `ceil(points / segment)` segment boundaries are placed on a log scale and
    /// each segment is filled linearly, starting at its lower boundary and
    /// stopping short of the next one. Every segment holds `segment` points
    /// except the last, which takes whatever remains, so the axis always has
    /// exactly `points` entries and chunking it by `segment` yields linear chunks.
    pub fn segmented_log(start: f64, stop: f64, points: usize, segment: usize) -> Self {
        if segment == 0 || points <= segment {
            return Self::linear(start, stop, points);
        }
        let count = points.div_ceil(segment);
        let bounds: Vec<f64> = linspace(start.log10(), stop.log10(), count + 1)
            .into_iter()
            .map(|exp| 10f64.powf(exp))
            .collect();
        let mut values = Vec::with_capacity(points);
        for (i, pair) in bounds.windows(2).enumerate() {
            let in_segment = if i + 1 < count {
                segment
            } else {
                points - (count - 1) * segment
            };
            let step = (pair[1] - pair[0]) / in_segment as f64;
            values.extend((0..in_segment).map(|k| pair[0] + k as f64 * step));
        }
        Self { values }
    }
    pub fn from_values(values: Vec<f64>) -> Result<Self> {
        if values.windows(2).any(|w| w[1] < w[0]) {
            return Err(NanoVnaError::AxisMismatch(
                "frequencies must be nondecreasing".into(),
            ));
        }
        Ok(Self { values })
    }
    pub fn values(&self) -> &[f64] {
        &self.values
    }
    pub fn len(&self) -> usize {
        self.values.len()
    }
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
    pub fn first(&self) -> Option<f64> {
        self.values.first().copied()
    }
    pub fn last(&self) -> Option<f64> {
        self.values.last().copied()
    }
}
/// `points` evenly spaced values from `start` to `stop` inclusive.
pub fn linspace(start: f64, stop: f64, points: usize) -> Vec<f64> {
    match points {
        0 => Vec::new(),
        1 => vec![start],
        n => {
            let step = (stop - start) / (n - 1) as f64;
            let mut out: Vec<f64> = (0..n).map(|i| start + i as f64 * step).collect();
            out[n - 1] = stop;
            out
        }
    }
}
/// L2 distance between `chunk` and an ideal linear ramp over the same end points.
pub fn linear_residual(chunk: &[f64]) -> f64 {
    let (Some(&first), Some(&last)) = (chunk.first(), chunk.last()) else {
        return 0.0;
    };
    chunk
        .iter()
        .zip(linspace(first, last, chunk.len()))
        .map(|(actual, ideal)| (actual - ideal).powi(2))
        .sum::<f64>()
        .sqrt()
}
/// Piecewise-linear interpolation of `fp(xp)` at `x`, clamped to the end values.
pub fn interp<T>(x: f64, xp: &[f64], fp: &[T]) -> T
where
    T: Copy + std::ops::Add<Output = T> + std::ops::Sub<Output = T> + std::ops::Mul<f64, Output = T>,
{
    debug_assert_eq!(xp.len(), fp.len());
    debug_assert!(!xp.is_empty());
    let last = xp.len() - 1;
    if x <= xp[0] {
        return fp[0];
    }
    if x >= xp[last] {
        return fp[last];
    }
    // First index whose abscissa exceeds x; 1..=last given the clamps above.
    let hi = xp.partition_point(|&v| v <= x);
    let lo = hi - 1;
    let span = xp[hi] - xp[lo];
    if span == 0.0 {
        return fp[hi];
    }
    let t = (x - xp[lo]) / span;
    fp[lo] + (fp[hi] - fp[lo]) * t
}
