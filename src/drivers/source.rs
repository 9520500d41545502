use std::collections::VecDeque;
use crate::error::{NanoVnaError, Result};
use crate::types::RawSweep;
/// One sweep as requested from a source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SweepRequest {
    pub start_hz: u64,
    pub stop_hz: u64,
    pub points: usize,
    pub repetitions: usize,
}
/// Anything that can run a bounded linear sweep and return raw ratios.
///
/// The result is shaped `repetitions x points x 2`, holding the reflection
/// ratio in slot 0 and the transmission ratio in slot 1.
pub trait SweepSource {
    fn name(&self) -> &'static str;
    /// Largest point count accepted by a single `sweep` call.
    fn max_points(&self) -> usize;
    fn sweep(
        &mut self,
        start_hz: u64,
        stop_hz: u64,
        points: usize,
        repetitions: usize,
    ) -> Result<RawSweep>;
}
impl<S: SweepSource + ?Sized> SweepSource for &mut S {
    fn name(&self) -> &'static str {
        (**self).name()
    }
    fn max_points(&self) -> usize {
        (**self).max_points()
    }
    fn sweep(
        &mut self,
        start_hz: u64,
        stop_hz: u64,
        points: usize,
        repetitions: usize,
    ) -> Result<RawSweep> {
        (**self).sweep(start_hz, stop_hz, points, repetitions)
    }
}
/// In-memory source useful for tests and deterministic playback.
pub struct ManualSource {
    queue: VecDeque<RawSweep>,
    max_points: usize,
    requests: Vec<SweepRequest>,
}
impl ManualSource {
    pub fn new(sweeps: impl IntoIterator<Item = RawSweep>) -> Self {
        Self {
            queue: sweeps.into_iter().collect(),
            max_points: usize::MAX,
            requests: Vec::new(),
        }
    }
    pub fn with_max_points(mut self, max_points: usize) -> Self {
        self.max_points = max_points;
        self
    }
    /// Every request received so far, in order.
    pub fn requests(&self) -> &[SweepRequest] {
        &self.requests
    }
}
impl SweepSource for ManualSource {
    fn name(&self) -> &'static str {
        "manual"
    }
    fn max_points(&self) -> usize {
        self.max_points
    }
    fn sweep(
        &mut self,
        start_hz: u64,
        stop_hz: u64,
        points: usize,
        repetitions: usize,
    ) -> Result<RawSweep> {
        self.requests.push(SweepRequest {
            start_hz,
            stop_hz,
            points,
            repetitions,
        });
        self.queue
            .pop_front()
            .ok_or_else(|| NanoVnaError::protocol("manual source ran out of sweeps"))
    }
}
