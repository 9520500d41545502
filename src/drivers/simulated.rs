//! In-process reflectometer used for offline development and tests.
//!
//! A device-under-test is described by its 2x2 S-matrix as a function of
//! frequency and is observed through a one-path error model (directivity,
//! source match, reflection tracking, load match, transmission tracking).
use num_complex::Complex64;
use ndarray::Array3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use crate::drivers::SweepSource;
use crate::error::{NanoVnaError, Result};
use crate::sweep::linspace;
use crate::types::RawSweep;
/// S-parameters of a two-port at one frequency.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TwoPort {
    pub s11: Complex64,
    pub s21: Complex64,
    pub s12: Complex64,
    pub s22: Complex64,
}
impl TwoPort {
    /// One-port termination on port 1, nothing reaches port 2.
    pub fn reflect(gamma: Complex64) -> Self {
        Self {
            s11: gamma,
            s21: Complex64::new(0.0, 0.0),
            s12: Complex64::new(0.0, 0.0),
            s22: Complex64::new(0.0, 0.0),
        }
    }
    pub fn open() -> Self {
        Self::reflect(Complex64::new(1.0, 0.0))
    }
    pub fn short() -> Self {
        Self::reflect(Complex64::new(-1.0, 0.0))
    }
    pub fn load() -> Self {
        Self::reflect(Complex64::new(0.0, 0.0))
    }
    /// Ideal zero-length connection between the ports.
    pub fn thru() -> Self {
        let one = Complex64::new(1.0, 0.0);
        let zero = Complex64::new(0.0, 0.0);
        Self {
            s11: zero,
            s21: one,
            s12: one,
            s22: zero,
        }
    }
    /// Matched, non-reflecting forward path with gain `s21`.
    pub fn matched(s21: Complex64) -> Self {
        let zero = Complex64::new(0.0, 0.0);
        Self {
            s11: zero,
            s21,
            s12: zero,
            s22: zero,
        }
    }
}
/// Forward-path systematic errors; isolation (e30) is zero.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ErrorModel {
    pub e00: Complex64,
    pub e11: Complex64,
    pub e10e01: Complex64,
    pub e22: Complex64,
    pub e10e32: Complex64,
}
impl ErrorModel {
    pub fn ideal() -> Self {
        Self {
            e00: Complex64::new(0.0, 0.0),
            e11: Complex64::new(0.0, 0.0),
            e10e01: Complex64::new(1.0, 0.0),
            e22: Complex64::new(0.0, 0.0),
            e10e32: Complex64::new(1.0, 0.0),
        }
    }
    /// Raw (reflection, transmission) ratios the instrument would report.
    pub fn observe(&self, dut: &TwoPort) -> [Complex64; 2] {
        let one = Complex64::new(1.0, 0.0);
        let gamma_in = dut.s11 + dut.s21 * dut.s12 * self.e22 / (one - dut.s22 * self.e22);
        let reflection = self.e00 + self.e10e01 * gamma_in / (one - self.e11 * gamma_in);
        let denominator = (one - self.e11 * dut.s11) * (one - self.e22 * dut.s22)
            - self.e11 * self.e22 * dut.s21 * dut.s12;
        let transmission = self.e10e32 * dut.s21 / denominator;
        [reflection, transmission]
    }
}
impl Default for ErrorModel {
    fn default() -> Self {
        Self::ideal()
    }
}
type Response<T> = Box<dyn Fn(f64) -> T + Send>;
pub struct SimulatedSource {
    errors: Response<ErrorModel>,
    dut: Response<TwoPort>,
    noise: f64,
    rng: StdRng,
    max_points: usize,
    sweeps: usize,
}
impl SimulatedSource {
    pub fn new(errors: impl Fn(f64) -> ErrorModel + Send + 'static) -> Self {
        Self {
            errors: Box::new(errors),
            dut: Box::new(|_| TwoPort::load()),
            noise: 0.0,
            rng: StdRng::seed_from_u64(0),
            max_points: 401,
            sweeps: 0,
        }
    }
    /// Adds uniform noise of at most `amplitude` to both quadratures.
    pub fn with_noise(mut self, amplitude: f64, seed: u64) -> Self {
        self.noise = amplitude.abs();
        self.rng = StdRng::seed_from_u64(seed);
        self
    }
    pub fn with_max_points(mut self, max_points: usize) -> Self {
        self.max_points = max_points;
        self
    }
    /// Replaces whatever is connected to the test ports.
    pub fn connect(&mut self, dut: impl Fn(f64) -> TwoPort + Send + 'static) {
        self.dut = Box::new(dut);
    }
    /// Number of `sweep` calls served.
    pub fn sweep_count(&self) -> usize {
        self.sweeps
    }
    fn jitter(&mut self) -> Complex64 {
        if self.noise == 0.0 {
            return Complex64::new(0.0, 0.0);
        }
        Complex64::new(
            self.rng.gen_range(-self.noise..=self.noise),
            self.rng.gen_range(-self.noise..=self.noise),
        )
    }
}
impl SweepSource for SimulatedSource {
    fn name(&self) -> &'static str {
        "simulated"
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
        if points == 0 || points > self.max_points || stop_hz < start_hz {
            return Err(NanoVnaError::InvalidSweep {
                driver: "simulated",
                reason: format!("{start_hz}..{stop_hz} Hz with {points} points"),
            });
        }
        self.sweeps += 1;
        let freqs = linspace(start_hz as f64, stop_hz as f64, points);
        let mut data = Array3::zeros((repetitions, points, 2));
        for rep in 0..repetitions {
            for (i, &freq) in freqs.iter().enumerate() {
                let observed = (self.errors)(freq).observe(&(self.dut)(freq));
                data[[rep, i, 0]] = observed[0] + self.jitter();
                data[[rep, i, 1]] = observed[1] + self.jitter();
            }
        }
        Ok(data)
    }
}
