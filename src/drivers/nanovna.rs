//! Driver for the original NanoVNA and its firmware derivatives.
//!
//! The instrument speaks a line-oriented shell over USB CDC: every command is
//! terminated by `\r`, echoed back, and its output ends with the `ch>` prompt.
//! Raw (uncorrected) data is obtained by switching the onboard calibration off
//! for the duration of a sweep; a scope guard switches it back on
//! and resumes the display sweep on every exit path.
use std::io::{Read, Write};
use log::{debug, info, warn};
use ndarray::Array3;
use num_complex::Complex64;
use serialport::SerialPort;
use crate::drivers::DriverState;
use crate::error::{NanoVnaError, Result};
use crate::types::RawSweep;
/// Lowest frequency the Si5351 multisynth can reach: with a 26 MHz crystal,
/// PLL multiplier 32 and R divider 64 the divider ratio must stay below 2048.
pub const MIN_FREQUENCY_HZ: u64 = 6348;
pub const MAX_FREQUENCY_HZ: u64 = 2_700_000_000;
pub const MAX_POINTS: usize = 401;
pub const NAME: &str = "nanovna";
const PROMPT: &[u8] = b"ch>";
const HELP_HEADER: &str = "Commands:";
/// Output mask for `scan`: frequency, channel 0 and channel 1 data. The
/// firmware parses it as a decimal number.
const SCAN_MASK: u32 = 111;
pub struct AsciiTextDriver<P = Box<dyn SerialPort>> {
    port: P,
    state: DriverState,
}
impl<P: Read + Write> AsciiTextDriver<P> {
    pub fn new(port: P) -> Self {
        Self {
            port,
            state: DriverState::Idle,
        }
    }
    pub fn state(&self) -> DriverState {
        self.state
    }
    pub fn into_inner(self) -> P {
        self.port
    }
    /// Runs `repetitions` raw scans of `points` linearly spaced frequencies.
    pub fn sweep(
        &mut self,
        start_hz: u64,
        stop_hz: u64,
        points: usize,
        repetitions: usize,
    ) -> Result<RawSweep> {
        validate(start_hz, stop_hz, points, repetitions)?;
        info!("nanovna sweep {start_hz}..{stop_hz} Hz, {points} points x {repetitions}");
        let mut guard = CalibrationGuard::arm(self);
        let data = guard.driver().acquire(start_hz, stop_hz, points, repetitions)?;
        guard.finish()?;
        Ok(data)
    }
    fn acquire(
        &mut self,
        start_hz: u64,
        stop_hz: u64,
        points: usize,
        repetitions: usize,
    ) -> Result<RawSweep> {
        self.state = DriverState::Syncing;
        self.sync()?;
        self.command("cal off")?;
        self.state = DriverState::CalibrationDisabled;
        let mut data = Array3::zeros((repetitions, points, 2));
        self.state = DriverState::Sweeping;
        for rep in 0..repetitions {
            let rows = self.scan(start_hz, stop_hz, points)?;
            for (i, [s11, s21]) in rows.into_iter().enumerate() {
                data[[rep, i, 0]] = s11;
                data[[rep, i, 1]] = s21;
            }
        }
        Ok(data)
    }
    /// Clears whatever the shell still had buffered from an earlier session.
    fn sync(&mut self) -> Result<()> {
        let text = self.command("help")?;
        if is_help_response(&text) {
            return Ok(());
        }
        debug!("nanovna: unexpected reply to help, draining one more response");
        let text = self.read_response()?;
        if is_help_response(&text) {
            Ok(())
        } else {
            Err(NanoVnaError::protocol(format!(
                "device did not answer `help` (got {:?})",
                text.lines().next().unwrap_or("")
            )))
        }
    }
    fn scan(&mut self, start_hz: u64, stop_hz: u64, points: usize) -> Result<Vec<[Complex64; 2]>> {
        let text = self.command(&format!("scan {start_hz} {stop_hz} {points} {SCAN_MASK}"))?;
        let rows = text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(parse_scan_line)
            .collect::<Result<Vec<_>>>()?;
        if rows.len() != points {
            return Err(NanoVnaError::protocol(format!(
                "scan returned {} lines, expected {points}",
                rows.len()
            )));
        }
        let first = rows[0].0;
        let last = rows[rows.len() - 1].0;
        if first != start_hz as f64 || last != stop_hz as f64 {
            return Err(NanoVnaError::protocol(format!(
                "scan covered {first}..{last} Hz, expected {start_hz}..{stop_hz} Hz"
            )));
        }
        Ok(rows.into_iter().map(|(_, pair)| pair).collect())
    }
    fn release(&mut self) -> Result<()> {
        self.state = DriverState::Closing;
        // Resume first so the display sweep restarts with the device's own frequencies.
        let resumed = self.command("resume");
        let restored = self.command("cal on");
        self.state = DriverState::Idle;
        resumed?;
        restored?;
        Ok(())
    }
    fn command(&mut self, cmd: &str) -> Result<String> {
        self.send(cmd)?;
        self.read_response()
    }
    /// Writes `cmd` and consumes the echoed line.
    fn send(&mut self, cmd: &str) -> Result<()> {
        debug!("nanovna <- {cmd}");
        self.port.write_all(cmd.as_bytes())?;
        self.port.write_all(b"\r")?;
        self.port.flush()?;
        let mut byte = [0u8; 1];
        loop {
            self.port.read_exact(&mut byte)?;
            if byte[0] == b'\n' {
                return Ok(());
            }
        }
    }
    /// Reads byte by byte until the shell prompt appears.
    fn read_response(&mut self) -> Result<String> {
        let mut text = Vec::new();
        let mut line = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            self.port.read_exact(&mut byte)?;
            match byte[0] {
                b'\r' => {}
                b'\n' => {
                    line.push(b'\n');
                    text.append(&mut line);
                }
                other => {
                    line.push(other);
                    if line.ends_with(PROMPT) {
                        break;
                    }
                }
            }
        }
        Ok(String::from_utf8_lossy(&text).trim().to_string())
    }
}
/// Keeps onboard calibration disabled only while it is alive.
struct CalibrationGuard<'a, P: Read + Write> {
    driver: &'a mut AsciiTextDriver<P>,
    armed: bool,
}
impl<'a, P: Read + Write> CalibrationGuard<'a, P> {
    fn arm(driver: &'a mut AsciiTextDriver<P>) -> Self {
        Self {
            driver,
            armed: true,
        }
    }
    fn driver(&mut self) -> &mut AsciiTextDriver<P> {
        &mut *self.driver
    }
    /// Releases the device and reports any failure to do so.
    fn finish(mut self) -> Result<()> {
        self.armed = false;
        self.driver.release()
    }
}
impl<P: Read + Write> Drop for CalibrationGuard<'_, P> {
    fn drop(&mut self) {
        if self.armed {
            if let Err(err) = self.driver.release() {
                warn!("nanovna: failed to restore onboard calibration: {err}");
            }
        }
    }
}
fn validate(start_hz: u64, stop_hz: u64, points: usize, repetitions: usize) -> Result<()> {
    let reason = if points == 0 || points > MAX_POINTS {
        format!("point count {points} outside 1..={MAX_POINTS}")
    } else if stop_hz < start_hz {
        format!("stop {stop_hz} Hz below start {start_hz} Hz")
    } else if start_hz < MIN_FREQUENCY_HZ {
        format!("start {start_hz} Hz below {MIN_FREQUENCY_HZ} Hz")
    } else if stop_hz > MAX_FREQUENCY_HZ {
        format!("stop {stop_hz} Hz above {MAX_FREQUENCY_HZ} Hz")
    } else if repetitions == 0 {
        "at least one repetition is required".to_string()
    } else {
        return Ok(());
    };
    Err(NanoVnaError::InvalidSweep {
        driver: NAME,
        reason,
    })
}
fn is_help_response(text: &str) -> bool {
    text.lines()
        .any(|line| line.trim_start().starts_with(HELP_HEADER))
}
/// `freq re11 im11 re21 im21`
fn parse_scan_line(line: &str) -> Result<(f64, [Complex64; 2])> {
    let cols = line
        .split_whitespace()
        .map(str::parse::<f64>)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| NanoVnaError::protocol(format!("bad scan line {line:?}: {err}")))?;
    if cols.len() != 5 {
        return Err(NanoVnaError::protocol(format!(
            "scan line has {} columns, expected 5: {line:?}",
            cols.len()
        )));
    }
    Ok((
        cols[0],
        [Complex64::new(cols[1], cols[2]), Complex64::new(cols[3], cols[4])],
    ))
}
