//! Driver for the NanoVNA V2 (S-A-A-2) register protocol.
//!
//! Every host command is a one byte opcode, a one byte register address and a
//! little-endian payload. Sweeps are configured through registers and results
//! are drained from a FIFO of fixed 32 byte records. Any read from the FIFO
//! switches the device into USB streaming mode, which must be left explicitly.
use std::io::{Read, Write};
use log::{debug, info, warn};
use ndarray::Array3;
use num_complex::Complex64;
use serialport::SerialPort;
use crate::drivers::DriverState;
use crate::error::{NanoVnaError, Result};
use crate::types::RawSweep;
pub const MIN_FREQUENCY_HZ: u64 = 10_000;
pub const MAX_FREQUENCY_HZ: u64 = 4_400_000_000;
pub const MAX_POINTS: usize = 255;
pub const NAME: &str = "saa2";
/// Size of one FIFO record on the wire.
pub const RECORD_LEN: usize = 32;
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
enum Opcode {
    ReadFifo = 0x18,
    Write = 0x20,
    Write2 = 0x21,
    Write8 = 0x23,
}
mod register {
    pub const SWEEP_START: u8 = 0x00;
    pub const SWEEP_STEP: u8 = 0x10;
    pub const SWEEP_POINTS: u8 = 0x20;
    pub const VALUES_PER_FREQUENCY: u8 = 0x22;
    pub const RAW_SAMPLES_MODE: u8 = 0x26;
    pub const VALUES_FIFO: u8 = 0x30;
}
/// Value written to `RAW_SAMPLES_MODE` to leave USB streaming mode.
const EXIT_USB_MODE: u8 = 2;
fn encode(opcode: Opcode, address: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + payload.len());
    out.push(opcode as u8);
    out.push(address);
    out.extend_from_slice(payload);
    out
}
/// One decoded FIFO record: `<6 x i32, i16 index, 6 pad bytes>`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FifoRecord {
    pub forward: Complex64,
    pub reflected: Complex64,
    pub transmitted: Complex64,
    pub index: i16,
}
impl FifoRecord {
    pub fn parse(bytes: &[u8; RECORD_LEN]) -> Self {
        let word = |i: usize| {
            let offset = i * 4;
            let raw = [
                bytes[offset],
                bytes[offset + 1],
                bytes[offset + 2],
                bytes[offset + 3],
            ];
            i32::from_le_bytes(raw) as f64
        };
        Self {
            forward: Complex64::new(word(0), word(1)),
            reflected: Complex64::new(word(2), word(3)),
            transmitted: Complex64::new(word(4), word(5)),
            index: i16::from_le_bytes([bytes[24], bytes[25]]),
        }
    }
    /// Reflection and transmission normalized to the forward wave.
    pub fn ratios(&self) -> [Complex64; 2] {
        [self.reflected / self.forward, self.transmitted / self.forward]
    }
}
pub struct BinaryFifoDriver<P = Box<dyn SerialPort>> {
    port: P,
    state: DriverState,
}
impl<P: Read + Write> BinaryFifoDriver<P> {
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
    pub fn sweep(
        &mut self,
        start_hz: u64,
        stop_hz: u64,
        points: usize,
        repetitions: usize,
    ) -> Result<RawSweep> {
        validate(start_hz, stop_hz, points, repetitions)?;
        info!("saa2 sweep {start_hz}..{stop_hz} Hz, {points} points x {repetitions}");
        let step_hz = if points > 1 {
            (stop_hz - start_hz) / (points as u64 - 1)
        } else {
            0
        };
        let mut guard = StreamingGuard::arm(self);
        let data = guard.driver().acquire(start_hz, step_hz, points, repetitions)?;
        guard.finish()?;
        Ok(data)
    }
    fn acquire(
        &mut self,
        start_hz: u64,
        step_hz: u64,
        points: usize,
        repetitions: usize,
    ) -> Result<RawSweep> {
        self.state = DriverState::Sweeping;
        let mut data = Array3::zeros((repetitions, points, 2));
        let mut fifo = vec![0u8; RECORD_LEN * points];
        for rep in 0..repetitions {
            self.configure(start_hz, step_hz, points)?;
            // Clearing guarantees the first record read back has index 0.
            self.send(&encode(Opcode::Write, register::VALUES_FIFO, &[0]))?;
            self.send(&encode(
                Opcode::ReadFifo,
                register::VALUES_FIFO,
                &[points as u8],
            ))?;
            self.port.read_exact(&mut fifo)?;
            for (i, chunk) in fifo.chunks_exact(RECORD_LEN).enumerate() {
                let mut raw = [0u8; RECORD_LEN];
                raw.copy_from_slice(chunk);
                let record = FifoRecord::parse(&raw);
                if record.index as i64 != i as i64 {
                    return Err(NanoVnaError::protocol(format!(
                        "fifo record {i} carries index {}",
                        record.index
                    )));
                }
                let [s11, s21] = record.ratios();
                data[[rep, i, 0]] = s11;
                data[[rep, i, 1]] = s21;
            }
        }
        Ok(data)
    }
    fn configure(&mut self, start_hz: u64, step_hz: u64, points: usize) -> Result<()> {
        let mut cmd = encode(
            Opcode::Write8,
            register::SWEEP_START,
            &start_hz.to_le_bytes(),
        );
        cmd.extend(encode(
            Opcode::Write8,
            register::SWEEP_STEP,
            &step_hz.to_le_bytes(),
        ));
        cmd.extend(encode(
            Opcode::Write2,
            register::SWEEP_POINTS,
            &(points as u16).to_le_bytes(),
        ));
        cmd.extend(encode(
            Opcode::Write2,
            register::VALUES_PER_FREQUENCY,
            &1u16.to_le_bytes(),
        ));
        self.send(&cmd)
    }
    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        debug!("saa2 <- {bytes:02x?}");
        self.port.write_all(bytes)?;
        self.port.flush()?;
        Ok(())
    }
    fn exit_streaming(&mut self) -> Result<()> {
        self.state = DriverState::Closing;
        let sent = self.send(&encode(
            Opcode::Write,
            register::RAW_SAMPLES_MODE,
            &[EXIT_USB_MODE],
        ));
        self.state = DriverState::Idle;
        sent
    }
}
/// Leaves USB streaming mode when dropped unless already finished.
struct StreamingGuard<'a, P: Read + Write> {
    driver: &'a mut BinaryFifoDriver<P>,
    armed: bool,
}
impl<'a, P: Read + Write> StreamingGuard<'a, P> {
    fn arm(driver: &'a mut BinaryFifoDriver<P>) -> Self {
        Self {
            driver,
            armed: true,
        }
    }
    fn driver(&mut self) -> &mut BinaryFifoDriver<P> {
        &mut *self.driver
    }
    fn finish(mut self) -> Result<()> {
        self.armed = false;
        self.driver.exit_streaming()
    }
}
impl<P: Read + Write> Drop for StreamingGuard<'_, P> {
    fn drop(&mut self) {
        if self.armed {
            if let Err(err) = self.driver.exit_streaming() {
                warn!("saa2: failed to leave streaming mode: {err}");
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
#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::testing::ScriptedPort;
    fn record(index: i16, fwd: (i32, i32), refl: (i32, i32), thru: (i32, i32)) -> Vec<u8> {
        let mut out = Vec::with_capacity(RECORD_LEN);
        for word in [fwd.0, fwd.1, refl.0, refl.1, thru.0, thru.1] {
            out.extend_from_slice(&word.to_le_bytes());
        }
        out.extend_from_slice(&index.to_le_bytes());
        out.extend_from_slice(&[0xAA; 6]);
        out
    }
    fn exit_command() -> Vec<u8> {
        vec![0x20, 0x26, 0x02]
    }
    #[test]
    fn sweep_writes_registers_and_decodes_records() {
        let mut fifo = Vec::new();
        fifo.extend(record(0, (1000, 0), (500, 0), (0, 250)));
        fifo.extend(record(1, (0, 2000), (0, -1000), (2000, 0)));
        let mut driver = BinaryFifoDriver::new(ScriptedPort::new(fifo));
        let data = driver.sweep(1_000_000, 3_000_000, 2, 1).unwrap();
        assert_eq!(data.shape(), &[1, 2, 2]);
        assert_eq!(data[[0, 0, 0]], Complex64::new(0.5, 0.0));
        assert_eq!(data[[0, 0, 1]], Complex64::new(0.0, 0.25));
        assert_eq!(data[[0, 1, 0]], Complex64::new(-0.5, 0.0));
        assert_eq!(data[[0, 1, 1]], Complex64::new(0.0, -1.0));
        assert_eq!(driver.state(), DriverState::Idle);
        let mut expected = vec![0x23, 0x00];
        expected.extend(1_000_000u64.to_le_bytes());
        expected.extend([0x23, 0x10]);
        expected.extend(2_000_000u64.to_le_bytes());
        expected.extend([0x21, 0x20, 2, 0]);
        expected.extend([0x21, 0x22, 1, 0]);
        expected.extend([0x20, 0x30, 0]);
        expected.extend([0x18, 0x30, 2]);
        expected.extend(exit_command());
        assert_eq!(driver.into_inner().written(), expected.as_slice());
    }
    #[test]
    fn out_of_sequence_record_is_rejected_and_streaming_exited() {
        let mut fifo = Vec::new();
        fifo.extend(record(0, (1, 0), (1, 0), (1, 0)));
        fifo.extend(record(5, (1, 0), (1, 0), (1, 0)));
        let mut driver = BinaryFifoDriver::new(ScriptedPort::new(fifo));
        let err = driver.sweep(100_000, 200_000, 2, 1).unwrap_err();
        assert!(matches!(err, NanoVnaError::ProtocolViolation(_)));
        assert_eq!(driver.state(), DriverState::Idle);
        assert!(driver.into_inner().written().ends_with(&exit_command()));
    }
    #[test]
    fn truncated_fifo_still_exits_streaming() {
        let fifo = record(0, (1, 0), (1, 0), (1, 0));
        let mut driver = BinaryFifoDriver::new(ScriptedPort::new(fifo));
        let err = driver.sweep(100_000, 200_000, 2, 1).unwrap_err();
        assert!(matches!(err, NanoVnaError::Io(_)));
        assert!(driver.into_inner().written().ends_with(&exit_command()));
    }
    #[test]
    fn each_repetition_reconfigures_the_sweep() {
        let mut fifo = Vec::new();
        for _ in 0..3 {
            fifo.extend(record(0, (4, 0), (2, 0), (1, 0)));
        }
        let mut driver = BinaryFifoDriver::new(ScriptedPort::new(fifo));
        let data = driver.sweep(50_000, 50_000, 1, 3).unwrap();
        assert_eq!(data.shape(), &[3, 1, 2]);
        assert!(data.iter().step_by(2).all(|v| *v == Complex64::new(0.5, 0.0)));
        let written = driver.into_inner().written().to_vec();
        let reads = written.windows(3).filter(|w| *w == [0x18, 0x30, 1]).count();
        assert_eq!(reads, 3);
    }
    #[test]
    fn limits_are_checked_before_touching_the_port() {
        let mut driver = BinaryFifoDriver::new(ScriptedPort::new(Vec::new()));
        for (start, stop, points) in [
            (9_999, 1_000_000, 11),
            (1_000_000, 4_400_000_001, 11),
            (1_000_000, 2_000_000, 256),
            (1_000_000, 2_000_000, 0),
        ] {
            let err = driver.sweep(start, stop, points, 1).unwrap_err();
            assert!(matches!(err, NanoVnaError::InvalidSweep { .. }));
        }
        assert!(driver.into_inner().written().is_empty());
    }
    #[test]
    fn record_layout_ignores_padding() {
        let bytes = record(-2, (-7, 8), (9, -10), (11, 12));
        let mut raw = [0u8; RECORD_LEN];
        raw.copy_from_slice(&bytes);
        let parsed = FifoRecord::parse(&raw);
        assert_eq!(parsed.index, -2);
        assert_eq!(parsed.forward, Complex64::new(-7.0, 8.0));
        assert_eq!(parsed.reflected, Complex64::new(9.0, -10.0));
        assert_eq!(parsed.transmitted, Complex64::new(11.0, 12.0));
    }
}
