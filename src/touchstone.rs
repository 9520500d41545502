//! Touchstone (v1) reader and writer.
//!
//! Only the forward path is ever measured, so two-port output fills the
//! reverse slots from it: S12 repeats S21 and S22 repeats S11. The result is a
//! structurally complete matrix that is exact only for symmetric, reciprocal
//! devices.
use std::fmt;
use ndarray::{Array2, Array3};
use num_complex::Complex64;
use crate::error::{NanoVnaError, Result};
use crate::sweep::FrequencyAxis;
use crate::types::SParams;
/// Reference impedance written to and required from every file.
pub const REFERENCE_OHMS: f64 = 50.0;
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FrequencyUnit {
    Hz,
    KHz,
    #[default]
    MHz,
    GHz,
}
impl FrequencyUnit {
    pub fn scale(self) -> f64 {
        match self {
            FrequencyUnit::Hz => 1.0,
            FrequencyUnit::KHz => 1e3,
            FrequencyUnit::MHz => 1e6,
            FrequencyUnit::GHz => 1e9,
        }
    }
    fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_uppercase().as_str() {
            "HZ" => Some(FrequencyUnit::Hz),
            "KHZ" => Some(FrequencyUnit::KHz),
            "MHZ" => Some(FrequencyUnit::MHz),
            "GHZ" => Some(FrequencyUnit::GHz),
            _ => None,
        }
    }
}
impl fmt::Display for FrequencyUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FrequencyUnit::Hz => "Hz",
            FrequencyUnit::KHz => "kHz",
            FrequencyUnit::MHz => "MHz",
            FrequencyUnit::GHz => "GHz",
        })
    }
}
/// How each complex value is spelled as a pair of numbers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DataFormat {
    /// Linear magnitude, angle in degrees.
    #[default]
    MA,
    /// Magnitude in dB, angle in degrees.
    DB,
    /// Real, imaginary.
    RI,
}
impl DataFormat {
    fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_uppercase().as_str() {
            "MA" => Some(DataFormat::MA),
            "DB" => Some(DataFormat::DB),
            "RI" => Some(DataFormat::RI),
            _ => None,
        }
    }
    fn encode(self, value: Complex64) -> String {
        match self {
            DataFormat::MA => format!(
                " {:>16} {:>12.6}",
                general(value.norm(), 10),
                value.arg().to_degrees()
            ),
            DataFormat::DB => format!(
                " {:>13.6} {:>12.6}",
                20.0 * value.norm().log10(),
                value.arg().to_degrees()
            ),
            DataFormat::RI => format!(
                " {:>17} {:>17}",
                general(value.re, 10),
                general(value.im, 10)
            ),
        }
    }
    fn decode(self, a: f64, b: f64) -> Complex64 {
        match self {
            DataFormat::MA => Complex64::from_polar(a, b.to_radians()),
            DataFormat::DB => Complex64::from_polar(10f64.powf(a / 20.0), b.to_radians()),
            DataFormat::RI => Complex64::new(a, b),
        }
    }
}
impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DataFormat::MA => "MA",
            DataFormat::DB => "DB",
            DataFormat::RI => "RI",
        })
    }
}
/// Option line contents.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    pub unit: FrequencyUnit,
    pub format: DataFormat,
}
impl Default for Header {
    /// Touchstone's defaults when the option line is absent.
    fn default() -> Self {
        Self {
            unit: FrequencyUnit::GHz,
            format: DataFormat::MA,
        }
    }
}
/// Renders `[S11, S21]` rows as a one-port or two-port Touchstone document.
pub fn write(
    axis: &FrequencyAxis,
    data: &SParams,
    format: DataFormat,
    one_port: bool,
    unit: FrequencyUnit,
) -> Result<String> {
    let columns = if one_port { 1 } else { 2 };
    if data.nrows() != axis.len() || data.ncols() < columns {
        return Err(NanoVnaError::AxisMismatch(format!(
            "{} frequencies but data has shape {:?}",
            axis.len(),
            data.shape()
        )));
    }
    let mut out = format!("# {unit} S {format} R {REFERENCE_OHMS}\n");
    for (freq, row) in axis.values().iter().zip(data.rows()) {
        out.push_str(&format!("{:<16}", general(freq / unit.scale(), 11)));
        let s11 = format.encode(row[0]);
        out.push_str(&s11);
        if !one_port {
            let s21 = format.encode(row[1]);
            out.push_str(&s21);
            out.push_str(&s21);
            out.push_str(&s11);
        }
        out.push('\n');
    }
    Ok(out)
}
/// A parsed Touchstone file.
#[derive(Clone, Debug, PartialEq)]
pub struct Network {
    pub header: Header,
    /// Frequencies in Hz.
    pub frequencies: Vec<f64>,
    /// `frequencies x ports x ports`, row-major: `s[[f, i, j]]` is S(i+1)(j+1).
    pub s: Array3<Complex64>,
}
impl Network {
    pub fn ports(&self) -> usize {
        self.s.shape()[1]
    }
    pub fn axis(&self) -> Result<FrequencyAxis> {
        FrequencyAxis::from_values(self.frequencies.clone())
    }
    /// `[S11, S21]` rows; a one-port network yields only the S11 column.
    pub fn forward(&self) -> SParams {
        let columns = self.ports().min(2);
        Array2::from_shape_fn((self.frequencies.len(), columns), |(f, i)| self.s[[f, i, 0]])
    }
}
/// Parses a Touchstone document.
pub fn read(text: &str) -> Result<Network> {
    let mut header: Option<Header> = None;
    // (first line number, numbers) per data row, continuation lines merged.
    let mut rows: Vec<(usize, Vec<f64>)> = Vec::new();
    for (index, raw_line) in text.lines().enumerate() {
        let lineno = index + 1;
        let line = raw_line.split('!').next().unwrap_or("");
        if line.trim().is_empty() {
            continue;
        }
        if line.trim_start().starts_with('#') {
            // Only the first option line counts.
            if header.is_none() {
                header = Some(parse_header(line)?);
            }
            continue;
        }
        let numbers = line
            .split_whitespace()
            .map(|token| {
                token.parse::<f64>().map_err(|_| NanoVnaError::InvalidTouchstoneData {
                    line: lineno,
                    reason: format!("`{token}` is not a number"),
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        let continues = line.starts_with(char::is_whitespace);
        match rows.last_mut() {
            Some((_, row)) if continues => row.extend(numbers),
            _ => rows.push((lineno, numbers)),
        }
    }
    let header = header.unwrap_or_default();
    let Some((first_line, first)) = rows.first() else {
        return Ok(Network {
            header,
            frequencies: Vec::new(),
            s: Array3::zeros((0, 0, 0)),
        });
    };
    let ports = port_count(first.len()).ok_or_else(|| NanoVnaError::InvalidTouchstoneData {
        line: *first_line,
        reason: format!("{} values do not form an N-port row", first.len()),
    })?;
    let mut frequencies = Vec::with_capacity(rows.len());
    let mut s = Array3::zeros((rows.len(), ports, ports));
    for (f, (lineno, row)) in rows.iter().enumerate() {
        if row.len() != 1 + 2 * ports * ports {
            return Err(NanoVnaError::InvalidTouchstoneData {
                line: *lineno,
                reason: format!(
                    "expected {} values for a {ports}-port row, found {}",
                    1 + 2 * ports * ports,
                    row.len()
                ),
            });
        }
        frequencies.push(row[0] * header.unit.scale());
        for (k, pair) in row[1..].chunks_exact(2).enumerate() {
            // Two-port rows are ordered S11 S21 S12 S22, all others row by row.
            let (i, j) = if ports == 2 {
                (k % ports, k / ports)
            } else {
                (k / ports, k % ports)
            };
            s[[f, i, j]] = header.format.decode(pair[0], pair[1]);
        }
    }
    Ok(Network {
        header,
        frequencies,
        s,
    })
}
fn parse_header(line: &str) -> Result<Header> {
    let mut header = Header::default();
    let mut tokens = line.trim_start().trim_start_matches('#').split_whitespace();
    while let Some(token) = tokens.next() {
        if let Some(unit) = FrequencyUnit::parse(token) {
            header.unit = unit;
        } else if let Some(format) = DataFormat::parse(token) {
            header.format = format;
        } else if token.eq_ignore_ascii_case("S") {
            continue;
        } else if token.eq_ignore_ascii_case("R") {
            let value = tokens.next().and_then(|v| v.parse::<f64>().ok());
            if value != Some(REFERENCE_OHMS) {
                return Err(NanoVnaError::InvalidTouchstoneHeader(format!(
                    "reference impedance must be {REFERENCE_OHMS} ohm: {}",
                    line.trim()
                )));
            }
        } else if ["Y", "Z", "H", "G"].iter().any(|p| token.eq_ignore_ascii_case(p)) {
            return Err(NanoVnaError::InvalidTouchstoneHeader(format!(
                "only S-parameters are supported, found {token}"
            )));
        } else {
            return Err(NanoVnaError::InvalidTouchstoneHeader(format!(
                "unknown option `{token}`"
            )));
        }
    }
    Ok(header)
}
/// N for a row of `1 + 2 * N^2` values.
fn port_count(values: usize) -> Option<usize> {
    if values < 3 || (values - 1) % 2 != 0 {
        return None;
    }
    let pairs = (values - 1) / 2;
    let ports = (pairs as f64).sqrt().round() as usize;
    (ports * ports == pairs).then_some(ports)
}
/// `%g`-style formatting with `precision` significant digits.
fn general(value: f64, precision: usize) -> String {
    if value == 0.0 || !value.is_finite() {
        return format!("{value}");
    }
    let exponent = value.abs().log10().floor() as i32;
    if exponent < -4 || exponent >= precision as i32 {
        let text = format!("{:.*e}", precision.saturating_sub(1), value);
        match text.split_once('e') {
            Some((mantissa, exp)) => format!("{}e{exp}", trim_fraction(mantissa)),
            None => text,
        }
    } else {
        let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
        trim_fraction(&format!("{value:.decimals$}")).to_string()
    }
}
fn trim_fraction(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    fn sample() -> (FrequencyAxis, SParams) {
        let axis = FrequencyAxis::linear(1e6, 900e6, 7);
        let data = Array2::from_shape_fn((7, 2), |(i, j)| {
            let mag = 0.9 / (1.0 + i as f64);
            let phase = (i as f64 * 37.0 - 120.0 + j as f64 * 15.0).to_radians();
            Complex64::from_polar(if j == 0 { mag } else { 1.0 - mag }, phase)
        });
        (axis, data)
    }
    #[test]
    fn header_and_row_layout() {
        let axis = FrequencyAxis::linear(1e6, 2e6, 2);
        let data = Array2::from_shape_fn((2, 2), |(_, j)| {
            Complex64::new(if j == 0 { 0.5 } else { 0.25 }, 0.0)
        });
        let text = write(&axis, &data, DataFormat::MA, false, FrequencyUnit::MHz).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("# MHz S MA R 50"));
        let row: Vec<&str> = lines.next().unwrap().split_whitespace().collect();
        assert_eq!(row, vec!["1", "0.5", "0.000000", "0.25", "0.000000", "0.25", "0.000000", "0.5", "0.000000"]);
        let one = write(&axis, &data, DataFormat::DB, true, FrequencyUnit::GHz).unwrap();
        let row: Vec<&str> = one.lines().nth(1).unwrap().split_whitespace().collect();
        assert_eq!(row, vec!["0.001", "-6.020600", "0.000000"]);
    }
    #[test]
    fn round_trips_every_format_and_port_count() {
        let (axis, data) = sample();
        for format in [DataFormat::MA, DataFormat::DB, DataFormat::RI] {
            for one_port in [true, false] {
                for unit in [FrequencyUnit::Hz, FrequencyUnit::MHz, FrequencyUnit::GHz] {
                    let text = write(&axis, &data, format, one_port, unit).unwrap();
                    let network = read(&text).unwrap();
                    assert_eq!(network.ports(), if one_port { 1 } else { 2 });
                    for (a, b) in network.frequencies.iter().zip(axis.values()) {
                        assert!((a - b).abs() < 0.1, "{format} {unit}: {a} vs {b}");
                    }
                    let forward = network.forward();
                    for i in 0..axis.len() {
                        for j in 0..forward.ncols() {
                            let err = (forward[[i, j]] - data[[i, j]]).norm();
                            assert!(err < 1e-6, "{format} one_port={one_port}: {err}");
                        }
                    }
                }
            }
        }
    }
    #[test]
    fn two_port_blocks_are_transposed_to_row_major() {
        let text = "# Hz S RI R 50\n1000 1 0 2 0 3 0 4 0\n";
        let network = read(text).unwrap();
        assert_eq!(network.s[[0, 0, 0]], Complex64::new(1.0, 0.0));
        assert_eq!(network.s[[0, 1, 0]], Complex64::new(2.0, 0.0));
        assert_eq!(network.s[[0, 0, 1]], Complex64::new(3.0, 0.0));
        assert_eq!(network.s[[0, 1, 1]], Complex64::new(4.0, 0.0));
    }
    #[test]
    fn continuation_lines_and_comments() {
        let text = "! three-port\n# kHz S RI R 50\n\
                    10 1 0 2 0 3 0 ! first row\n\
                    \t4 0 5 0 6 0\n   7 0 8 0 9 0\n";
        let network = read(text).unwrap();
        assert_eq!(network.ports(), 3);
        assert_eq!(network.frequencies, vec![10e3]);
        assert_eq!(network.s[[0, 0, 2]], Complex64::new(3.0, 0.0));
        assert_eq!(network.s[[0, 1, 0]], Complex64::new(4.0, 0.0));
        assert_eq!(network.s[[0, 2, 2]], Complex64::new(9.0, 0.0));
    }
    #[test]
    fn missing_header_uses_touchstone_defaults() {
        let network = read("1.5 0.5 90\n").unwrap();
        assert_eq!(network.header, Header::default());
        assert_eq!(network.frequencies, vec![1.5e9]);
        assert!((network.s[[0, 0, 0]] - Complex64::new(0.0, 0.5)).norm() < 1e-12);
    }
    #[test]
    fn unsupported_headers_are_rejected() {
        for header in ["# MHz S MA R 75", "# MHz Z MA R 50", "# THz S MA R 50", "# MHz S MA R"] {
            let text = format!("{header}\n1 0.5 0\n");
            assert!(
                matches!(read(&text), Err(NanoVnaError::InvalidTouchstoneHeader(_))),
                "{header}"
            );
        }
    }
    #[test]
    fn malformed_rows_report_their_line() {
        let err = read("# MHz S MA R 50\n1 0.5 0\n2 0.5\n").unwrap_err();
        assert!(matches!(err, NanoVnaError::InvalidTouchstoneData { line: 3, .. }));
        let err = read("# MHz S MA R 50\n1 0.5 zero\n").unwrap_err();
        assert!(matches!(err, NanoVnaError::InvalidTouchstoneData { line: 2, .. }));
    }
    #[test]
    fn writer_checks_shapes() {
        let axis = FrequencyAxis::linear(1e6, 2e6, 3);
        let data = Array2::zeros((2, 2));
        assert!(write(&axis, &data, DataFormat::RI, false, FrequencyUnit::MHz).is_err());
    }
    #[test]
    fn general_format_matches_printf_g() {
        assert_eq!(general(1.0, 6), "1");
        assert_eq!(general(0.5, 6), "0.5");
        assert_eq!(general(1234.5678, 6), "1234.57");
        assert_eq!(general(1.5e-7, 6), "1.5e-7");
        assert_eq!(general(2.5e12, 6), "2.5e12");
        assert_eq!(general(0.0, 6), "0");
    }
}
