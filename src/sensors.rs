//! Raw 9-axis sample handling: axis labels, the sensor line protocol,
//! and normalization into the canonical body-frame vector.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{TrackerError, TrackerResult};

/// Raw axis label as delivered by the sensor firmware.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Axis {
    Ax,
    Ay,
    Az,
    Gx,
    Gy,
    Gz,
    Mx,
    My,
    Mz,
}

impl Axis {
    pub const ALL: [Axis; 9] = [
        Axis::Ax,
        Axis::Ay,
        Axis::Az,
        Axis::Gx,
        Axis::Gy,
        Axis::Gz,
        Axis::Mx,
        Axis::My,
        Axis::Mz,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Axis::Ax => "AX",
            Axis::Ay => "AY",
            Axis::Az => "AZ",
            Axis::Gx => "GX",
            Axis::Gy => "GY",
            Axis::Gz => "GZ",
            Axis::Mx => "MX",
            Axis::My => "MY",
            Axis::Mz => "MZ",
        }
    }

    pub fn from_label(label: &str) -> Option<Axis> {
        Axis::ALL.into_iter().find(|axis| axis.label() == label)
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Axis {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Axis::from_label(s).ok_or_else(|| TrackerError::Parse(format!("unknown axis label {s:?}")))
    }
}

/// One channel's readings for one instant, keyed by axis label.
///
/// Accel in sensor units, gyro in deg/s, mag in arbitrary consistent units.
/// Any axis may be absent.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    #[serde(rename = "Battery", default, skip_serializing_if = "Option::is_none")]
    pub battery_percent: Option<u8>,
    #[serde(flatten)]
    pub readings: BTreeMap<String, f64>,
}

impl RawSample {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a complete sample from accel, gyro (deg/s) and mag triples.
    pub fn from_axes(accel: [f64; 3], gyro_dps: [f64; 3], mag: [f64; 3]) -> Self {
        let mut sample = Self::new();
        let values = accel.into_iter().chain(gyro_dps).chain(mag);
        for (axis, value) in Axis::ALL.into_iter().zip(values) {
            sample.set(axis, value);
        }
        sample
    }

    pub fn set(&mut self, axis: Axis, value: f64) {
        self.readings.insert(axis.label().to_string(), value);
    }

    pub fn with(mut self, axis: Axis, value: f64) -> Self {
        self.set(axis, value);
        self
    }

    pub fn without(mut self, axis: Axis) -> Self {
        self.readings.remove(axis.label());
        self
    }

    pub fn get(&self, axis: Axis) -> Option<f64> {
        self.readings.get(axis.label()).copied()
    }

    fn require(&self, axis: Axis) -> TrackerResult<f64> {
        self.get(axis).ok_or(TrackerError::MissingAxis { axis })
    }
}

/// Canonical 9-element vector:
/// `[AZ, AY, AX, GZ, GY, GX, MX, MY, MZ]`, gyro in rad/s.
///
/// The accel/gyro triples are stored reversed; `vectors()` undoes that.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CanonicalSample(pub [f64; 9]);

/// Body-frame vectors split out of a canonical sample.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImuVectors {
    pub accel: Vector3<f64>,
    /// rad/s
    pub gyro: Vector3<f64>,
    pub mag: Vector3<f64>,
}

impl CanonicalSample {
    pub fn vectors(&self) -> ImuVectors {
        let c = &self.0;
        ImuVectors {
            accel: Vector3::new(c[2], c[1], c[0]),
            gyro: Vector3::new(c[5], c[4], c[3]),
            mag: Vector3::new(c[6], c[7], c[8]),
        }
    }
}

/// Normalize a raw mapping into the canonical vector.
///
/// Fails with `MissingAxis` naming the first absent field (in canonical order).
/// Pure: the same input always yields the same output.
pub fn normalize(raw: &RawSample) -> TrackerResult<CanonicalSample> {
    Ok(CanonicalSample([
        raw.require(Axis::Az)?,
        raw.require(Axis::Ay)?,
        raw.require(Axis::Ax)?,
        raw.require(Axis::Gz)?.to_radians(),
        raw.require(Axis::Gy)?.to_radians(),
        raw.require(Axis::Gx)?.to_radians(),
        raw.require(Axis::Mx)?,
        raw.require(Axis::My)?,
        raw.require(Axis::Mz)?,
    ]))
}

/// Parse a firmware line such as
/// `AX:0.10AY:0.20AZ:9.80GX:0.01GY:0.02GZ:0.03MX:0.50MY:0.60MZ:0.70Battery:85%`.
///
/// Unknown labels are ignored and absent axes stay absent.
pub fn parse_imu_string(line: &str) -> RawSample {
    let mut sample = RawSample::new();
    let bytes = line.as_bytes();
    let mut i = 0;

    while i + 2 < bytes.len() {
        if bytes[i].is_ascii_uppercase() && bytes[i + 1].is_ascii_uppercase() && bytes[i + 2] == b':' {
            let consumed = scan_decimal(&line[i + 3..]);
            if consumed > 0 {
                let value = line[i + 3..i + 3 + consumed].parse::<f64>().ok();
                if let (Some(axis), Some(value)) = (Axis::from_label(&line[i..i + 2]), value) {
                    sample.set(axis, value);
                }
            }
            i += 3 + consumed;
            continue;
        }
        i += 1;
    }

    sample.battery_percent = parse_battery(line);
    sample
}

/// Length of a leading `-?\d+(\.\d+)?` match, or 0.
fn scan_decimal(s: &str) -> usize {
    let bytes = s.as_bytes();
    let mut end = 0;
    if bytes.first() == Some(&b'-') {
        end += 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end == int_start {
        return 0;
    }
    if end + 1 < bytes.len() && bytes[end] == b'.' && bytes[end + 1].is_ascii_digit() {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
    }
    end
}

fn parse_battery(line: &str) -> Option<u8> {
    let rest = &line[line.find("Battery:")? + "Battery:".len()..];
    let rest = rest.trim_start();
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() || !rest[digits.len()..].starts_with('%') {
        return None;
    }
    digits.parse().ok()
}

/// `"MM:SS"` or plain seconds to seconds. `"-"` and blanks are `None`.
pub fn parse_timestamp(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() || text == "-" {
        return None;
    }
    match text.split_once(':') {
        Some((minutes, seconds)) => {
            let minutes: u32 = minutes.trim().parse().ok()?;
            let seconds: f64 = seconds.trim().parse().ok()?;
            Some(f64::from(minutes) * 60.0 + seconds)
        }
        None => text.parse().ok(),
    }
}

/// Seconds to zero-padded `MM:SS`.
pub fn format_timestamp(seconds: f64) -> String {
    let whole = seconds.max(0.0).floor() as u64;
    format!("{:02}:{:02}", whole / 60, whole % 60)
}
