//! Stick and motion sensor calibration
//!
//! Calibration constants are read once from SPI flash when a session starts.
//! The stick shaping follows Ryan Juckett's "Interpreting Analog Sticks"
//! (http://blog.hypersect.com/interpreting-analog-sticks/) with the dead zones
//! used by CTCaer/jc_toolkit.

use log::warn;
use packed_struct::prelude::*;
use serde::{Deserialize, Serialize};

use super::types::{Stick, ThreeAxes};

/// Local gravity used to convert accelerometer units (m/s²)
const GRAVITY: f32 = 9.8;
/// The accelerometer calibration covers ±4G
const ACCELEROMETER_SCALE: f32 = 4.0 * GRAVITY;
/// Gyroscope calibration is expressed in degrees per second
const GYROSCOPE_SCALE: f32 = std::f32::consts::PI / 180.0;

/// Raw sticks report nothing inside this radius
pub const DEFAULT_INNER_DEAD_ZONE: f32 = 0.15;
/// Raw sticks saturate this far from the edge
pub const DEFAULT_OUTER_DEAD_ZONE: f32 = 0.10;

/// Size of one [`ThreeAxisCalibration`] record in SPI flash
pub const SENSOR_CALIBRATION_RECORD_SIZE: u8 = 12;
/// Accelerometer record followed by the gyroscope record
pub const SENSOR_CALIBRATION_DATA_SIZE: u8 = 2 * SENSOR_CALIBRATION_RECORD_SIZE;

/// Calibration of a single stick axis, in raw 12-bit units.
///
/// Always satisfies `min_below_center <= center <= max_above_center`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AxisCalibration {
    pub center: u16,
    pub max_above_center: u16,
    pub min_below_center: u16,
}

impl AxisCalibration {
    pub fn new(center: u16, max_offset: u16, min_offset: u16) -> Self {
        Self {
            center,
            max_above_center: center.saturating_add(max_offset),
            min_below_center: center.saturating_sub(min_offset),
        }
    }

    /// Map a raw value to [-1, 1] relative to the calibrated center.
    pub fn normalize(&self, raw: u16) -> f32 {
        let clamped = raw.clamp(self.min_below_center, self.max_above_center);
        let center = self.center as f32;

        if clamped >= self.center {
            let range = self.max_above_center as f32 - center;
            if range == 0.0 {
                return 0.0;
            }
            (clamped as f32 - center) / range
        } else {
            let range = self.min_below_center as f32 - center;
            if range == 0.0 {
                return 0.0;
            }
            -((clamped as f32 - center) / range)
        }
    }
}

/// Calibration of both axes of one stick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StickCalibration {
    pub x: AxisCalibration,
    pub y: AxisCalibration,
}

impl StickCalibration {
    /// Left stick slots: `[x_max, y_max, x_center, y_center, x_min, y_min]`
    pub fn from_left_raw(raw: [u16; 6]) -> Self {
        Self {
            x: AxisCalibration::new(raw[2], raw[0], raw[4]),
            y: AxisCalibration::new(raw[3], raw[1], raw[5]),
        }
    }

    /// Right stick slots: `[x_center, y_center, x_min, y_min, x_max, y_max]`
    pub fn from_right_raw(raw: [u16; 6]) -> Self {
        Self {
            x: AxisCalibration::new(raw[0], raw[4], raw[2]),
            y: AxisCalibration::new(raw[1], raw[5], raw[3]),
        }
    }
}

/// Neutral position and sensitivity of a 3-axis sensor as stored in SPI flash.
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq, Default)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "12")]
pub struct ThreeAxisCalibration {
    #[packed_field(bytes = "0..=1", endian = "lsb")]
    pub neutral_x: Integer<i16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "2..=3", endian = "lsb")]
    pub neutral_y: Integer<i16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "4..=5", endian = "lsb")]
    pub neutral_z: Integer<i16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "6..=7", endian = "lsb")]
    pub sensitivity_x: Integer<i16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "8..=9", endian = "lsb")]
    pub sensitivity_y: Integer<i16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "10..=11", endian = "lsb")]
    pub sensitivity_z: Integer<i16, packed_bits::Bits<16>>,
}

const _: () = assert!(SENSOR_CALIBRATION_RECORD_SIZE as usize == 6 * std::mem::size_of::<i16>());

impl ThreeAxisCalibration {
    pub fn new(neutral: [i16; 3], sensitivity_offset: [i16; 3]) -> Self {
        Self {
            neutral_x: Integer::from_primitive(neutral[0]),
            neutral_y: Integer::from_primitive(neutral[1]),
            neutral_z: Integer::from_primitive(neutral[2]),
            sensitivity_x: Integer::from_primitive(sensitivity_offset[0]),
            sensitivity_y: Integer::from_primitive(sensitivity_offset[1]),
            sensitivity_z: Integer::from_primitive(sensitivity_offset[2]),
        }
    }

    /// Per-axis linear coefficient: `1 / (sensitivity - neutral) * scale`
    pub fn coefficients(&self, scale: f32) -> Coefficients {
        let axis = |neutral: i16, sensitivity: i16| {
            let span = sensitivity as i32 - neutral as i32;
            if span == 0 {
                warn!("Sensor calibration has no span, axis will read 0");
                return 0.0;
            }
            1.0 / span as f32 * scale
        };

        Coefficients {
            x: axis(self.neutral_x.to_primitive(), self.sensitivity_x.to_primitive()),
            y: axis(self.neutral_y.to_primitive(), self.sensitivity_y.to_primitive()),
            z: axis(self.neutral_z.to_primitive(), self.sensitivity_z.to_primitive()),
        }
    }
}

/// Linear scale applied to raw sensor samples
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coefficients {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Coefficients {
    pub fn apply(&self, raw: [i16; 3]) -> ThreeAxes {
        ThreeAxes {
            x: raw[0] as f32 * self.x,
            y: raw[1] as f32 * self.y,
            z: raw[2] as f32 * self.z,
        }
    }
}

/// Everything needed to turn raw reports into calibrated values
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CalibrationData {
    pub left_stick: StickCalibration,
    pub right_stick: StickCalibration,
    pub accelerometer: Coefficients,
    pub gyroscope: Coefficients,
}

impl CalibrationData {
    pub fn new(
        left_stick: StickCalibration,
        right_stick: StickCalibration,
        accelerometer: &ThreeAxisCalibration,
        gyroscope: &ThreeAxisCalibration,
    ) -> Self {
        Self {
            left_stick,
            right_stick,
            accelerometer: accelerometer.coefficients(ACCELEROMETER_SCALE),
            gyroscope: gyroscope.coefficients(GYROSCOPE_SCALE),
        }
    }
}

/// Radial dead zones applied after per-axis normalisation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeadZone {
    pub inner: f32,
    pub outer: f32,
}

impl Default for DeadZone {
    fn default() -> Self {
        Self {
            inner: DEFAULT_INNER_DEAD_ZONE,
            outer: DEFAULT_OUTER_DEAD_ZONE,
        }
    }
}

impl DeadZone {
    /// Rescale a normalised vector so `[inner, 1 - outer]` maps onto `[0, 1]`.
    pub fn apply(&self, x: f32, y: f32) -> Stick {
        let magnitude_sq = x * x + y * y;
        if magnitude_sq <= self.inner * self.inner {
            return Stick::default();
        }

        let magnitude = magnitude_sq.sqrt();
        let legal_range = 1.0 - self.outer - self.inner;
        let scaled = ((magnitude - self.inner) / legal_range).min(1.0);
        let scale = scaled / magnitude;

        Stick {
            x: x * scale,
            y: y * scale,
        }
    }
}

/// Calibrated value of a stick from its raw (horizontal, vertical) reading.
pub fn calibrated_stick(
    raw: [u16; 2],
    calibration: &StickCalibration,
    dead_zone: &DeadZone,
) -> Stick {
    let x = calibration.x.normalize(raw[0]);
    let y = calibration.y.normalize(raw[1]);
    dead_zone.apply(x, y)
}

/// An all-zero reading is sent while the link hiccups and carries no data.
pub fn is_raw_stick_valid(raw: [u16; 2]) -> bool {
    raw != [0, 0]
}
