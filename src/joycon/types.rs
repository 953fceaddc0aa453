//! Joy-Con type definitions
//!
//! This module defines the basic data types exposed by a session,
//! including input states, sensor data, and button states.

use serde::{Deserialize, Serialize};

use super::report::InputReportHeader;
use packed_struct::prelude::*;

/// Analog stick state (normalized -1.0 to 1.0)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Stick {
    /// Horizontal axis (-1.0 = left, 1.0 = right)
    pub x: f32,

    /// Vertical axis (-1.0 = down, 1.0 = up)
    pub y: f32,
}

/// Calibrated 3-axis sensor reading
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ThreeAxes {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Angular velocity in radians per second
pub type Gyroscope = ThreeAxes;

/// Linear acceleration in m/s²
pub type Accelerometer = ThreeAxes;

/// Which controller a session most likely talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Hand {
    #[default]
    None,
    Left,
    Right,
}

/// How the controller is attached. Only Bluetooth needs no command prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    #[default]
    Bluetooth,
    Usb,
}

impl ConnectionType {
    pub fn is_bluetooth(self) -> bool {
        self == ConnectionType::Bluetooth
    }
}

/// State of every button on either Joy-Con
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Buttons {
    // Right Joy-Con
    pub a: bool,
    pub b: bool,
    pub x: bool,
    pub y: bool,
    pub r: bool,
    pub zr: bool,
    pub right_stick: bool,
    pub plus: bool,
    pub home: bool,
    pub sr_right: bool,
    pub sl_right: bool,

    // Left Joy-Con
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub l: bool,
    pub zl: bool,
    pub left_stick: bool,
    pub minus: bool,
    pub capture: bool,
    pub sr_left: bool,
    pub sl_left: bool,
}

impl From<&InputReportHeader> for Buttons {
    fn from(header: &InputReportHeader) -> Self {
        let right = &header.buttons_right;
        let shared = &header.buttons_shared;
        let left = &header.buttons_left;

        Self {
            a: right.a,
            b: right.b,
            x: right.x,
            y: right.y,
            r: right.r,
            zr: right.zr,
            right_stick: shared.right_stick,
            plus: shared.plus,
            home: shared.home,
            sr_right: right.sr,
            sl_right: right.sl,
            up: left.up,
            down: left.down,
            left: left.left,
            right: left.right,
            l: left.l,
            zl: left.zl,
            left_stick: shared.left_stick,
            minus: shared.minus,
            capture: shared.capture,
            sr_left: left.sr,
            sl_left: left.sl,
        }
    }
}

/// Battery and connection details from the last input report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatteryStatus {
    /// 0=empty, 1=critical, 2=low, 3=medium, 4=full
    pub level: u8,
    pub charging: bool,
    /// Raw connection info nibble
    pub connection_info: u8,
}

impl From<&InputReportHeader> for BatteryStatus {
    fn from(header: &InputReportHeader) -> Self {
        Self {
            level: header.info.battery_level.to_primitive(),
            charging: header.info.charging,
            connection_info: header.info.connection_info.to_primitive(),
        }
    }
}

/// Snapshot of everything a session knows about its controller
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ControllerState {
    pub hand: Hand,
    pub buttons: Buttons,
    pub left_stick: Stick,
    pub right_stick: Stick,
    pub accelerometer: Accelerometer,
    pub gyroscope: Gyroscope,
    pub battery: BatteryStatus,
}
