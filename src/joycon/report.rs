//! Joy-Con HID report layouts
//!
//! Sources:
//! - https://github.com/dekuNukem/Nintendo_Switch_Reverse_Engineering/blob/master/bluetooth_hid_notes.md
//! - https://github.com/torvalds/linux/blob/master/drivers/hid/hid-nintendo.c
//!
//! All layouts use `msb0` bit numbering, so within a single byte bit "7" is
//! the least significant bit as it arrives on the wire.
use packed_struct::prelude::*;

use super::buffer::{append, WireValue};

/// Size of every input report this driver consumes (0x31)
pub const INPUT_REPORT_SIZE: usize = 49;
/// Size of the header shared by all input reports
pub const INPUT_REPORT_HEADER_SIZE: usize = 13;
/// Size of the data carried by a subcommand reply
pub const SUBCOMMAND_REPLY_DATA_SIZE: usize = 34;
/// Size of one raw 6-axis sample
pub const IMU_SAMPLE_SIZE: usize = 12;
/// Size of the SPI read parameters
pub const SPI_READ_PARAMETERS_SIZE: usize = 5;

#[derive(PackedStruct, Debug, Copy, Clone, PartialEq, Default)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "1")]
pub struct BatteryConnection {
    /// Battery level. 4=full, 3=medium, 2=low, 1=critical, 0=empty.
    #[packed_field(bits = "0..=2")]
    pub battery_level: Integer<u8, packed_bits::Bits<3>>,
    #[packed_field(bits = "3")]
    pub charging: bool,
    /// Connection info. (con_info >> 1) & 3 - 3=JC, 0=Pro/ChrGrip.
    /// con_info & 1 - 1=Switch/USB powered.
    #[packed_field(bits = "4..=7")]
    pub connection_info: Integer<u8, packed_bits::Bits<4>>,
}

#[derive(PackedStruct, Debug, Copy, Clone, PartialEq, Default)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "1")]
pub struct ButtonStatusRight {
    #[packed_field(bits = "7")]
    pub y: bool,
    #[packed_field(bits = "6")]
    pub x: bool,
    #[packed_field(bits = "5")]
    pub b: bool,
    #[packed_field(bits = "4")]
    pub a: bool,
    #[packed_field(bits = "3")]
    pub sr: bool,
    #[packed_field(bits = "2")]
    pub sl: bool,
    #[packed_field(bits = "1")]
    pub r: bool,
    #[packed_field(bits = "0")]
    pub zr: bool,
}

#[derive(PackedStruct, Debug, Copy, Clone, PartialEq, Default)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "1")]
pub struct ButtonStatusShared {
    #[packed_field(bits = "7")]
    pub minus: bool,
    #[packed_field(bits = "6")]
    pub plus: bool,
    #[packed_field(bits = "5")]
    pub right_stick: bool,
    #[packed_field(bits = "4")]
    pub left_stick: bool,
    #[packed_field(bits = "3")]
    pub home: bool,
    #[packed_field(bits = "2")]
    pub capture: bool,
    #[packed_field(bits = "1")]
    pub _unused: bool,
    #[packed_field(bits = "0")]
    pub charging_grip: bool,
}

#[derive(PackedStruct, Debug, Copy, Clone, PartialEq, Default)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "1")]
pub struct ButtonStatusLeft {
    #[packed_field(bits = "7")]
    pub down: bool,
    #[packed_field(bits = "6")]
    pub up: bool,
    #[packed_field(bits = "5")]
    pub right: bool,
    #[packed_field(bits = "4")]
    pub left: bool,
    #[packed_field(bits = "3")]
    pub sr: bool,
    #[packed_field(bits = "2")]
    pub sl: bool,
    #[packed_field(bits = "1")]
    pub l: bool,
    #[packed_field(bits = "0")]
    pub zl: bool,
}

/// Header shared by every input report.
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq, Default)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "13")]
pub struct InputReportHeader {
    /// Input report ID
    #[packed_field(bytes = "0")]
    pub id: u8,
    /// Timer. Increments very fast. Can be used to estimate excess Bluetooth latency.
    #[packed_field(bytes = "1")]
    pub timer: u8,
    #[packed_field(bytes = "2")]
    pub info: BatteryConnection,
    #[packed_field(bytes = "3")]
    pub buttons_right: ButtonStatusRight,
    #[packed_field(bytes = "4")]
    pub buttons_shared: ButtonStatusShared,
    #[packed_field(bytes = "5")]
    pub buttons_left: ButtonStatusLeft,
    /// Packed 12-bit X/Y, see [`super::protocol::decode_analog_stick`]
    #[packed_field(bytes = "6..=8")]
    pub left_stick: [u8; 3],
    #[packed_field(bytes = "9..=11")]
    pub right_stick: [u8; 3],
    /// Vibrator input report. Decides if next vibration pattern should be sent.
    #[packed_field(bytes = "12")]
    pub rumble: u8,
}

#[derive(PackedStruct, Debug, Copy, Clone, PartialEq, Default)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "1")]
pub struct SubcommandAck {
    /// Set when the device acknowledged the subcommand
    #[packed_field(bits = "0")]
    pub ack: bool,
    /// Type of the data that follows. 0 means a plain ACK without data.
    #[packed_field(bits = "1..=7")]
    pub data_type: Integer<u8, packed_bits::Bits<7>>,
}

/// Input report 0x21: state plus a reply to a subcommand.
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "49")]
pub struct StandardInputReport {
    #[packed_field(bytes = "0..=12")]
    pub header: InputReportHeader,
    #[packed_field(bytes = "13")]
    pub reply: SubcommandAck,
    #[packed_field(bytes = "14")]
    pub reply_to_subcommand_id: u8,
    #[packed_field(bytes = "15..=48")]
    pub data: [u8; 34],
}

impl Default for StandardInputReport {
    fn default() -> Self {
        Self {
            header: Default::default(),
            reply: Default::default(),
            reply_to_subcommand_id: 0,
            data: [0; SUBCOMMAND_REPLY_DATA_SIZE],
        }
    }
}

/// Raw 6-axis data without any calibration or scaling.
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq, Default)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "12")]
pub struct ImuSample {
    #[packed_field(bytes = "0..=1", endian = "lsb")]
    pub accel_x: Integer<i16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "2..=3", endian = "lsb")]
    pub accel_y: Integer<i16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "4..=5", endian = "lsb")]
    pub accel_z: Integer<i16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "6..=7", endian = "lsb")]
    pub gyro_x: Integer<i16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "8..=9", endian = "lsb")]
    pub gyro_y: Integer<i16, packed_bits::Bits<16>>,
    #[packed_field(bytes = "10..=11", endian = "lsb")]
    pub gyro_z: Integer<i16, packed_bits::Bits<16>>,
}

impl ImuSample {
    pub fn new(accel: [i16; 3], gyro: [i16; 3]) -> Self {
        Self {
            accel_x: Integer::from_primitive(accel[0]),
            accel_y: Integer::from_primitive(accel[1]),
            accel_z: Integer::from_primitive(accel[2]),
            gyro_x: Integer::from_primitive(gyro[0]),
            gyro_y: Integer::from_primitive(gyro[1]),
            gyro_z: Integer::from_primitive(gyro[2]),
        }
    }

    pub fn accel(&self) -> [i16; 3] {
        [
            self.accel_x.to_primitive(),
            self.accel_y.to_primitive(),
            self.accel_z.to_primitive(),
        ]
    }

    pub fn gyro(&self) -> [i16; 3] {
        [
            self.gyro_x.to_primitive(),
            self.gyro_y.to_primitive(),
            self.gyro_z.to_primitive(),
        ]
    }
}

/// Input reports 0x30 and 0x31: state plus three IMU samples.
///
/// The 6-axis data is repeated 3 times. On Joy-Con with a 15ms packet push,
/// this is translated to 5ms difference sampling. Only the first sample is
/// consumed by the driver.
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq, Default)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "49")]
pub struct StandardFullInputReport {
    #[packed_field(bytes = "0..=12")]
    pub header: InputReportHeader,
    #[packed_field(bytes = "13..=48", element_size_bytes = "12")]
    pub imu: [ImuSample; 3],
}

/// Parameters of the SPI read subcommand.
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq, Default)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "5")]
pub struct SpiReadCommandParameters {
    #[packed_field(bytes = "0..=3", endian = "lsb")]
    pub offset: u32,
    #[packed_field(bytes = "4")]
    pub size: u8,
}

impl WireValue for SpiReadCommandParameters {
    fn append_to(&self, buffer: &mut Vec<u8>) {
        append(buffer, &self.offset);
        append(buffer, &self.size);
    }
}

const _: () = assert!(
    INPUT_REPORT_HEADER_SIZE + 1 + 1 + SUBCOMMAND_REPLY_DATA_SIZE == 0x31,
    "standard reports can't be parsed"
);
const _: () = assert!(
    INPUT_REPORT_HEADER_SIZE + 3 * IMU_SAMPLE_SIZE == 0x31,
    "standard full reports can't be parsed"
);
const _: () = assert!(INPUT_REPORT_SIZE == 0x31);
const _: () = assert!(SPI_READ_PARAMETERS_SIZE == 4 + 1, "SPI read can't be called");
