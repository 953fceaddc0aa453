//! Joy-Con protocol constants
//!
//! This module contains all the constants needed for Joy-Con communication:
//! - USB/HID identifiers
//! - Protocol commands and subcommands
//! - SPI flash memory addresses
//! - Input report IDs and timing

// ============================================================================
// HID Discovery Constants
// ============================================================================

/// Nintendo Co., Ltd. USB vendor ID
pub const JOYCON_VENDOR_ID: u16 = 0x057E;

/// Product ID of the left Joy-Con
pub const JOYCON_L_PRODUCT_ID: u16 = 0x2006;

/// Product ID of the right Joy-Con
pub const JOYCON_R_PRODUCT_ID: u16 = 0x2007;

// ============================================================================
// Commands & Subcommands
// ============================================================================

/// Output report that carries rumble data followed by a subcommand
pub const COMMAND_START_SUBCOMMAND: u8 = 0x01;

/// Changes the input report mode
pub const SUBCOMMAND_REPORT_MODE: u8 = 0x03;
/// Standard full mode: buttons, sticks and IMU at 60Hz
pub const SUBCOMMAND_OPTION_REPORT_MODE_FULL: u8 = 0x30;
/// NFC/IR mode: large packets at 60Hz
pub const SUBCOMMAND_OPTION_REPORT_MODE_NFC: u8 = 0x31;
/// Simple HID mode: button events only
pub const SUBCOMMAND_OPTION_REPORT_MODE_SIMPLE_HID: u8 = 0x3F;

/// Enables/disables the rumble motors
pub const SUBCOMMAND_RUMBLE_CONTROL: u8 = 0x48;
pub const SUBCOMMAND_OPTION_RUMBLE_ENABLE: u8 = 0x01;

/// Enables/disables the 6-axis sensor
pub const SUBCOMMAND_IMU_CONTROL: u8 = 0x40;
pub const SUBCOMMAND_OPTION_IMU_ENABLE: u8 = 0x01;

/// Sets the player indicator LEDs (one byte, see [`crate::joycon::protocol::led_sequence`])
pub const SUBCOMMAND_SET_PLAYER_LED: u8 = 0x30;

/// Reads SPI flash. Parameters are offset (u32 LE) and size (u8)
pub const SUBCOMMAND_SPI_READ: u8 = 0x10;

/// Fixed prefix required in front of every command sent over USB
pub const USB_COMMAND_PREFIX: [u8; 8] = [0x80, 0x92, 0x00, 0x31, 0x00, 0x00, 0x00, 0x00];

/// Neutral rumble data for both motors. Byte 0 is replaced by the packet counter.
pub const RUMBLE_NEUTRAL: [u8; 9] = [0x00, 0x00, 0x01, 0x40, 0x40, 0x00, 0x01, 0x40, 0x40];

// ============================================================================
// Input Report Types
// ============================================================================

/// Buttons, sticks and a subcommand reply
pub const PACKET_TYPE_STANDARD: u8 = 0x21;
/// Buttons, sticks and three IMU samples
pub const PACKET_TYPE_BUTTONS_AND_IMU: u8 = 0x30;
/// Same as 0x30 followed by NFC/IR data
pub const PACKET_TYPE_NFC: u8 = 0x31;

// ============================================================================
// SPI Flash Memory Addresses
// ============================================================================

pub const FACTORY_CALIBRATION_SENSORS_OFFSET: u32 = 0x6020;
pub const FACTORY_CALIBRATION_LEFT_STICK_OFFSET: u32 = 0x603D;
pub const FACTORY_CALIBRATION_RIGHT_STICK_OFFSET: u32 = 0x6046;

pub const USER_CALIBRATION_LEFT_STICK_OFFSET: u32 = 0x8012;
pub const USER_CALIBRATION_RIGHT_STICK_OFFSET: u32 = 0x801D;
pub const USER_CALIBRATION_SENSORS_OFFSET: u32 = 0x8028;

/// Stored (little-endian) right before a user calibration block when it exists
pub const USER_CALIBRATION_MAGIC: u16 = 0xA1B2;

/// Size of one packed stick calibration block
pub const STICK_CALIBRATION_DATA_SIZE: u8 = 9;

// ============================================================================
// Timing Constants
// ============================================================================

/// How long a single poll read may block before the device is considered gone (milliseconds)
pub const POLL_TIMEOUT_MS: i32 = 5000;

/// How long to wait for each report while looking for a subcommand reply (milliseconds)
pub const SUBCOMMAND_REPLY_TIMEOUT_MS: i32 = 500;

/// Number of unrelated reports tolerated before giving up on a subcommand reply
pub const SUBCOMMAND_REPLY_ATTEMPTS: usize = 100;
