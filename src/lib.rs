//! joycon-bridge: Nintendo Joy-Con driver over HID
//!
//! This library opens a Joy-Con through a raw HID transport, negotiates its
//! report mode, reads calibration from the controller's SPI flash and decodes
//! input reports into calibrated button, stick and motion state.

pub mod config;
pub mod joycon;

// Re-export commonly used items
pub use config::Config;
pub use joycon::{
    Accelerometer, Buttons, ControllerState, Gyroscope, Hand, JoyCon, JoyConError, LedState,
    MockTransport, SessionOptions, Stick, Transport, TransportError,
};
