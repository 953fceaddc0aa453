//! Joy-Con controller support
//!
//! This module provides complete Joy-Con integration including:
//! - HID transport and device discovery
//! - Protocol framing and the subcommand handshake
//! - Calibration and input decoding

pub mod buffer;
pub mod calibration;
pub mod connection;
pub mod constants;
pub mod controller;
pub mod error;
pub mod mock_transport;
pub mod protocol;
pub mod report;
pub mod transport;
pub mod types;

// Re-export commonly used items
pub use calibration::{CalibrationData, DeadZone};
pub use connection::{open, open_left, open_right};
pub use controller::{JoyCon, SessionOptions};
pub use error::JoyConError;
pub use mock_transport::MockTransport;
pub use protocol::LedState;
pub use transport::{Transport, TransportError};
pub use types::*;
