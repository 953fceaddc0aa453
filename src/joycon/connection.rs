//! Joy-Con discovery over hidapi
//!
//! Opens the OS device for a controller and hands it to a new session with
//! the matching hand hint.

use std::ffi::CString;

use hidapi::HidDevice;
use log::info;

use super::constants::{JOYCON_L_PRODUCT_ID, JOYCON_R_PRODUCT_ID, JOYCON_VENDOR_ID};
use super::controller::{JoyCon, SessionOptions};
use super::error::Result;
use super::transport::{open_device, open_device_with_serial, open_path, TransportError};
use super::types::Hand;

/// Product id of the given controller, `None` when the hand is unknown.
pub fn product_id(hand: Hand) -> Option<u16> {
    match hand {
        Hand::Left => Some(JOYCON_L_PRODUCT_ID),
        Hand::Right => Some(JOYCON_R_PRODUCT_ID),
        Hand::None => None,
    }
}

/// Open the HID device of a controller.
///
/// `path` takes precedence over `serial`; without either the first device
/// with the hand's product id is used.
pub fn open_hid(
    hand: Hand,
    path: Option<&str>,
    serial: Option<&str>,
) -> std::result::Result<HidDevice, TransportError> {
    if let Some(path) = path {
        let path = CString::new(path).map_err(|e| TransportError::Open(e.to_string()))?;
        return open_path(&path);
    }

    let product_id = product_id(hand).ok_or_else(|| {
        TransportError::Open("a path is required when the hand is unknown".to_string())
    })?;

    match serial {
        Some(serial) => open_device_with_serial(JOYCON_VENDOR_ID, product_id, serial),
        None => open_device(JOYCON_VENDOR_ID, product_id),
    }
}

/// Open a session on a controller with explicit options.
pub fn open(
    hand: Hand,
    path: Option<&str>,
    serial: Option<&str>,
    options: SessionOptions,
) -> Result<JoyCon<HidDevice>> {
    let device = open_hid(hand, path, serial)?;
    info!("Opened {:?} Joy-Con", hand);
    JoyCon::with_options(device, hand, options)
}

/// Open the first left Joy-Con found.
pub fn open_left() -> Result<JoyCon<HidDevice>> {
    open(Hand::Left, None, None, SessionOptions::default())
}

/// Open the first right Joy-Con found.
pub fn open_right() -> Result<JoyCon<HidDevice>> {
    open(Hand::Right, None, None, SessionOptions::default())
}
