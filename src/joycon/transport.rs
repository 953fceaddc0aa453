//! Raw HID transport
//!
//! A session only needs three blocking primitives from the OS HID stack. The
//! [`Transport`] trait captures them so the protocol code can run against real
//! hardware through `hidapi` or against [`super::mock_transport::MockTransport`].

use std::ffi::CStr;

use hidapi::{HidApi, HidDevice};
use log::debug;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Failed to open HID device: {0}")]
    Open(String),

    #[error("HID I/O error: {0}")]
    Io(String),

    #[error("No report within {timeout_ms} ms")]
    Timeout { timeout_ms: i32 },
}

/// Blocking access to one HID device.
pub trait Transport {
    /// Write one output report, returning the number of bytes written.
    fn write(&mut self, data: &[u8]) -> Result<usize, TransportError>;

    /// Block until an input report arrives. At most `max_len` bytes are returned.
    fn read(&mut self, max_len: usize) -> Result<Vec<u8>, TransportError>;

    /// Like [`Transport::read`] but gives up with [`TransportError::Timeout`]
    /// once `timeout_ms` passes without data.
    fn read_timeout(&mut self, max_len: usize, timeout_ms: i32) -> Result<Vec<u8>, TransportError>;
}

impl Transport for HidDevice {
    fn write(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        HidDevice::write(self, data).map_err(|e| TransportError::Io(e.to_string()))
    }

    fn read(&mut self, max_len: usize) -> Result<Vec<u8>, TransportError> {
        let mut buf = vec![0u8; max_len];
        let read = HidDevice::read(self, &mut buf).map_err(|e| TransportError::Io(e.to_string()))?;
        buf.truncate(read);
        Ok(buf)
    }

    fn read_timeout(&mut self, max_len: usize, timeout_ms: i32) -> Result<Vec<u8>, TransportError> {
        let mut buf = vec![0u8; max_len];
        let read = HidDevice::read_timeout(self, &mut buf, timeout_ms)
            .map_err(|e| TransportError::Io(e.to_string()))?;

        // hidapi reports an expired deadline as a zero length read
        if read == 0 {
            return Err(TransportError::Timeout { timeout_ms });
        }

        buf.truncate(read);
        Ok(buf)
    }
}

fn hid_api() -> Result<HidApi, TransportError> {
    HidApi::new().map_err(|e| TransportError::Open(e.to_string()))
}

/// Open a device by its platform path.
pub fn open_path(path: &CStr) -> Result<HidDevice, TransportError> {
    debug!("Opening HID device at {:?}", path);
    hid_api()?
        .open_path(path)
        .map_err(|e| TransportError::Open(format!("{:?}: {}", path, e)))
}

/// Open the first device matching a vendor and product id.
pub fn open_device(vendor_id: u16, product_id: u16) -> Result<HidDevice, TransportError> {
    debug!("Opening HID device {:04x}:{:04x}", vendor_id, product_id);
    hid_api()?
        .open(vendor_id, product_id)
        .map_err(|e| TransportError::Open(format!("{:04x}:{:04x}: {}", vendor_id, product_id, e)))
}

/// Open a specific device when several with the same ids are attached.
pub fn open_device_with_serial(
    vendor_id: u16,
    product_id: u16,
    serial: &str,
) -> Result<HidDevice, TransportError> {
    debug!(
        "Opening HID device {:04x}:{:04x} with serial {}",
        vendor_id, product_id, serial
    );
    hid_api()?.open_serial(vendor_id, product_id, serial).map_err(|e| {
        TransportError::Open(format!(
            "{:04x}:{:04x} ({}): {}",
            vendor_id, product_id, serial, e
        ))
    })
}
