//! Mock transport for testing.
//!
//! Simulates a Joy-Con on the other end of the HID link: it parses the
//! subcommands a session writes, answers them from an in-memory SPI flash and
//! serves queued input reports. Useful for testing the session without
//! requiring actual hardware.
//!
//! Clones share the same simulated device, so a test can keep a handle after
//! moving a clone into a session.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use log::debug;
use packed_struct::prelude::*;

use super::calibration::SENSOR_CALIBRATION_RECORD_SIZE;
use super::constants::*;
use super::report::{
    ImuSample, InputReportHeader, StandardFullInputReport, StandardInputReport, SubcommandAck,
    INPUT_REPORT_SIZE, SPI_READ_PARAMETERS_SIZE, SUBCOMMAND_REPLY_DATA_SIZE,
};
use super::transport::{Transport, TransportError};

/// Factory left stick: offsets 0x500 around a 0x800 center
pub const MOCK_LEFT_STICK_CALIBRATION: [u16; 6] = [0x500, 0x500, 0x800, 0x800, 0x500, 0x500];
/// Factory right stick: offsets 0x500 around a 0x800 center
pub const MOCK_RIGHT_STICK_CALIBRATION: [u16; 6] = [0x800, 0x800, 0x500, 0x500, 0x500, 0x500];
pub const MOCK_ACCEL_SENSITIVITY: i16 = 16384;
pub const MOCK_GYRO_SENSITIVITY: i16 = 13371;

/// A subcommand as the simulated device received it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedSubcommand {
    pub counter: u8,
    pub id: u8,
    pub parameters: Vec<u8>,
    /// Whether the frame carried the USB prefix
    pub usb: bool,
}

#[derive(Debug)]
struct MockState {
    spi: HashMap<u32, u8>,
    pending: VecDeque<Vec<u8>>,
    written: Vec<Vec<u8>>,
    subcommands: Vec<ReceivedSubcommand>,
    reads: usize,
    header: InputReportHeader,
    responsive: bool,
    noise_before_reply: usize,
    disconnected: bool,
}

/// Scripted Joy-Con behind a [`Transport`].
#[derive(Debug, Clone)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

/// Inverse of [`super::protocol::decode_stick_calibration`]
pub fn encode_stick_calibration(values: [u16; 6]) -> [u8; 9] {
    let mut data = [0u8; 9];
    for (group, pair) in values.chunks_exact(2).enumerate() {
        let (h, v) = (pair[0] & 0x0FFF, pair[1] & 0x0FFF);
        data[group * 3] = (h & 0xFF) as u8;
        data[group * 3 + 1] = ((h >> 8) as u8) | (((v & 0x0F) as u8) << 4);
        data[group * 3 + 2] = (v >> 4) as u8;
    }
    data
}

/// Encode a raw (horizontal, vertical) stick pair the way input reports carry it
pub fn encode_analog_stick(raw: [u16; 2]) -> [u8; 3] {
    let [h, v] = [raw[0] & 0x0FFF, raw[1] & 0x0FFF];
    [
        (h & 0xFF) as u8,
        ((h >> 8) as u8) | (((v & 0x0F) as u8) << 4),
        (v >> 4) as u8,
    ]
}

/// One 12-byte sensor calibration record as stored in SPI flash
pub fn encode_sensor_calibration(neutral: [i16; 3], sensitivity: [i16; 3]) -> [u8; 12] {
    let mut data = [0u8; 12];
    for (i, value) in neutral.iter().chain(sensitivity.iter()).enumerate() {
        data[i * 2..i * 2 + 2].copy_from_slice(&value.to_le_bytes());
    }
    data
}

impl MockTransport {
    /// A responsive device with factory calibration and empty user calibration.
    pub fn new() -> Self {
        let header = InputReportHeader {
            left_stick: encode_analog_stick([0x800, 0x800]),
            right_stick: encode_analog_stick([0x800, 0x800]),
            ..Default::default()
        };

        let mock = Self {
            state: Arc::new(Mutex::new(MockState {
                spi: HashMap::new(),
                pending: VecDeque::new(),
                written: Vec::new(),
                subcommands: Vec::new(),
                reads: 0,
                header,
                responsive: true,
                noise_before_reply: 0,
                disconnected: false,
            })),
        };

        mock.write_spi(
            FACTORY_CALIBRATION_LEFT_STICK_OFFSET,
            &encode_stick_calibration(MOCK_LEFT_STICK_CALIBRATION),
        );
        mock.write_spi(
            FACTORY_CALIBRATION_RIGHT_STICK_OFFSET,
            &encode_stick_calibration(MOCK_RIGHT_STICK_CALIBRATION),
        );
        mock.write_spi(
            FACTORY_CALIBRATION_SENSORS_OFFSET,
            &encode_sensor_calibration([0; 3], [MOCK_ACCEL_SENSITIVITY; 3]),
        );
        mock.write_spi(
            FACTORY_CALIBRATION_SENSORS_OFFSET + SENSOR_CALIBRATION_RECORD_SIZE as u32,
            &encode_sensor_calibration([0; 3], [MOCK_GYRO_SENSITIVITY; 3]),
        );
        mock
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Store bytes in the simulated SPI flash. Unwritten addresses read 0xFF.
    pub fn write_spi(&self, offset: u32, data: &[u8]) {
        let mut state = self.state();
        for (i, byte) in data.iter().enumerate() {
            state.spi.insert(offset + i as u32, *byte);
        }
    }

    /// Store a user calibration block, magic included, so that its payload
    /// starts at `offset`.
    pub fn write_user_calibration(&self, offset: u32, data: &[u8]) {
        self.write_spi(offset - 2, &USER_CALIBRATION_MAGIC.to_le_bytes());
        self.write_spi(offset, data);
    }

    /// When false, subcommands are swallowed without any reply.
    pub fn set_responsive(&self, responsive: bool) {
        self.state().responsive = responsive;
    }

    /// Number of 0x30 reports queued ahead of each subcommand reply.
    pub fn set_noise_before_reply(&self, count: usize) {
        self.state().noise_before_reply = count;
    }

    /// Make every following call fail with [`TransportError::Io`].
    pub fn set_disconnected(&self, disconnected: bool) {
        self.state().disconnected = disconnected;
    }

    /// Queue a raw input report.
    pub fn push_report(&self, report: Vec<u8>) {
        self.state().pending.push_back(report);
    }

    /// Queue a 0x30 report with the given header and IMU samples.
    pub fn push_full_report(&self, header: InputReportHeader, imu: [ImuSample; 3]) {
        let report = StandardFullInputReport {
            header: InputReportHeader {
                id: PACKET_TYPE_BUTTONS_AND_IMU,
                ..header
            },
            imu,
        };
        if let Ok(bytes) = report.pack() {
            self.push_report(bytes.to_vec());
        }
    }

    /// Every frame written so far
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.state().written.clone()
    }

    /// Every subcommand received so far, in order
    pub fn subcommands(&self) -> Vec<ReceivedSubcommand> {
        self.state().subcommands.clone()
    }

    /// Number of read calls served, including timed out ones
    pub fn reads(&self) -> usize {
        self.state().reads
    }

    /// Number of reports still queued
    pub fn pending(&self) -> usize {
        self.state().pending.len()
    }

    fn handle_output(state: &mut MockState, frame: &[u8]) -> Result<(), TransportError> {
        let usb = frame.starts_with(&USB_COMMAND_PREFIX);
        let frame = if usb {
            &frame[USB_COMMAND_PREFIX.len()..]
        } else {
            frame
        };

        let subcommand_start = 1 + RUMBLE_NEUTRAL.len();
        if frame.first() != Some(&COMMAND_START_SUBCOMMAND) || frame.len() <= subcommand_start {
            debug!("[MOCK JOY-CON] Ignoring frame {:02x?}", frame);
            return Ok(());
        }

        let received = ReceivedSubcommand {
            counter: frame[1] & 0x0F,
            id: frame[subcommand_start],
            parameters: frame[subcommand_start + 1..].to_vec(),
            usb,
        };
        debug!(
            "[MOCK JOY-CON] Subcommand {:#04x} (counter {}) {:02x?}",
            received.id, received.counter, received.parameters
        );

        if state.responsive {
            for _ in 0..state.noise_before_reply {
                let noise = StandardFullInputReport {
                    header: InputReportHeader {
                        id: PACKET_TYPE_BUTTONS_AND_IMU,
                        ..state.header
                    },
                    imu: Default::default(),
                };
                let bytes = noise.pack().map_err(|e| TransportError::Io(format!("{:?}", e)))?;
                state.pending.push_back(bytes.to_vec());
            }

            let reply = Self::reply_to(state, &received);
            let bytes = reply.pack().map_err(|e| TransportError::Io(format!("{:?}", e)))?;
            state.pending.push_back(bytes.to_vec());
        }

        state.subcommands.push(received);
        Ok(())
    }

    fn reply_to(state: &MockState, received: &ReceivedSubcommand) -> StandardInputReport {
        let mut report = StandardInputReport {
            header: InputReportHeader {
                id: PACKET_TYPE_STANDARD,
                ..state.header
            },
            reply: SubcommandAck {
                ack: true,
                data_type: Integer::from_primitive(0),
            },
            reply_to_subcommand_id: received.id,
            data: [0; SUBCOMMAND_REPLY_DATA_SIZE],
        };

        if received.id == SUBCOMMAND_SPI_READ
            && received.parameters.len() >= SPI_READ_PARAMETERS_SIZE
        {
            let parameters = &received.parameters[..SPI_READ_PARAMETERS_SIZE];
            let offset =
                u32::from_le_bytes([parameters[0], parameters[1], parameters[2], parameters[3]]);
            let size = parameters[4] as usize;

            report.reply.data_type = Integer::from_primitive(SUBCOMMAND_SPI_READ);
            report.data[..SPI_READ_PARAMETERS_SIZE].copy_from_slice(parameters);
            let available = SUBCOMMAND_REPLY_DATA_SIZE - SPI_READ_PARAMETERS_SIZE;
            for i in 0..size.min(available) {
                let address = offset + i as u32;
                report.data[SPI_READ_PARAMETERS_SIZE + i] =
                    state.spi.get(&address).copied().unwrap_or(0xFF);
            }
        }

        report
    }

    fn next_report(&self, max_len: usize, timeout_ms: i32) -> Result<Vec<u8>, TransportError> {
        let mut state = self.state();
        if state.disconnected {
            return Err(TransportError::Io("device disconnected".to_string()));
        }

        state.reads += 1;
        match state.pending.pop_front() {
            Some(mut report) => {
                report.truncate(max_len);
                Ok(report)
            }
            None => Err(TransportError::Timeout { timeout_ms }),
        }
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockTransport {
    fn write(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        let mut state = self.state();
        if state.disconnected {
            return Err(TransportError::Io("device disconnected".to_string()));
        }

        state.written.push(data.to_vec());
        Self::handle_output(&mut state, data)?;
        Ok(data.len())
    }

    /// Never blocks: an empty queue is reported as a timeout with `timeout_ms` -1.
    fn read(&mut self, max_len: usize) -> Result<Vec<u8>, TransportError> {
        self.next_report(max_len, -1)
    }

    fn read_timeout(&mut self, max_len: usize, timeout_ms: i32) -> Result<Vec<u8>, TransportError> {
        self.next_report(max_len, timeout_ms)
    }
}

/// A 49-byte report of an arbitrary type, filled with zeros
pub fn raw_report(packet_type: u8) -> Vec<u8> {
    let mut report = vec![0u8; INPUT_REPORT_SIZE];
    report[0] = packet_type;
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::joycon::protocol::{
        build_subcommand, decode_analog_stick, decode_stick_calibration, PacketCounter,
    };

    #[test]
    fn test_stick_encoders_invert_decoders() {
        let values = [0x123, 0x456, 0x789, 0xABC, 0xDEF, 0x001];
        assert_eq!(decode_stick_calibration(&encode_stick_calibration(values)), values);
        assert_eq!(decode_analog_stick(&encode_analog_stick([0x9A5, 0x07F])), [0x9A5, 0x07F]);
    }

    #[test]
    fn test_spi_read_reply_echoes_parameters() {
        let mut mock = MockTransport::new();
        mock.write_spi(0x1000, &[1, 2, 3]);

        let mut counter = PacketCounter::new(0);
        let parameters = [0x00, 0x10, 0, 0, 4];
        let frame = build_subcommand(0x01, SUBCOMMAND_SPI_READ, &parameters, true, &mut counter);
        assert_eq!(mock.write(&frame).unwrap(), frame.len());

        let reply = mock.read_timeout(INPUT_REPORT_SIZE, 500).unwrap();
        assert_eq!(reply[0], PACKET_TYPE_STANDARD);
        assert_eq!(reply[13], 0x90);
        assert_eq!(reply[14], SUBCOMMAND_SPI_READ);
        assert_eq!(&reply[15..24], &[0x00, 0x10, 0, 0, 4, 1, 2, 3, 0xFF]);
    }

    #[test]
    fn test_empty_queue_times_out() {
        let mut mock = MockTransport::new();
        assert_eq!(
            mock.read_timeout(INPUT_REPORT_SIZE, 5000),
            Err(TransportError::Timeout { timeout_ms: 5000 })
        );
        assert_eq!(mock.read(INPUT_REPORT_SIZE), Err(TransportError::Timeout { timeout_ms: -1 }));
        assert_eq!(mock.reads(), 2);

        mock.push_report(raw_report(PACKET_TYPE_NFC));
        assert_eq!(mock.read(13).unwrap().len(), 13);
    }

    #[test]
    fn test_unresponsive_device_records_but_does_not_reply() {
        let mut mock = MockTransport::new();
        mock.set_responsive(false);

        let mut counter = PacketCounter::new(3);
        let frame = build_subcommand(0x01, SUBCOMMAND_IMU_CONTROL, &[1], false, &mut counter);
        mock.write(&frame).unwrap();

        assert_eq!(mock.pending(), 0);
        let received = mock.subcommands();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].counter, 3);
        assert_eq!(received[0].id, SUBCOMMAND_IMU_CONTROL);
        assert_eq!(received[0].parameters, vec![1]);
        assert!(received[0].usb);
    }
}
