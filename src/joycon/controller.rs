//! Joy-Con device session
//!
//! A [`JoyCon`] owns one transport. Construction negotiates the report mode,
//! reads calibration from SPI flash and enables the sensors; afterwards
//! [`JoyCon::poll`] turns each input report into calibrated state.

use hidapi::HidDevice;
use log::{debug, info, trace};
use packed_struct::prelude::*;

use super::buffer::append;
use super::calibration::{
    calibrated_stick, is_raw_stick_valid, CalibrationData, DeadZone, StickCalibration,
    ThreeAxisCalibration, SENSOR_CALIBRATION_DATA_SIZE, SENSOR_CALIBRATION_RECORD_SIZE,
};
use super::constants::*;
use super::error::{JoyConError, Result};
use super::protocol::{
    build_subcommand, decode_analog_stick, decode_stick_calibration, led_sequence,
    player_led_pattern, LedState, PacketCounter,
};
use super::report::{
    ImuSample, InputReportHeader, SpiReadCommandParameters, StandardFullInputReport,
    StandardInputReport, INPUT_REPORT_SIZE, SPI_READ_PARAMETERS_SIZE, SUBCOMMAND_REPLY_DATA_SIZE,
};
use super::transport::{Transport, TransportError};
use super::types::{
    Accelerometer, BatteryStatus, Buttons, ConnectionType, ControllerState, Gyroscope, Hand, Stick,
};

/// Largest SPI read that fits in one subcommand reply
pub const MAX_SPI_READ_SIZE: u8 = (SUBCOMMAND_REPLY_DATA_SIZE - SPI_READ_PARAMETERS_SIZE) as u8;

/// Tunables of a session. The defaults match the values the controller
/// firmware is known to work with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionOptions {
    pub connection: ConnectionType,
    /// Deadline for each read in [`JoyCon::poll`]
    pub poll_timeout_ms: i32,
    /// Deadline for each read while waiting for a subcommand reply
    pub reply_timeout_ms: i32,
    /// Reads to spend on one subcommand reply before giving up
    pub reply_attempt_limit: usize,
    pub dead_zone: DeadZone,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            connection: ConnectionType::Bluetooth,
            poll_timeout_ms: POLL_TIMEOUT_MS,
            reply_timeout_ms: SUBCOMMAND_REPLY_TIMEOUT_MS,
            reply_attempt_limit: SUBCOMMAND_REPLY_ATTEMPTS,
            dead_zone: DeadZone::default(),
        }
    }
}

/// A connected, calibrated Joy-Con.
///
/// State is only updated by [`JoyCon::poll`]. Dropping the session closes the
/// transport.
#[derive(Debug)]
pub struct JoyCon<T: Transport = HidDevice> {
    transport: T,
    options: SessionOptions,
    counter: PacketCounter,
    hand: Hand,
    calibration: CalibrationData,

    buttons: Buttons,
    left_stick: Stick,
    right_stick: Stick,
    accelerometer: Accelerometer,
    gyroscope: Gyroscope,
    battery: BatteryStatus,
}

impl<T: Transport> JoyCon<T> {
    /// Open a session with default options.
    pub fn new(transport: T, hand: Hand) -> Result<Self> {
        Self::with_options(transport, hand, SessionOptions::default())
    }

    /// Open a session, running the full startup sequence.
    ///
    /// Any failing step aborts construction and drops the transport.
    pub fn with_options(transport: T, hand: Hand, options: SessionOptions) -> Result<Self> {
        let mut joycon = Self {
            transport,
            options,
            counter: PacketCounter::default(),
            hand,
            calibration: CalibrationData::default(),
            buttons: Buttons::default(),
            left_stick: Stick::default(),
            right_stick: Stick::default(),
            accelerometer: Accelerometer::default(),
            gyroscope: Gyroscope::default(),
            battery: BatteryStatus::default(),
        };

        // Calibration is read while the controller is in simple mode so the
        // replies are not interleaved with a flood of full reports.
        joycon.set_report_mode(SUBCOMMAND_OPTION_REPORT_MODE_SIMPLE_HID)?;
        joycon.calibration = joycon.read_calibration()?;
        joycon.send_subcommand(SUBCOMMAND_RUMBLE_CONTROL, &[SUBCOMMAND_OPTION_RUMBLE_ENABLE])?;
        joycon.send_subcommand(SUBCOMMAND_IMU_CONTROL, &[SUBCOMMAND_OPTION_IMU_ENABLE])?;
        joycon.set_report_mode(SUBCOMMAND_OPTION_REPORT_MODE_FULL)?;

        info!("Joy-Con ready (hand: {:?}, connection: {:?})", hand, options.connection);
        Ok(joycon)
    }

    fn set_report_mode(&mut self, mode: u8) -> Result<()> {
        debug!("Setting report mode {:#04x}", mode);
        self.send_subcommand(SUBCOMMAND_REPORT_MODE, &[mode])?;
        Ok(())
    }

    /// Send a subcommand and wait for its acknowledgement.
    ///
    /// Returns the 34 reply data bytes, or nothing for a plain ACK. Reports
    /// that are not the matching reply are skipped; a read timeout or running
    /// out of attempts yields [`JoyConError::NotResponding`].
    pub fn send_subcommand(&mut self, subcommand_id: u8, payload: &[u8]) -> Result<Vec<u8>> {
        self.send_subcommand_matching(subcommand_id, payload, |_| true)
    }

    /// Like [`JoyCon::send_subcommand`], but an acknowledged reply also has to
    /// pass `accept` before it ends the wait.
    fn send_subcommand_matching<F>(
        &mut self,
        subcommand_id: u8,
        payload: &[u8],
        accept: F,
    ) -> Result<Vec<u8>>
    where
        F: Fn(&StandardInputReport) -> bool,
    {
        let command = build_subcommand(
            COMMAND_START_SUBCOMMAND,
            subcommand_id,
            payload,
            self.options.connection.is_bluetooth(),
            &mut self.counter,
        );
        debug!("Sending subcommand {:#04x} {:02x?}", subcommand_id, payload);
        self.transport.write(&command)?;

        for attempt in 0..self.options.reply_attempt_limit {
            let buf = self.read_report(self.options.reply_timeout_ms)?;
            if buf[0] != PACKET_TYPE_STANDARD {
                trace!("Skipping report {:#04x} while waiting for a reply", buf[0]);
                continue;
            }

            let report = StandardInputReport::unpack(&buf)?;
            if !report.reply.ack || report.reply_to_subcommand_id != subcommand_id {
                trace!(
                    "Skipping reply to {:#04x} (ack: {})",
                    report.reply_to_subcommand_id,
                    report.reply.ack
                );
                continue;
            }

            if !accept(&report) {
                trace!("Skipping stale reply to {:#04x}", subcommand_id);
                continue;
            }

            debug!(
                "Subcommand {:#04x} acknowledged after {} reads",
                subcommand_id,
                attempt + 1
            );
            if report.reply.data_type.to_primitive() == 0 {
                return Ok(Vec::new());
            }
            return Ok(report.data.to_vec());
        }

        debug!(
            "No reply to subcommand {:#04x} in {} reads",
            subcommand_id, self.options.reply_attempt_limit
        );
        Err(JoyConError::NotResponding)
    }

    /// Read `size` bytes of SPI flash starting at `offset`.
    ///
    /// Replies that echo a different offset or size belong to an earlier
    /// read and are skipped.
    pub fn read_spi(&mut self, offset: u32, size: u8) -> Result<Vec<u8>> {
        if size > MAX_SPI_READ_SIZE {
            return Err(JoyConError::SpiReadTooLarge {
                requested: size,
                max: MAX_SPI_READ_SIZE,
            });
        }

        debug!("Reading {} bytes of SPI flash at {:#06x}", size, offset);
        let mut parameters = Vec::with_capacity(SPI_READ_PARAMETERS_SIZE);
        append(&mut parameters, &SpiReadCommandParameters { offset, size });

        let reply = self.send_subcommand_matching(SUBCOMMAND_SPI_READ, &parameters, |report| {
            // A plain ACK carries no echo and is rejected below
            report.reply.data_type.to_primitive() == 0
                || report.data[..SPI_READ_PARAMETERS_SIZE] == parameters[..]
        })?;
        let end = SPI_READ_PARAMETERS_SIZE + size as usize;
        if reply.len() < end {
            debug!("SPI read at {:#06x} returned no data", offset);
            return Err(JoyConError::NotResponding);
        }

        // The reply echoes the parameters in front of the data
        Ok(reply[SPI_READ_PARAMETERS_SIZE..end].to_vec())
    }

    /// Read a calibration block, preferring the user copy when it carries the
    /// magic marker.
    fn read_user_or_factory(
        &mut self,
        user_offset: u32,
        factory_offset: u32,
        size: u8,
    ) -> Result<Vec<u8>> {
        let user = self.read_spi(user_offset - 2, size + 2)?;
        if u16::from_le_bytes([user[0], user[1]]) == USER_CALIBRATION_MAGIC {
            info!("Using user calibration at {:#06x}", user_offset);
            return Ok(user[2..].to_vec());
        }

        info!("Using factory calibration at {:#06x}", factory_offset);
        self.read_spi(factory_offset, size)
    }

    fn read_stick_calibration(
        &mut self,
        user_offset: u32,
        factory_offset: u32,
    ) -> Result<[u16; 6]> {
        let data =
            self.read_user_or_factory(user_offset, factory_offset, STICK_CALIBRATION_DATA_SIZE)?;
        let data: [u8; 9] = data
            .as_slice()
            .try_into()
            .map_err(|_| JoyConError::NotResponding)?;
        Ok(decode_stick_calibration(&data))
    }

    fn read_calibration(&mut self) -> Result<CalibrationData> {
        let left = self.read_stick_calibration(
            USER_CALIBRATION_LEFT_STICK_OFFSET,
            FACTORY_CALIBRATION_LEFT_STICK_OFFSET,
        )?;
        let right = self.read_stick_calibration(
            USER_CALIBRATION_RIGHT_STICK_OFFSET,
            FACTORY_CALIBRATION_RIGHT_STICK_OFFSET,
        )?;
        let sensors = self.read_user_or_factory(
            USER_CALIBRATION_SENSORS_OFFSET,
            FACTORY_CALIBRATION_SENSORS_OFFSET,
            SENSOR_CALIBRATION_DATA_SIZE,
        )?;

        let record = SENSOR_CALIBRATION_RECORD_SIZE as usize;
        let accelerometer = Self::sensor_record(&sensors[..record])?;
        let gyroscope = Self::sensor_record(&sensors[record..2 * record])?;

        let calibration = CalibrationData::new(
            StickCalibration::from_left_raw(left),
            StickCalibration::from_right_raw(right),
            &accelerometer,
            &gyroscope,
        );
        debug!("Calibration: {:?}", calibration);
        Ok(calibration)
    }

    fn sensor_record(data: &[u8]) -> Result<ThreeAxisCalibration> {
        let data: [u8; SENSOR_CALIBRATION_RECORD_SIZE as usize] =
            data.try_into().map_err(|_| JoyConError::NotResponding)?;
        Ok(ThreeAxisCalibration::unpack(&data)?)
    }

    /// Read one report into a fixed size buffer, zero filling short reads.
    fn read_report(&mut self, timeout_ms: i32) -> Result<[u8; INPUT_REPORT_SIZE]> {
        let data = match self.transport.read_timeout(INPUT_REPORT_SIZE, timeout_ms) {
            Ok(data) => data,
            Err(TransportError::Timeout { .. }) => return Err(JoyConError::NotResponding),
            Err(e) => return Err(e.into()),
        };

        let mut buf = [0u8; INPUT_REPORT_SIZE];
        let len = data.len().min(INPUT_REPORT_SIZE);
        buf[..len].copy_from_slice(&data[..len]);
        Ok(buf)
    }

    /// Wait for the next input report and update the session state from it.
    ///
    /// Reports of unknown types are discarded; each read obeys the poll
    /// timeout.
    pub fn poll(&mut self) -> Result<()> {
        loop {
            let buf = self.read_report(self.options.poll_timeout_ms)?;
            match buf[0] {
                PACKET_TYPE_STANDARD => {
                    let report = StandardInputReport::unpack(&buf)?;
                    self.update_header(&report.header);
                    return Ok(());
                }
                PACKET_TYPE_BUTTONS_AND_IMU | PACKET_TYPE_NFC => {
                    let report = StandardFullInputReport::unpack(&buf)?;
                    self.update_header(&report.header);
                    // Only the first of the three samples is used
                    self.update_motion(&report.imu[0]);
                    return Ok(());
                }
                other => trace!("Discarding report {:#04x}", other),
            }
        }
    }

    fn update_header(&mut self, header: &InputReportHeader) {
        self.buttons = Buttons::from(header);
        self.battery = BatteryStatus::from(header);

        // An all-zero stick means the link dropped a sample, keep the last value
        let left = decode_analog_stick(&header.left_stick);
        if is_raw_stick_valid(left) {
            self.left_stick =
                calibrated_stick(left, &self.calibration.left_stick, &self.options.dead_zone);
        }

        let right = decode_analog_stick(&header.right_stick);
        if is_raw_stick_valid(right) {
            self.right_stick =
                calibrated_stick(right, &self.calibration.right_stick, &self.options.dead_zone);
        }
    }

    fn update_motion(&mut self, sample: &ImuSample) {
        self.accelerometer = self.calibration.accelerometer.apply(sample.accel());
        self.gyroscope = self.calibration.gyroscope.apply(sample.gyro());
    }

    /// Set each of the four player LEDs.
    pub fn set_player_leds(&mut self, states: [LedState; 4]) -> Result<()> {
        self.send_subcommand(SUBCOMMAND_SET_PLAYER_LED, &[led_sequence(states)])?;
        Ok(())
    }

    /// Show the console's LED pattern for a player number (1-8). Other
    /// numbers flash every LED.
    pub fn set_player_leds_by_number(&mut self, player: u8) -> Result<()> {
        self.set_player_leds(player_led_pattern(player))
    }

    pub fn buttons(&self) -> Buttons {
        self.buttons
    }

    pub fn left_stick(&self) -> Stick {
        self.left_stick
    }

    pub fn right_stick(&self) -> Stick {
        self.right_stick
    }

    /// Angular velocity in rad/s
    pub fn gyroscope(&self) -> Gyroscope {
        self.gyroscope
    }

    /// Acceleration in m/s²
    pub fn accelerometer(&self) -> Accelerometer {
        self.accelerometer
    }

    pub fn likely_hand(&self) -> Hand {
        self.hand
    }

    pub fn battery(&self) -> BatteryStatus {
        self.battery
    }

    pub fn calibration(&self) -> &CalibrationData {
        &self.calibration
    }

    /// Snapshot of the current state
    pub fn state(&self) -> ControllerState {
        ControllerState {
            hand: self.hand,
            buttons: self.buttons,
            left_stick: self.left_stick,
            right_stick: self.right_stick,
            accelerometer: self.accelerometer,
            gyroscope: self.gyroscope,
            battery: self.battery,
        }
    }
}
