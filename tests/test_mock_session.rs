//! Integration tests for a session driven by the mock transport

use joycon_bridge::joycon::calibration::SENSOR_CALIBRATION_RECORD_SIZE;
use joycon_bridge::joycon::constants::*;
use joycon_bridge::joycon::mock_transport::{
    encode_analog_stick, encode_sensor_calibration, encode_stick_calibration, raw_report,
};
use joycon_bridge::joycon::report::{ImuSample, InputReportHeader};
use joycon_bridge::{
    Hand, JoyCon, JoyConError, LedState, MockTransport, SessionOptions, Stick,
};

const EPSILON: f32 = 1e-4;

fn open(mock: &MockTransport) -> JoyCon<MockTransport> {
    JoyCon::new(mock.clone(), Hand::Right).unwrap()
}

fn header_with_sticks(left: [u16; 2], right: [u16; 2]) -> InputReportHeader {
    InputReportHeader {
        left_stick: encode_analog_stick(left),
        right_stick: encode_analog_stick(right),
        ..Default::default()
    }
}

#[test]
fn test_user_calibration_takes_precedence() {
    let mock = MockTransport::new();
    // Left stick offsets 0x200 around 0x700
    mock.write_user_calibration(
        USER_CALIBRATION_LEFT_STICK_OFFSET,
        &encode_stick_calibration([0x200, 0x200, 0x700, 0x700, 0x200, 0x200]),
    );
    // Accelerometer with a quarter of the factory sensitivity, gyro untouched
    let mut sensors = encode_sensor_calibration([0; 3], [4096; 3]).to_vec();
    sensors.extend_from_slice(&encode_sensor_calibration([0; 3], [13371; 3]));
    mock.write_user_calibration(USER_CALIBRATION_SENSORS_OFFSET, &sensors);

    let joycon = open(&mock);
    let calibration = joycon.calibration();

    assert_eq!(calibration.left_stick.x.center, 0x700);
    assert_eq!(calibration.left_stick.x.max_above_center, 0x900);
    assert_eq!(calibration.left_stick.y.min_below_center, 0x500);
    // Right stick has no user block and falls back to factory
    assert_eq!(calibration.right_stick.x.center, 0x800);
    assert_eq!(calibration.right_stick.x.min_below_center, 0x300);
    assert!((calibration.accelerometer.x - 4.0 * 9.8 / 4096.0).abs() < 1e-9);

    // Factory reads only happen for blocks without the magic
    let reads: Vec<u32> = mock
        .subcommands()
        .iter()
        .filter(|s| s.id == SUBCOMMAND_SPI_READ)
        .map(|s| {
            u32::from_le_bytes([s.parameters[0], s.parameters[1], s.parameters[2], s.parameters[3]])
        })
        .collect();
    assert_eq!(
        reads,
        vec![
            USER_CALIBRATION_LEFT_STICK_OFFSET - 2,
            USER_CALIBRATION_RIGHT_STICK_OFFSET - 2,
            FACTORY_CALIBRATION_RIGHT_STICK_OFFSET,
            USER_CALIBRATION_SENSORS_OFFSET - 2,
        ]
    );
}

#[test]
fn test_wrong_magic_falls_back_to_factory() {
    let mock = MockTransport::new();
    mock.write_spi(USER_CALIBRATION_LEFT_STICK_OFFSET - 2, &[0xB2, 0xA2]);
    mock.write_spi(
        USER_CALIBRATION_LEFT_STICK_OFFSET,
        &encode_stick_calibration([0x100; 6]),
    );

    let joycon = open(&mock);
    assert_eq!(joycon.calibration().left_stick.x.center, 0x800);
}

#[test]
fn test_sensor_block_is_two_records() {
    let mock = MockTransport::new();
    let _joycon = open(&mock);

    let sizes: Vec<u8> = mock
        .subcommands()
        .iter()
        .filter(|s| s.id == SUBCOMMAND_SPI_READ)
        .map(|s| s.parameters[4])
        .collect();
    let sensors = 2 * SENSOR_CALIBRATION_RECORD_SIZE;
    assert_eq!(sizes, vec![11, 9, 11, 9, sensors + 2, sensors]);
}

#[test]
fn test_packet_counter_advances_once_per_subcommand() {
    let mock = MockTransport::new();
    let mut joycon = open(&mock);

    for player in 1..=8 {
        joycon.set_player_leds_by_number(player).unwrap();
    }

    let counters: Vec<u8> = mock.subcommands().iter().map(|s| s.counter).collect();
    let expected: Vec<u8> = (0..counters.len()).map(|i| (i % 16) as u8).collect();
    assert!(counters.len() > 16, "sequence should wrap at least once");
    assert_eq!(counters, expected);
}

#[test]
fn test_packet_counter_ignores_reports_read_while_waiting() {
    let mock = MockTransport::new();
    let mut joycon = open(&mock);

    mock.set_noise_before_reply(5);
    let subcommands_before = mock.subcommands().len();
    let reads_before = mock.reads();
    for player in 1..=8 {
        joycon.set_player_leds_by_number(player).unwrap();
    }

    // Six reads per LED subcommand: five full reports, then the reply
    assert_eq!(mock.reads() - reads_before, 8 * 6);
    assert_eq!(mock.subcommands().len() - subcommands_before, 8);

    let counters: Vec<u8> = mock.subcommands().iter().map(|s| s.counter).collect();
    let expected: Vec<u8> = (0..counters.len()).map(|i| (i % 16) as u8).collect();
    assert!(counters.len() > 16, "sequence should wrap at least once");
    assert_eq!(counters, expected);
}

#[test]
fn test_handshake_gives_up_after_exactly_the_attempt_limit() {
    let mock = MockTransport::new();
    let mut joycon = open(&mock);

    mock.set_noise_before_reply(150);
    let reads_before = mock.reads();
    let result = joycon.set_player_leds([LedState::On; 4]);

    assert!(matches!(result, Err(JoyConError::NotResponding)));
    assert_eq!(mock.reads() - reads_before, 100);
    // The rest of the noise and the reply are still queued
    assert_eq!(mock.pending(), 51);
}

#[test]
fn test_handshake_succeeds_on_last_attempt() {
    let mock = MockTransport::new();
    let mut joycon = open(&mock);

    mock.set_noise_before_reply(99);
    let reads_before = mock.reads();
    joycon.set_player_leds_by_number(4).unwrap();
    assert_eq!(mock.reads() - reads_before, 100);
}

#[test]
fn test_handshake_respects_configured_attempt_limit() {
    let mock = MockTransport::new();
    let options = SessionOptions {
        reply_attempt_limit: 3,
        ..SessionOptions::default()
    };
    let mut joycon = JoyCon::with_options(mock.clone(), Hand::Left, options).unwrap();

    mock.set_noise_before_reply(3);
    let reads_before = mock.reads();
    assert!(matches!(
        joycon.set_player_leds_by_number(1),
        Err(JoyConError::NotResponding)
    ));
    assert_eq!(mock.reads() - reads_before, 3);
}

#[test]
fn test_unresponsive_device_fails_construction() {
    let mock = MockTransport::new();
    mock.set_responsive(false);

    let result = JoyCon::new(mock.clone(), Hand::Left);
    assert!(matches!(result, Err(JoyConError::NotResponding)));
    // Construction stops at the first subcommand
    assert_eq!(mock.subcommands().len(), 1);
    assert_eq!(mock.reads(), 1);
}

#[test]
fn test_poll_discards_unknown_reports() {
    let mock = MockTransport::new();
    let mut joycon = open(&mock);

    mock.push_report(raw_report(0x3F));
    mock.push_report(raw_report(0x00));
    mock.push_report(raw_report(0x80));
    let mut header = header_with_sticks([0x800, 0x800], [0x800, 0x800]);
    header.buttons_right.b = true;
    mock.push_full_report(header, [ImuSample::default(); 3]);

    let reads_before = mock.reads();
    joycon.poll().unwrap();

    assert_eq!(mock.reads() - reads_before, 4);
    assert!(joycon.buttons().b);
    assert_eq!(mock.pending(), 0);
}

#[test]
fn test_poll_only_garbage_times_out() {
    let mock = MockTransport::new();
    let mut joycon = open(&mock);

    mock.push_report(raw_report(0x3F));
    mock.push_report(raw_report(0x3F));
    assert!(matches!(joycon.poll(), Err(JoyConError::NotResponding)));
}

#[test]
fn test_zero_stick_keeps_previous_value() {
    let mock = MockTransport::new();
    let mut joycon = open(&mock);

    // Right stick pushed fully right
    mock.push_full_report(
        header_with_sticks([0x800, 0x800], [0xD00, 0x800]),
        [ImuSample::default(); 3],
    );
    joycon.poll().unwrap();
    let pushed = joycon.right_stick();
    assert!((pushed.x - 1.0).abs() < EPSILON);

    // Both sticks read (0, 0): the values are kept
    let mut header = header_with_sticks([0, 0], [0, 0]);
    header.buttons_right.x = true;
    mock.push_full_report(header, [ImuSample::default(); 3]);
    joycon.poll().unwrap();

    assert_eq!(joycon.right_stick(), pushed);
    assert_eq!(joycon.left_stick(), Stick::default());
    assert!(joycon.buttons().x);
}

#[test]
fn test_sticks_inside_dead_zone_read_zero() {
    let mock = MockTransport::new();
    let mut joycon = open(&mock);

    // 0x10 raw units off center is well inside the inner dead zone
    mock.push_full_report(
        header_with_sticks([0x810, 0x7F0], [0x7F0, 0x810]),
        [ImuSample::default(); 3],
    );
    joycon.poll().unwrap();

    assert_eq!(joycon.left_stick(), Stick::default());
    assert_eq!(joycon.right_stick(), Stick::default());
}

#[test]
fn test_only_first_imu_sample_is_used() {
    let mock = MockTransport::new();
    let mut joycon = open(&mock);

    let imu = [
        ImuSample::new([0, 4096, 0], [0, 0, -13371]),
        ImuSample::new([4096, 4096, 4096], [13371; 3]),
        ImuSample::new([-4096; 3], [-13371; 3]),
    ];
    mock.push_full_report(header_with_sticks([0x800, 0x800], [0x800, 0x800]), imu);
    joycon.poll().unwrap();

    let accel = joycon.accelerometer();
    assert!(accel.x.abs() < EPSILON);
    assert!((accel.y - 9.8).abs() < EPSILON);
    let gyro = joycon.gyroscope();
    assert!((gyro.z + std::f32::consts::PI / 180.0).abs() < EPSILON);
}

#[test]
fn test_leds_by_number() {
    let mock = MockTransport::new();
    let mut joycon = open(&mock);

    for player in 0..=9 {
        joycon.set_player_leds_by_number(player).unwrap();
    }

    let bytes: Vec<u8> = mock
        .subcommands()
        .iter()
        .filter(|s| s.id == SUBCOMMAND_SET_PLAYER_LED)
        .map(|s| s.parameters[0])
        .collect();
    assert_eq!(
        bytes,
        vec![0xF0, 0x01, 0x03, 0x07, 0x0F, 0x09, 0x05, 0x0D, 0x06, 0xF0]
    );
}

#[test]
fn test_usb_connection_prefixes_every_command() {
    let mock = MockTransport::new();
    let options = SessionOptions {
        connection: joycon_bridge::joycon::ConnectionType::Usb,
        ..SessionOptions::default()
    };
    let _joycon = JoyCon::with_options(mock.clone(), Hand::Left, options).unwrap();

    let written = mock.written();
    assert!(!written.is_empty());
    for frame in &written {
        assert_eq!(&frame[..8], &USB_COMMAND_PREFIX);
        assert_eq!(frame[8], COMMAND_START_SUBCOMMAND);
    }
    assert!(mock.subcommands().iter().all(|s| s.usb));
}

#[test]
fn test_bluetooth_frames_have_no_prefix() {
    let mock = MockTransport::new();
    let _joycon = open(&mock);

    let first = &mock.written()[0];
    assert_eq!(
        first,
        &vec![0x01, 0x00, 0x00, 0x01, 0x40, 0x40, 0x00, 0x01, 0x40, 0x40, 0x03, 0x3F]
    );
}
