//! Test to verify a mock session logs its lifecycle correctly

use joycon_bridge::{Hand, JoyCon, JoyConError, MockTransport};

#[test]
fn test_session_startup_logs() {
    // Initialize a simple logger for testing
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Trace)
        .try_init();

    let mock = MockTransport::new();

    // Calibration source and readiness are logged at info level,
    // every subcommand at debug level (visible with RUST_LOG=debug)
    let mut joycon = JoyCon::new(mock.clone(), Hand::Left).unwrap();
    assert!(joycon.set_player_leds_by_number(1).is_ok());
}

#[test]
fn test_failed_poll_logs() {
    // Initialize a simple logger for testing
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Trace)
        .try_init();

    let mock = MockTransport::new();
    let mut joycon = JoyCon::new(mock.clone(), Hand::Right).unwrap();

    // Discarded packets are logged at trace level before the timeout
    mock.push_report(vec![0x3F; 49]);
    assert!(matches!(joycon.poll(), Err(JoyConError::NotResponding)));
}
