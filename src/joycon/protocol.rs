//! Joy-Con command framing and raw value decoding
//!
//! Builds the output reports sent to the controller and decodes the packed
//! 12-bit values found in input reports and SPI calibration blocks.

use serde::{Deserialize, Serialize};

use super::constants::{RUMBLE_NEUTRAL, USB_COMMAND_PREFIX};

/// State of a single player LED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedState {
    #[default]
    Off,
    On,
    Flashing,
}

/// Rolling 4-bit packet number placed in front of every subcommand.
///
/// The controller only uses it to tell consecutive packets apart, so each
/// session keeps its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PacketCounter(u8);

impl PacketCounter {
    pub fn new(start: u8) -> Self {
        Self(start & 0x0F)
    }

    /// Returns the value for the packet being built and advances the counter.
    pub fn next(&mut self) -> u8 {
        let current = self.0;
        self.0 = (self.0 + 1) & 0x0F;
        current
    }
}

/// Build a buffer in the structure of a command for a Joy-Con.
pub fn build_command(command_id: u8, payload: &[u8], is_bluetooth: bool) -> Vec<u8> {
    let mut command = Vec::with_capacity(USB_COMMAND_PREFIX.len() + 1 + payload.len());

    if !is_bluetooth {
        command.extend_from_slice(&USB_COMMAND_PREFIX);
    }

    command.push(command_id);
    command.extend_from_slice(payload);
    command
}

/// Build a buffer in the structure of a command + subcommand for a Joy-Con.
///
/// Rumble data is required in front of each subcommand; neutral data is used
/// for both motors, with the packet counter in the low nibble of byte 0.
pub fn build_subcommand(
    command_id: u8,
    subcommand_id: u8,
    payload: &[u8],
    is_bluetooth: bool,
    counter: &mut PacketCounter,
) -> Vec<u8> {
    let mut subcommand = Vec::with_capacity(RUMBLE_NEUTRAL.len() + 1 + payload.len());
    subcommand.extend_from_slice(&RUMBLE_NEUTRAL);
    subcommand[0] = counter.next() & 0x0F;
    subcommand.push(subcommand_id);
    subcommand.extend_from_slice(payload);

    build_command(command_id, &subcommand, is_bluetooth)
}

/// Build the player LED byte: steady LEDs in the low nibble, flashing LEDs in the high nibble.
pub fn led_sequence(states: [LedState; 4]) -> u8 {
    states
        .iter()
        .enumerate()
        .fold(0u8, |sequence, (i, state)| match state {
            LedState::Off => sequence,
            LedState::On => sequence | (1 << i),
            LedState::Flashing => sequence | (0x10 << i),
        })
}

/// LED pattern the console uses for a player number.
///
/// Numbers outside 1-8 flash every LED.
pub fn player_led_pattern(player: u8) -> [LedState; 4] {
    use LedState::{Flashing, Off, On};

    match player {
        1 => [On, Off, Off, Off],
        2 => [On, On, Off, Off],
        3 => [On, On, On, Off],
        4 => [On, On, On, On],
        5 => [On, Off, Off, On],
        6 => [On, Off, On, Off],
        7 => [On, Off, On, On],
        8 => [Off, On, On, Off],
        _ => [Flashing; 4],
    }
}

/// Decode 3 bytes of stick data into 12-bit (horizontal, vertical) values.
pub fn decode_analog_stick(data: &[u8; 3]) -> [u16; 2] {
    let horizontal = (data[0] as u16) | ((data[1] as u16 & 0x0F) << 8);
    let vertical = ((data[1] as u16) >> 4) | ((data[2] as u16) << 4);
    [horizontal, vertical]
}

/// Decode a 9 byte stick calibration block into six 12-bit values.
///
/// The meaning of each slot depends on the stick the block belongs to, see
/// [`super::calibration::StickCalibration::from_left_raw`] and
/// [`super::calibration::StickCalibration::from_right_raw`].
pub fn decode_stick_calibration(data: &[u8; 9]) -> [u16; 6] {
    let mut values = [0u16; 6];
    for (group, chunk) in data.chunks_exact(3).enumerate() {
        let pair = decode_analog_stick(&[chunk[0], chunk[1], chunk[2]]);
        values[group * 2] = pair[0];
        values[group * 2 + 1] = pair[1];
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use LedState::{Flashing, Off, On};

    #[test]
    fn test_build_command_bluetooth() {
        assert_eq!(build_command(0x01, &[0xAA, 0xBB], true), vec![0x01, 0xAA, 0xBB]);
    }

    #[test]
    fn test_build_command_usb_prefix() {
        assert_eq!(
            build_command(0x01, &[0xAA], false),
            vec![0x80, 0x92, 0x00, 0x31, 0x00, 0x00, 0x00, 0x00, 0x01, 0xAA]
        );
    }

    #[test]
    fn test_build_subcommand_layout() {
        let mut counter = PacketCounter::new(5);
        let command = build_subcommand(0x01, 0x48, &[0x01], true, &mut counter);
        assert_eq!(
            command,
            vec![0x01, 0x05, 0x00, 0x01, 0x40, 0x40, 0x00, 0x01, 0x40, 0x40, 0x48, 0x01]
        );
        assert_eq!(counter, PacketCounter::new(6));
    }

    #[test]
    fn test_packet_counter_wraps() {
        let mut counter = PacketCounter::new(14);
        let values: Vec<u8> = (0..4).map(|_| counter.next()).collect();
        assert_eq!(values, vec![14, 15, 0, 1]);
    }

    #[test]
    fn test_led_sequence_all_steady_combinations() {
        for mask in 0u8..16 {
            let states = [0, 1, 2, 3].map(|i| if mask & (1 << i) != 0 { On } else { Off });
            assert_eq!(led_sequence(states), mask);
        }
    }

    #[test]
    fn test_led_sequence_flashing_uses_high_nibble_only() {
        for i in 0..4 {
            let mut states = [Off; 4];
            states[i] = Flashing;
            assert_eq!(led_sequence(states), 0x10 << i);
        }
        assert_eq!(led_sequence([Flashing; 4]), 0xF0);
        assert_eq!(led_sequence([On, Flashing, Off, On]), 0x01 | 0x20 | 0x08);
    }

    #[test]
    fn test_player_led_patterns() {
        let bytes: Vec<u8> = (1..=8).map(|n| led_sequence(player_led_pattern(n))).collect();
        assert_eq!(bytes, vec![0x01, 0x03, 0x07, 0x0F, 0x09, 0x05, 0x0D, 0x06]);
        assert_eq!(led_sequence(player_led_pattern(0)), 0xF0);
        assert_eq!(led_sequence(player_led_pattern(9)), 0xF0);
    }

    #[test]
    fn test_decode_analog_stick_golden() {
        assert_eq!(decode_analog_stick(&[0x34, 0x12, 0x00]), [0x234, 0x001]);
        assert_eq!(decode_analog_stick(&[0xFF, 0xFF, 0xFF]), [0xFFF, 0xFFF]);
        assert_eq!(decode_analog_stick(&[0x00, 0x08, 0x80]), [0x800, 0x800]);
        assert_eq!(decode_analog_stick(&[0x00, 0x00, 0x00]), [0, 0]);
    }

    #[test]
    fn test_decode_stick_calibration_golden() {
        let data = [0x34, 0x12, 0x00, 0x00, 0x08, 0x80, 0xFF, 0xF5, 0x5A];
        assert_eq!(
            decode_stick_calibration(&data),
            [0x234, 0x001, 0x800, 0x800, 0x5FF, 0x5AF]
        );
    }
}
