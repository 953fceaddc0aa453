//! Little-endian byte buffer builder used for outbound command parameters.

/// A fixed-width value whose byte layout is part of the wire contract.
pub trait WireValue {
    /// Append the raw bytes of the value, least-significant byte first.
    fn append_to(&self, buffer: &mut Vec<u8>);
}

macro_rules! impl_wire_value {
    ($($ty:ty),*) => {
        $(
            impl WireValue for $ty {
                fn append_to(&self, buffer: &mut Vec<u8>) {
                    buffer.extend_from_slice(&self.to_le_bytes());
                }
            }
        )*
    };
}

impl_wire_value!(u8, u16, u32, i16);

/// Dump a value onto the end of a buffer.
///
/// Appending `0x12345678u32` extends the buffer with `[0x78, 0x56, 0x34, 0x12]`
/// regardless of the host byte order.
pub fn append<T: WireValue + ?Sized>(buffer: &mut Vec<u8>, value: &T) {
    value.append_to(buffer);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_u32_is_little_endian() {
        let mut buffer = vec![0xAA];
        append(&mut buffer, &0x1234_5678u32);
        assert_eq!(buffer, vec![0xAA, 0x78, 0x56, 0x34, 0x12]);
    }

    #[test]
    fn test_append_mixed_widths() {
        let mut buffer = Vec::new();
        append(&mut buffer, &0x8012u32);
        append(&mut buffer, &9u8);
        append(&mut buffer, &-2i16);
        assert_eq!(buffer, vec![0x12, 0x80, 0x00, 0x00, 0x09, 0xFE, 0xFF]);
    }
}
