//! The 5-byte sensor frame and its decoded form.

/// One complete 40-bit frame as clocked out by the sensor:
/// `[humidity_high, humidity_low, temperature_high, temperature_low, checksum]`.
///
/// Produced atomically by one successful protocol run and immutable from then
/// on. The driver only returns frames whose checksum already matched, but
/// [`checksum_ok`](RawFrame::checksum_ok) lets callers recheck rather than
/// trust the hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawFrame {
    bytes: [u8; 5],
}

impl RawFrame {
    /// Wraps raw frame bytes without validating them.
    pub const fn from_bytes(bytes: [u8; 5]) -> Self {
        Self { bytes }
    }

    /// The raw frame bytes.
    pub const fn bytes(&self) -> &[u8; 5] {
        &self.bytes
    }

    /// Checks the frame invariant: the fifth byte equals the sum of the
    /// first four, modulo 256.
    pub fn checksum_ok(&self) -> bool {
        let sum = self.bytes[0]
            .wrapping_add(self.bytes[1])
            .wrapping_add(self.bytes[2])
            .wrapping_add(self.bytes[3]);
        sum == self.bytes[4]
    }

    /// Decodes the frame into a [`Reading`].
    ///
    /// Pure transformation, independent of the checksum byte: decoding the
    /// same frame twice yields the same reading.
    pub fn decode(&self) -> Reading {
        let humidity = u16::from(self.bytes[0]) << 8 | u16::from(self.bytes[1]);
        let magnitude = (u16::from(self.bytes[2] & 0x7F) << 8 | u16::from(self.bytes[3])) as i16;
        let temperature = if self.bytes[2] & 0x80 != 0 {
            -magnitude
        } else {
            magnitude
        };
        Reading {
            humidity,
            temperature,
        }
    }
}

/// A decoded measurement in fixed-point tenths.
///
/// The sensor reports both channels scaled by ten; the sign of the
/// temperature lives in bit 7 of the temperature high byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Reading {
    humidity: u16,
    temperature: i16,
}

impl Reading {
    /// Relative humidity in tenths of a percent (654 means 65.4 %RH).
    pub const fn humidity_tenths(&self) -> u16 {
        self.humidity
    }

    /// Temperature in tenths of a degree Celsius (-15 means -1.5 C).
    pub const fn temperature_tenths(&self) -> i16 {
        self.temperature
    }

    /// Relative humidity in percent.
    pub fn humidity(&self) -> f32 {
        f32::from(self.humidity) / 10.0
    }

    /// Temperature in degrees Celsius.
    pub fn temperature(&self) -> f32 {
        f32::from(self.temperature) / 10.0
    }

    /// Temperature in degrees Fahrenheit.
    pub fn temperature_fahrenheit(&self) -> f32 {
        self.temperature() * 1.8 + 32.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_matches_iff_sum_of_prefix() {
        let prefixes: [[u8; 4]; 5] = [
            [0x02, 0x8C, 0x01, 0x0A],
            [0x00, 0x00, 0x00, 0x00],
            [0xFF, 0xFF, 0xFF, 0xFF],
            [0x01, 0x90, 0x80, 0x4B],
            [0x12, 0x34, 0x56, 0x78],
        ];
        for p in prefixes {
            let expected = p[0]
                .wrapping_add(p[1])
                .wrapping_add(p[2])
                .wrapping_add(p[3]);
            for c in 0..=255u8 {
                let frame = RawFrame::from_bytes([p[0], p[1], p[2], p[3], c]);
                assert_eq!(frame.checksum_ok(), c == expected, "prefix {p:?} c {c}");
            }
        }
    }

    #[test]
    fn decodes_reference_frame() {
        // 65.6 %RH, 26.6 C: 0x0290 = 656, 0x010A = 266, checksum
        // 0x02 + 0x90 + 0x01 + 0x0A = 0x9D.
        let frame = RawFrame::from_bytes([0x02, 0x90, 0x01, 0x0A, 0x9D]);
        assert!(frame.checksum_ok());
        let reading = frame.decode();
        assert_eq!(reading.humidity_tenths(), 656);
        assert_eq!(reading.temperature_tenths(), 266);
        assert!((reading.humidity() - 65.6).abs() < f32::EPSILON);
        assert!((reading.temperature() - 26.6).abs() < f32::EPSILON);
    }

    #[test]
    fn temperature_sign_follows_bit_seven() {
        for high in [0x00u8, 0x01, 0x7F] {
            for low in [0x00u8, 0x0A, 0xFF] {
                let positive = RawFrame::from_bytes([0, 0, high, low, 0]).decode();
                let negative = RawFrame::from_bytes([0, 0, high | 0x80, low, 0]).decode();
                let magnitude = i16::from(high) << 8 | i16::from(low);
                assert_eq!(positive.temperature_tenths(), magnitude);
                assert_eq!(negative.temperature_tenths(), -magnitude);
            }
        }
    }

    #[test]
    fn decode_is_pure() {
        let frame = RawFrame::from_bytes([0x01, 0x90, 0x80, 0x4B, 0x5C]);
        assert_eq!(frame.decode(), frame.decode());
    }

    #[test]
    fn fahrenheit_conversion() {
        // 0.0 C and 26.6 C.
        let freezing = RawFrame::from_bytes([0, 0, 0, 0, 0]).decode();
        assert!((freezing.temperature_fahrenheit() - 32.0).abs() < 1e-4);
        let warm = RawFrame::from_bytes([0x02, 0x90, 0x01, 0x0A, 0x9D]).decode();
        assert!((warm.temperature_fahrenheit() - 79.88).abs() < 1e-3);
    }
}
