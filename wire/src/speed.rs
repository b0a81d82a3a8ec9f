//! Tick speed notification byte.
//!
//! The server maps a speed bias in `[-max, max]` linearly onto `0..=255`.

use crate::error::{DecodeError, WireResult};

/// Size of a speed notification in bytes.
pub const SPEED_PAYLOAD_SIZE: usize = 1;

/// Encodes a speed bias; values outside `[-max_speed, max_speed]` saturate.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn encode_tick_speed(bias: f32, max_speed: f32) -> u8 {
    let unit = ((bias / max_speed) + 1.0) / 2.0;
    (f32::from(u8::MAX) * unit.clamp(0.0, 1.0)) as u8
}

/// Decodes a speed notification, clamping into `[-max_speed, max_speed]`.
pub fn decode_tick_speed(payload: &[u8], max_speed: f32) -> WireResult<f32> {
    let [byte] = payload else {
        return Err(DecodeError::SpeedPayloadLength {
            actual: payload.len(),
        });
    };
    let unit = f32::from(*byte) / f32::from(u8::MAX);
    Ok((max_speed * ((unit - 0.5) / 0.5)).clamp(-max_speed, max_speed))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: f32 = 2.0;

    #[test]
    fn extremes_map_to_byte_bounds() {
        assert_eq!(encode_tick_speed(-MAX, MAX), 0);
        assert_eq!(encode_tick_speed(MAX, MAX), 255);
        assert_eq!(encode_tick_speed(0.0, MAX), 127);
        assert_eq!(encode_tick_speed(10.0, MAX), 255);
    }

    #[test]
    fn decode_is_close_to_original() {
        for bias in [-2.0, -1.3, -0.2, 0.0, 0.7, 1.9, 2.0] {
            let byte = encode_tick_speed(bias, MAX);
            let decoded = decode_tick_speed(&[byte], MAX).unwrap();
            assert!((decoded - bias).abs() <= 2.0 * MAX / 255.0, "{bias} -> {decoded}");
        }
    }

    #[test]
    fn decode_rejects_wrong_length() {
        assert_eq!(
            decode_tick_speed(&[], MAX),
            Err(DecodeError::SpeedPayloadLength { actual: 0 })
        );
        assert_eq!(
            decode_tick_speed(&[1, 2], MAX),
            Err(DecodeError::SpeedPayloadLength { actual: 2 })
        );
    }

    #[test]
    fn decode_bounds() {
        assert!((decode_tick_speed(&[0], MAX).unwrap() + MAX).abs() < f32::EPSILON);
        assert!((decode_tick_speed(&[255], MAX).unwrap() - MAX).abs() < f32::EPSILON);
    }
}
