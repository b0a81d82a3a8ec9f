//! MSB-first writer backing `InputBuffer` and packet framing.

use crate::error::{BitError, BitResult};

/// Growable bit sink. Whole bytes are flushed as soon as they fill up;
/// [`finish`](Self::finish) pads the tail.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BitWriter {
    /// Completed bytes.
    bytes: Vec<u8>,
    /// Byte being filled, high bits first.
    pending: u8,
    /// Number of bits used in `pending` (0-7).
    pending_bits: u8,
}

impl BitWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(bytes),
            pending: 0,
            pending_bits: 0,
        }
    }

    #[must_use]
    pub fn bits_written(&self) -> usize {
        self.bytes.len() * 8 + usize::from(self.pending_bits)
    }

    /// Writes a single bit.
    pub fn write_bit(&mut self, value: bool) {
        self.pending = (self.pending << 1) | u8::from(value);
        self.pending_bits += 1;
        if self.pending_bits == 8 {
            self.bytes.push(self.pending);
            self.pending = 0;
            self.pending_bits = 0;
        }
    }

    /// Writes the low `bits` bits of `value`, most significant first.
    ///
    /// # Errors
    ///
    /// Returns [`BitError::InvalidBitCount`] if `bits > 64`.
    /// Returns [`BitError::ValueOutOfRange`] if `value` doesn't fit in `bits`.
    pub fn write_bits(&mut self, value: u64, bits: usize) -> BitResult<()> {
        if bits > 64 {
            return Err(BitError::InvalidBitCount { bits, max_bits: 64 });
        }
        if bits < 64 && value >> bits != 0 {
            return Err(BitError::ValueOutOfRange { value, bits });
        }
        for shift in (0..bits).rev() {
            self.write_bit((value >> shift) & 1 == 1);
        }
        Ok(())
    }

    /// Writes a byte at a byte-aligned position.
    pub fn write_u8_aligned(&mut self, value: u8) -> BitResult<()> {
        self.ensure_aligned()?;
        self.bytes.push(value);
        Ok(())
    }

    /// Writes a little-endian `u32` at a byte-aligned position.
    pub fn write_u32_aligned(&mut self, value: u32) -> BitResult<()> {
        self.ensure_aligned()?;
        self.bytes.extend_from_slice(&value.to_le_bytes());
        Ok(())
    }

    /// Pads with zero bits up to the next byte boundary.
    pub fn align_to_byte(&mut self) {
        while self.pending_bits != 0 {
            self.write_bit(false);
        }
    }

    fn ensure_aligned(&self) -> BitResult<()> {
        if self.pending_bits != 0 {
            return Err(BitError::MisalignedAccess {
                bit_position: self.bits_written(),
            });
        }
        Ok(())
    }

    /// Zero-pads the last byte and returns the buffer.
    #[must_use]
    pub fn finish(mut self) -> Vec<u8> {
        self.align_to_byte();
        self.bytes
    }
}
