//! MSB-first reader over a borrowed byte slice.

use crate::error::{BitError, BitResult};

/// Cursor over packed bits.
///
/// A failed read leaves the cursor where it was, so callers can report the
/// offset of a truncated payload.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    bit_pos: usize,
}

impl<'a> BitReader<'a> {
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, bit_pos: 0 }
    }

    /// Total length of the underlying data in bits.
    #[must_use]
    pub const fn len_bits(&self) -> usize {
        self.data.len().saturating_mul(8)
    }

    /// Bits between the cursor and the end of the slice.
    #[must_use]
    pub const fn bits_remaining(&self) -> usize {
        self.len_bits().saturating_sub(self.bit_pos)
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bits_remaining() == 0
    }

    /// Cursor offset in bits from the start of the slice.
    #[must_use]
    pub const fn bit_position(&self) -> usize {
        self.bit_pos
    }

    /// Moves the cursor to an absolute bit position.
    ///
    /// Seeking to exactly the end is allowed.
    pub fn seek(&mut self, position: usize) -> BitResult<()> {
        if position > self.len_bits() {
            return Err(BitError::SeekOutOfRange {
                position,
                len: self.len_bits(),
            });
        }
        self.bit_pos = position;
        Ok(())
    }

    /// Advances the cursor by `bits` without reading.
    pub fn skip(&mut self, bits: usize) -> BitResult<()> {
        self.seek(self.bit_pos.saturating_add(bits))
    }

    /// Reads a single bit.
    pub fn read_bit(&mut self) -> BitResult<bool> {
        self.ensure_bits(1)?;
        let byte = self.data[self.bit_pos / 8];
        let bit = (byte >> (7 - self.bit_pos % 8)) & 1;
        self.bit_pos += 1;
        Ok(bit == 1)
    }

    /// Reads up to 64 bits as an unsigned integer, most significant first.
    pub fn read_bits(&mut self, bits: usize) -> BitResult<u64> {
        if bits > 64 {
            return Err(BitError::InvalidBitCount { bits, max_bits: 64 });
        }
        self.ensure_bits(bits)?;
        let mut value = 0u64;
        for _ in 0..bits {
            value = (value << 1) | u64::from(self.read_bit()?);
        }
        Ok(value)
    }

    pub fn read_u8_aligned(&mut self) -> BitResult<u8> {
        let [value] = self.read_aligned_bytes::<1>()?;
        Ok(value)
    }

    /// Little-endian `u32` at a byte boundary.
    pub fn read_u32_aligned(&mut self) -> BitResult<u32> {
        let bytes = self.read_aligned_bytes::<4>()?;
        Ok(u32::from_le_bytes(bytes))
    }

    /// Borrows `len` whole bytes at a byte-aligned position and advances past them.
    pub fn read_byte_slice(&mut self, len: usize) -> BitResult<&'a [u8]> {
        self.ensure_aligned()?;
        self.ensure_bits(len.saturating_mul(8))?;
        let start = self.bit_pos / 8;
        self.bit_pos += len * 8;
        Ok(&self.data[start..start + len])
    }

    fn ensure_aligned(&self) -> BitResult<()> {
        if self.bit_pos % 8 != 0 {
            return Err(BitError::MisalignedAccess {
                bit_position: self.bit_pos,
            });
        }
        Ok(())
    }

    fn ensure_bits(&self, bits: usize) -> BitResult<()> {
        let available = self.bits_remaining();
        if bits > available {
            return Err(BitError::UnexpectedEof {
                requested: bits,
                available,
            });
        }
        Ok(())
    }

    fn read_aligned_bytes<const N: usize>(&mut self) -> BitResult<[u8; N]> {
        let slice = self.read_byte_slice(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }
}
