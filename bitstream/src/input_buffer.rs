//! Typed input payload buffer with selectable precision.
//!
//! An [`InputBuffer`] is written once per tick by the input capture code and
//! read back by the simulation. Every value is quantized on write and the
//! `add_*` methods return the value exactly as a reader will observe it, so
//! the writing side can simulate with the same numbers the remote side sees.

use std::f32::consts::{PI, TAU};

use crate::error::{BitError, BitResult};
use crate::reader::BitReader;
use crate::writer::BitWriter;

/// Squared length under which a 2D direction is encoded as zero.
const ZERO_LENGTH_EPSILON: f32 = 0.000_01;

/// Precision level for a typed value. `Level0` is the widest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompressionLevel {
    #[default]
    Level0,
    Level1,
    Level2,
    Level3,
}

impl CompressionLevel {
    /// All levels, widest first.
    pub const ALL: [Self; 4] = [Self::Level0, Self::Level1, Self::Level2, Self::Level3];
}

/// Value kinds an [`InputBuffer`] can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Bool,
    Int,
    UnitReal,
    NormalizedVector2,
    NormalizedVector3,
}

/// Number of bits a value of `data_type` occupies at `level`.
#[must_use]
pub const fn bits_taken(data_type: DataType, level: CompressionLevel) -> usize {
    use CompressionLevel::{Level0, Level1, Level2, Level3};
    match data_type {
        DataType::Bool => 1,
        DataType::Int => match level {
            Level0 => 64,
            Level1 => 32,
            Level2 => 16,
            Level3 => 8,
        },
        DataType::UnitReal => match level {
            Level0 => 10,
            Level1 => 8,
            Level2 => 6,
            Level3 => 4,
        },
        // One extra bit flags the zero vector.
        DataType::NormalizedVector2 => match level {
            Level0 => 12,
            Level1 => 11,
            Level2 => 10,
            Level3 => 9,
        },
        DataType::NormalizedVector3 => match level {
            Level0 => 33,
            Level1 => 30,
            Level2 => 24,
            Level3 => 18,
        },
    }
}

/// Bit buffer holding one tick of input.
///
/// The buffer is either writing (after [`begin_write`](Self::begin_write))
/// or reading. [`dry`](Self::dry) closes a write and pads it to a whole
/// number of bytes; [`begin_read`](Self::begin_read) does so implicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputBuffer {
    bytes: Vec<u8>,
    bit_offset: usize,
    writer: Option<BitWriter>,
}

impl InputBuffer {
    /// Creates an empty buffer in read mode.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps existing payload bytes, ready for reading.
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            bit_offset: 0,
            writer: None,
        }
    }

    /// Replaces the content with a copy of `bytes` and rewinds for reading.
    pub fn load(&mut self, bytes: &[u8]) {
        self.writer = None;
        self.bytes.clear();
        self.bytes.extend_from_slice(bytes);
        self.bit_offset = 0;
    }

    /// Starts a fresh write from bit 0, discarding the previous content.
    pub fn begin_write(&mut self) {
        self.writer = Some(BitWriter::with_capacity(self.bytes.len()));
        self.bit_offset = 0;
    }

    /// Closes a pending write, then rewinds to bit 0 in read mode.
    pub fn begin_read(&mut self) {
        self.dry();
        self.bit_offset = 0;
    }

    /// Closes a pending write, trimming the buffer to the written bits
    /// padded to the next byte boundary. No-op while reading.
    pub fn dry(&mut self) {
        if let Some(writer) = self.writer.take() {
            self.bit_offset = writer.bits_written();
            self.bytes = writer.finish();
        }
    }

    /// `true` unless a write is in progress.
    #[must_use]
    pub const fn is_reading(&self) -> bool {
        self.writer.is_none()
    }

    /// Current cursor position in bits.
    #[must_use]
    pub fn bit_offset(&self) -> usize {
        self.writer
            .as_ref()
            .map_or(self.bit_offset, BitWriter::bits_written)
    }

    /// Moves the read cursor to an absolute bit position.
    pub fn seek(&mut self, bits: usize) -> BitResult<()> {
        if !self.is_reading() {
            return Err(BitError::NotReading);
        }
        if bits > self.size_in_bits() {
            return Err(BitError::SeekOutOfRange {
                position: bits,
                len: self.size_in_bits(),
            });
        }
        self.bit_offset = bits;
        Ok(())
    }

    /// Advances the read cursor without decoding.
    pub fn skip(&mut self, bits: usize) -> BitResult<()> {
        self.seek(self.bit_offset.saturating_add(bits))
    }

    /// Size of the closed buffer in bits (always a multiple of 8).
    #[must_use]
    pub fn size_in_bits(&self) -> usize {
        self.bytes.len() * 8
    }

    /// Size of the closed buffer in bytes.
    #[must_use]
    pub fn size_in_bytes(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn into_bytes(mut self) -> Vec<u8> {
        self.dry();
        self.bytes
    }

    /// Clears every bit while keeping the size.
    pub fn zero(&mut self) {
        self.bytes.fill(0);
    }

    pub fn add_bool(&mut self, value: bool) -> BitResult<bool> {
        self.write_raw(u64::from(value), 1)?;
        Ok(value)
    }

    pub fn read_bool(&mut self) -> BitResult<bool> {
        Ok(self.read_raw(1)? == 1)
    }

    /// Writes an integer clamped to the signed range of the level's width.
    #[allow(clippy::cast_sign_loss)]
    pub fn add_int(&mut self, value: i64, level: CompressionLevel) -> BitResult<i64> {
        let bits = bits_taken(DataType::Int, level);
        let clamped = clamp_signed(value, bits);
        self.write_raw(clamped as u64 & mask(bits), bits)?;
        Ok(clamped)
    }

    pub fn read_int(&mut self, level: CompressionLevel) -> BitResult<i64> {
        let bits = bits_taken(DataType::Int, level);
        Ok(sign_extend(self.read_raw(bits)?, bits))
    }

    /// Writes a real in `[0, 1]`; values outside are clamped.
    pub fn add_unit_real(&mut self, value: f32, level: CompressionLevel) -> BitResult<f32> {
        let bits = bits_taken(DataType::UnitReal, level);
        let scale = unit_scale(bits);
        let compressed = compress_unit(value, scale);
        self.write_raw(compressed, bits)?;
        Ok(decompress_unit(compressed, scale))
    }

    pub fn read_unit_real(&mut self, level: CompressionLevel) -> BitResult<f32> {
        let bits = bits_taken(DataType::UnitReal, level);
        Ok(decompress_unit(self.read_raw(bits)?, unit_scale(bits)))
    }

    /// Writes the direction of `value`; a near-zero vector stays zero.
    pub fn add_normalized_vector2(
        &mut self,
        value: [f32; 2],
        level: CompressionLevel,
    ) -> BitResult<[f32; 2]> {
        let angle_bits = bits_taken(DataType::NormalizedVector2, level) - 1;
        let scale = unit_scale(angle_bits);
        let is_not_zero = value[0].mul_add(value[0], value[1] * value[1]) > ZERO_LENGTH_EPSILON;
        let angle = value[1].atan2(value[0]);
        let compressed = compress_unit((angle + PI) / TAU, scale);

        self.write_raw(u64::from(is_not_zero), 1)?;
        self.write_raw(compressed, angle_bits)?;
        Ok(direction(is_not_zero, compressed, scale))
    }

    pub fn read_normalized_vector2(&mut self, level: CompressionLevel) -> BitResult<[f32; 2]> {
        let angle_bits = bits_taken(DataType::NormalizedVector2, level) - 1;
        let is_not_zero = self.read_raw(1)? == 1;
        let compressed = self.read_raw(angle_bits)?;
        Ok(direction(is_not_zero, compressed, unit_scale(angle_bits)))
    }

    /// Writes each axis of `value`, expected in `[-1, 1]`.
    pub fn add_normalized_vector3(
        &mut self,
        value: [f32; 3],
        level: CompressionLevel,
    ) -> BitResult<[f32; 3]> {
        let axis_bits = bits_taken(DataType::NormalizedVector3, level) / 3;
        let scale = unit_scale(axis_bits);
        let mut out = [0.0; 3];
        for (axis, slot) in value.iter().zip(out.iter_mut()) {
            let compressed = compress_unit((axis + 1.0) * 0.5, scale);
            self.write_raw(compressed, axis_bits)?;
            *slot = decompress_unit(compressed, scale).mul_add(2.0, -1.0);
        }
        Ok(out)
    }

    pub fn read_normalized_vector3(&mut self, level: CompressionLevel) -> BitResult<[f32; 3]> {
        let axis_bits = bits_taken(DataType::NormalizedVector3, level) / 3;
        let scale = unit_scale(axis_bits);
        let mut out = [0.0; 3];
        for slot in &mut out {
            *slot = decompress_unit(self.read_raw(axis_bits)?, scale).mul_add(2.0, -1.0);
        }
        Ok(out)
    }

    fn write_raw(&mut self, value: u64, bits: usize) -> BitResult<()> {
        let writer = self.writer.as_mut().ok_or(BitError::NotWriting)?;
        writer.write_bits(value, bits)
    }

    fn read_raw(&mut self, bits: usize) -> BitResult<u64> {
        if !self.is_reading() {
            return Err(BitError::NotReading);
        }
        let mut reader = BitReader::new(&self.bytes);
        reader.seek(self.bit_offset)?;
        let value = reader.read_bits(bits)?;
        self.bit_offset = reader.bit_position();
        Ok(value)
    }
}

const fn mask(bits: usize) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

fn clamp_signed(value: i64, bits: usize) -> i64 {
    if bits >= 64 {
        return value;
    }
    let max = (1i64 << (bits - 1)) - 1;
    value.clamp(-max - 1, max)
}

#[allow(clippy::cast_possible_wrap)]
const fn sign_extend(raw: u64, bits: usize) -> i64 {
    let shift = 64 - bits;
    ((raw << shift) as i64) >> shift
}

#[allow(clippy::cast_precision_loss)]
fn unit_scale(bits: usize) -> f32 {
    mask(bits) as f32
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn compress_unit(value: f32, scale: f32) -> u64 {
    (value.clamp(0.0, 1.0) * scale).min(scale) as u64
}

#[allow(clippy::cast_precision_loss)]
fn decompress_unit(value: u64, scale: f32) -> f32 {
    value as f32 / scale
}

fn direction(is_not_zero: bool, compressed: u64, scale: f32) -> [f32; 2] {
    if !is_not_zero {
        return [0.0, 0.0];
    }
    let angle = decompress_unit(compressed, scale).mul_add(TAU, -PI);
    [angle.cos(), angle.sin()]
}
