//! Errors raised by the bit reader, writer and input buffer.

use std::fmt;

pub type BitResult<T> = Result<T, BitError>;

/// Why a bit-level read or write failed.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BitError {
    /// The buffer ends before the requested bits.
    UnexpectedEof { requested: usize, available: usize },

    /// More bits than one call can move.
    InvalidBitCount { bits: usize, max_bits: usize },

    /// `value` has set bits above the low `bits`.
    ValueOutOfRange { value: u64, bits: usize },

    /// A seek or skip landed outside the buffer.
    SeekOutOfRange {
        /// Requested bit position.
        position: usize,
        /// Buffer length in bits.
        len: usize,
    },

    /// Byte-aligned access attempted at a non byte-aligned position.
    MisalignedAccess {
        /// Current bit position.
        bit_position: usize,
    },

    /// A write was issued on a buffer that is in read mode.
    NotWriting,

    /// A read was issued on a buffer that is in write mode.
    NotReading,
}

impl fmt::Display for BitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEof {
                requested,
                available,
            } => {
                write!(f, "needed {requested} bits, {available} bits left")
            }
            Self::InvalidBitCount { bits, max_bits } => {
                write!(f, "cannot move {bits} bits at once (max {max_bits})")
            }
            Self::ValueOutOfRange { value, bits } => {
                write!(f, "value {value} does not fit in {bits} bits")
            }
            Self::SeekOutOfRange { position, len } => {
                write!(f, "bit position {position} is outside a {len}-bit buffer")
            }
            Self::MisalignedAccess { bit_position } => {
                write!(f, "byte-aligned access at bit position {bit_position}")
            }
            Self::NotWriting => write!(f, "buffer is not in write mode"),
            Self::NotReading => write!(f, "buffer is not in read mode"),
        }
    }
}

impl std::error::Error for BitError {}
