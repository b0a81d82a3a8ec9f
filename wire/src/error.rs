//! Error types for wire format operations.

use std::fmt;

use bitstream::BitError;

/// Result type for wire format operations.
pub type WireResult<T> = Result<T, DecodeError>;

/// Decode errors for input packets and speed notifications.
///
/// Any of these rejects the whole packet; nothing decoded before the
/// failure is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DecodeError {
    /// Packet is too small to contain the `first_id` header.
    PacketTooSmall { actual: usize, required: usize },

    /// Limits exceeded.
    LimitsExceeded {
        kind: LimitKind,
        limit: usize,
        actual: usize,
    },

    /// The payload size callback could not measure the run at `offset`.
    PayloadSizeUnknown { offset: usize },

    /// A run declares more payload bytes than the packet has left.
    PayloadOverrun {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// A speed notification must be exactly one byte.
    SpeedPayloadLength { actual: usize },

    /// Low-level read failure.
    Bitstream(BitError),
}

/// Specific wire limits that can be exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    PacketBytes,
    InputCount,
}

/// Errors that can occur during encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EncodeError {
    /// The open run already carries the maximum number of copies.
    RunOverflow { copies: usize },

    /// A duplicate was requested before any run was opened.
    NoOpenRun,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PacketTooSmall { actual, required } => {
                write!(
                    f,
                    "packet too small: {actual} bytes, need at least {required}"
                )
            }
            Self::LimitsExceeded {
                kind,
                limit,
                actual,
            } => {
                write!(f, "{kind} limit exceeded: {actual} > {limit}")
            }
            Self::PayloadSizeUnknown { offset } => {
                write!(f, "unable to measure input payload at byte {offset}")
            }
            Self::PayloadOverrun {
                offset,
                needed,
                available,
            } => {
                write!(
                    f,
                    "input payload at byte {offset} needs {needed} bytes, {available} left"
                )
            }
            Self::SpeedPayloadLength { actual } => {
                write!(f, "tick speed payload must be 1 byte, got {actual}")
            }
            Self::Bitstream(err) => write!(f, "bitstream error: {err}"),
        }
    }
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PacketBytes => "packet bytes",
            Self::InputCount => "input count",
        };
        write!(f, "{name}")
    }
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RunOverflow { copies } => {
                write!(f, "run already holds {copies} copies")
            }
            Self::NoOpenRun => write!(f, "no open run to duplicate"),
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Bitstream(err) => Some(err),
            _ => None,
        }
    }
}

impl std::error::Error for EncodeError {}

impl From<BitError> for DecodeError {
    fn from(err: BitError) -> Self {
        Self::Bitstream(err)
    }
}
