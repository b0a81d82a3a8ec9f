//! Error types for controller operations.

use std::fmt;

use bitstream::BitError;
use wire::{DecodeError, EncodeError};

use crate::types::{InputId, PeerId, Role};

/// Result type for controller operations.
pub type ControllerResult<T> = Result<T, ControllerError>;

/// Errors raised by controllers.
///
/// `Decode` is a rejected packet and leaves the controller untouched.
/// `RoleMismatch` and `Desync` indicate a wiring bug or a corrupted id space
/// and should be treated as fatal by the caller.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ControllerError {
    /// Input buffer misuse or a host callback failure.
    Bit(BitError),

    /// A received message was malformed.
    Decode(DecodeError),

    /// Packet encoding failed.
    Encode(EncodeError),

    /// An operation was sent to a role that never performs it.
    RoleMismatch {
        role: Role,
        operation: &'static str,
    },

    /// After an acknowledgment the oldest stored input is not the next id.
    Desync {
        acknowledged: InputId,
        next: InputId,
    },

    /// Input ids must be strictly increasing.
    OutOfOrder { previous: InputId, current: InputId },

    /// The input store is at capacity.
    StoreFull { capacity: usize },

    /// The master peer cannot be managed as a doll.
    MasterPeer { peer: PeerId },

    /// No stored input at this index.
    IndexOutOfRange { index: usize, len: usize },

    /// A configuration value is outside its allowed range.
    InvalidConfig { field: &'static str, value: f64 },
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bit(err) => write!(f, "input buffer error: {err}"),
            Self::Decode(err) => write!(f, "rejected message: {err}"),
            Self::Encode(err) => write!(f, "encode error: {err}"),
            Self::RoleMismatch { role, operation } => {
                write!(f, "{operation} is not supported by a {role} controller")
            }
            Self::Desync { acknowledged, next } => {
                write!(
                    f,
                    "desync: acknowledged {acknowledged} but oldest stored input is {next}"
                )
            }
            Self::OutOfOrder { previous, current } => {
                write!(f, "input {current} stored after {previous}")
            }
            Self::StoreFull { capacity } => {
                write!(f, "input store full ({capacity} inputs)")
            }
            Self::MasterPeer { peer } => {
                write!(f, "{peer} is the master peer and cannot be a doll")
            }
            Self::IndexOutOfRange { index, len } => {
                write!(f, "no stored input at index {index} (have {len})")
            }
            Self::InvalidConfig { field, value } => {
                write!(f, "configuration value {field} = {value} is out of range")
            }
        }
    }
}

impl std::error::Error for ControllerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Bit(err) => Some(err),
            Self::Decode(err) => Some(err),
            Self::Encode(err) => Some(err),
            _ => None,
        }
    }
}

impl From<BitError> for ControllerError {
    fn from(err: BitError) -> Self {
        Self::Bit(err)
    }
}

impl From<DecodeError> for ControllerError {
    fn from(err: DecodeError) -> Self {
        Self::Decode(err)
    }
}

impl From<EncodeError> for ControllerError {
    fn from(err: EncodeError) -> Self {
        Self::Encode(err)
    }
}
