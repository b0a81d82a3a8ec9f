//! Configurable limits for bounded decoding.

/// Wire-level limits for input packet decoding.
///
/// A run's duplicate byte lets a single payload expand into 256 ids, so the
/// expanded input count is bounded separately from the byte size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum packet size in bytes.
    pub max_packet_bytes: usize,

    /// Maximum number of input ids a packet may expand to.
    pub max_inputs_per_packet: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_packet_bytes: 16 * 1024,
            max_inputs_per_packet: 4096,
        }
    }
}

impl Limits {
    /// Creates limits suitable for testing with smaller values.
    #[must_use]
    pub const fn for_testing() -> Self {
        Self {
            max_packet_bytes: 1024,
            max_inputs_per_packet: 512,
        }
    }

    /// Creates limits with no restrictions (use with caution).
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            max_packet_bytes: usize::MAX,
            max_inputs_per_packet: usize::MAX,
        }
    }
}
