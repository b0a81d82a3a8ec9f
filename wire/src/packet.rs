//! Redundant input packet framing.
//!
//! ```text
//! +-----------------+------------+-----------+------------+-----------+----
//! | first_id: u32le | dup_0: u8  | payload_0 | dup_1: u8  | payload_1 | ...
//! +-----------------+------------+-----------+------------+-----------+----
//! ```
//!
//! Run `k` covers `dup_k + 1` consecutive ids that all carry `payload_k`.
//! Payloads have no length prefix; their size is learned from a callback that
//! measures the encoded input starting at a given bit offset.

use std::ops::Range;

use bitstream::BitReader;

use crate::error::{DecodeError, EncodeError, LimitKind, WireResult};
use crate::limits::Limits;

/// Size of the `first_id` header in bytes.
pub const FIRST_ID_SIZE: usize = 4;

/// Most ids a single run can cover.
pub const MAX_RUN_COPIES: usize = u8::MAX as usize + 1;

/// A run of identical inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputRun<'a> {
    pub first_id: u64,
    pub copies: usize,
    pub payload: &'a [u8],
}

impl InputRun<'_> {
    /// Ids covered by this run.
    #[must_use]
    pub fn ids(&self) -> Range<u64> {
        self.first_id..self.first_id + self.copies as u64
    }
}

/// A fully parsed redundant input packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedundantPacket<'a> {
    pub first_id: u32,
    pub runs: Vec<InputRun<'a>>,
}

impl<'a> RedundantPacket<'a> {
    /// Number of ids covered by all runs.
    #[must_use]
    pub fn input_count(&self) -> usize {
        self.runs.iter().map(|run| run.copies).sum()
    }

    /// Newest id in the packet.
    #[must_use]
    pub fn last_id(&self) -> Option<u64> {
        self.runs.last().map(|run| run.ids().end - 1)
    }

    /// Expands runs into `(id, payload)` pairs, oldest first.
    pub fn inputs(&self) -> impl Iterator<Item = (u64, &'a [u8])> + '_ {
        self.runs
            .iter()
            .flat_map(|run| run.ids().map(move |id| (id, run.payload)))
    }
}

/// Parses a redundant input packet.
///
/// `payload_bits` receives the bit offset of each run's payload inside `buf`
/// and returns how many bits that input occupies, or `None` if the input
/// cannot be measured. Every run is validated before anything is returned.
pub fn decode_redundant_packet<'a, F>(
    buf: &'a [u8],
    limits: &Limits,
    mut payload_bits: F,
) -> WireResult<RedundantPacket<'a>>
where
    F: FnMut(usize) -> Option<usize>,
{
    if buf.len() < FIRST_ID_SIZE {
        return Err(DecodeError::PacketTooSmall {
            actual: buf.len(),
            required: FIRST_ID_SIZE,
        });
    }
    if buf.len() > limits.max_packet_bytes {
        return Err(DecodeError::LimitsExceeded {
            kind: LimitKind::PacketBytes,
            limit: limits.max_packet_bytes,
            actual: buf.len(),
        });
    }

    let mut reader = BitReader::new(buf);
    let first_id = reader.read_u32_aligned()?;
    let mut next_id = u64::from(first_id);
    let mut total = 0usize;
    let mut runs = Vec::new();

    while !reader.is_empty() {
        let copies = usize::from(reader.read_u8_aligned()?) + 1;
        total += copies;
        if total > limits.max_inputs_per_packet {
            return Err(DecodeError::LimitsExceeded {
                kind: LimitKind::InputCount,
                limit: limits.max_inputs_per_packet,
                actual: total,
            });
        }

        let bit_offset = reader.bit_position();
        let offset = bit_offset / 8;
        let needed = payload_bits(bit_offset)
            .ok_or(DecodeError::PayloadSizeUnknown { offset })?
            .div_ceil(8);
        let available = reader.bits_remaining() / 8;
        if needed > available {
            return Err(DecodeError::PayloadOverrun {
                offset,
                needed,
                available,
            });
        }
        let payload = reader.read_byte_slice(needed)?;

        runs.push(InputRun {
            first_id: next_id,
            copies,
            payload,
        });
        next_id += copies as u64;
    }

    Ok(RedundantPacket { first_id, runs })
}

/// Incremental encoder for redundant input packets.
///
/// Each run's duplicate byte is patched in place as copies are added.
#[derive(Debug, Clone)]
pub struct PacketWriter {
    bytes: Vec<u8>,
    open_run: Option<usize>,
    inputs: usize,
}

impl PacketWriter {
    #[must_use]
    pub fn new(first_id: u32) -> Self {
        let mut bytes = Vec::with_capacity(64);
        bytes.extend_from_slice(&first_id.to_le_bytes());
        Self {
            bytes,
            open_run: None,
            inputs: 0,
        }
    }

    /// Opens a new run carrying `payload`.
    pub fn push_input(&mut self, payload: &[u8]) {
        self.open_run = Some(self.bytes.len());
        self.bytes.push(0);
        self.bytes.extend_from_slice(payload);
        self.inputs += 1;
    }

    /// Whether the open run can take one more copy.
    #[must_use]
    pub fn can_duplicate(&self) -> bool {
        self.open_run
            .is_some_and(|at| self.bytes[at] < u8::MAX)
    }

    /// Extends the open run by one id.
    pub fn duplicate_last(&mut self) -> Result<(), EncodeError> {
        let at = self.open_run.ok_or(EncodeError::NoOpenRun)?;
        let dup = self.bytes[at];
        if dup == u8::MAX {
            return Err(EncodeError::RunOverflow {
                copies: MAX_RUN_COPIES,
            });
        }
        self.bytes[at] = dup + 1;
        self.inputs += 1;
        Ok(())
    }

    /// Number of ids written so far.
    #[must_use]
    pub const fn input_count(&self) -> usize {
        self.inputs
    }

    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        self.bytes
    }
}

/// Encodes consecutive inputs starting at `first_id`, merging neighbours
/// for which `equivalent` holds into one run.
pub fn encode_redundant_packet<'p, I, F>(first_id: u32, inputs: I, mut equivalent: F) -> Vec<u8>
where
    I: IntoIterator<Item = &'p [u8]>,
    F: FnMut(&[u8], &[u8]) -> bool,
{
    let mut writer = PacketWriter::new(first_id);
    let mut previous: Option<&[u8]> = None;
    for payload in inputs {
        let merge = previous.is_some_and(|prev| equivalent(prev, payload));
        if merge && writer.can_duplicate() {
            // Checked by `can_duplicate`.
            let _ = writer.duplicate_last();
        } else {
            writer.push_input(payload);
            previous = Some(payload);
        }
    }
    writer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed(bits: usize) -> impl FnMut(usize) -> Option<usize> {
        move |_| Some(bits)
    }

    #[test]
    fn decode_rejects_short_packet() {
        let err = decode_redundant_packet(&[1, 2, 3], &Limits::default(), fixed(8)).unwrap_err();
        assert_eq!(
            err,
            DecodeError::PacketTooSmall {
                actual: 3,
                required: 4
            }
        );
    }

    #[test]
    fn decode_header_only_has_no_runs() {
        let header = 7u32.to_le_bytes();
        let packet = decode_redundant_packet(&header, &Limits::default(), fixed(8)).unwrap();
        assert_eq!(packet.first_id, 7);
        assert!(packet.runs.is_empty());
        assert_eq!(packet.last_id(), None);
    }

    #[test]
    fn decode_expands_runs() {
        let buf = [10, 0, 0, 0, 2, 0xAA, 0, 0xBB];
        let packet = decode_redundant_packet(&buf, &Limits::default(), fixed(8)).unwrap();
        assert_eq!(packet.input_count(), 4);
        let inputs: Vec<_> = packet.inputs().collect();
        assert_eq!(
            inputs,
            vec![
                (10, &[0xAA][..]),
                (11, &[0xAA][..]),
                (12, &[0xAA][..]),
                (13, &[0xBB][..])
            ]
        );
        assert_eq!(packet.last_id(), Some(13));
    }

    #[test]
    fn decode_rounds_bits_up_to_bytes() {
        let buf = [0, 0, 0, 0, 0, 0xF0, 0x80, 1, 0xFF, 0x00];
        let packet = decode_redundant_packet(&buf, &Limits::default(), fixed(9)).unwrap();
        assert_eq!(packet.runs.len(), 2);
        assert_eq!(packet.runs[0].payload, &[0xF0, 0x80]);
        assert_eq!(packet.runs[1].ids(), 1..3);
    }

    #[test]
    fn decode_passes_payload_bit_offsets() {
        let buf = [0, 0, 0, 0, 0, 1, 0, 2];
        let mut offsets = Vec::new();
        decode_redundant_packet(&buf, &Limits::default(), |offset| {
            offsets.push(offset);
            Some(8)
        })
        .unwrap();
        assert_eq!(offsets, vec![40, 56]);
    }

    #[test]
    fn decode_rejects_overrun() {
        let buf = [0, 0, 0, 0, 0, 0xAA];
        let err = decode_redundant_packet(&buf, &Limits::default(), fixed(16)).unwrap_err();
        assert_eq!(
            err,
            DecodeError::PayloadOverrun {
                offset: 5,
                needed: 2,
                available: 1
            }
        );
    }

    #[test]
    fn decode_rejects_unmeasurable_payload() {
        let buf = [0, 0, 0, 0, 0, 0xAA];
        let err = decode_redundant_packet(&buf, &Limits::default(), |_| None).unwrap_err();
        assert_eq!(err, DecodeError::PayloadSizeUnknown { offset: 5 });
    }

    #[test]
    fn decode_enforces_input_limit() {
        let buf = [0, 0, 0, 0, 255, 1, 255, 2];
        let limits = Limits {
            max_inputs_per_packet: 300,
            ..Limits::default()
        };
        let err = decode_redundant_packet(&buf, &limits, fixed(8)).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::LimitsExceeded {
                kind: LimitKind::InputCount,
                actual: 512,
                ..
            }
        ));
    }

    #[test]
    fn decode_enforces_packet_size() {
        let buf = vec![0u8; 2048];
        let err = decode_redundant_packet(&buf, &Limits::for_testing(), fixed(8)).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::LimitsExceeded {
                kind: LimitKind::PacketBytes,
                ..
            }
        ));
    }

    #[test]
    fn zero_sized_payloads_still_advance() {
        let buf = [0, 0, 0, 0, 3, 0];
        let packet = decode_redundant_packet(&buf, &Limits::default(), fixed(0)).unwrap();
        assert_eq!(packet.input_count(), 5);
        assert!(packet.runs.iter().all(|run| run.payload.is_empty()));
    }

    #[test]
    fn writer_patches_duplicate_bytes() {
        let mut writer = PacketWriter::new(3);
        assert_eq!(writer.duplicate_last(), Err(EncodeError::NoOpenRun));
        writer.push_input(&[0x11]);
        writer.duplicate_last().unwrap();
        writer.duplicate_last().unwrap();
        writer.push_input(&[0x22]);
        assert_eq!(writer.input_count(), 4);
        assert_eq!(writer.finish(), vec![3, 0, 0, 0, 2, 0x11, 0, 0x22]);
    }

    #[test]
    fn writer_caps_run_length() {
        let mut writer = PacketWriter::new(0);
        writer.push_input(&[1]);
        for _ in 0..255 {
            writer.duplicate_last().unwrap();
        }
        assert!(!writer.can_duplicate());
        assert_eq!(
            writer.duplicate_last(),
            Err(EncodeError::RunOverflow { copies: 256 })
        );
    }

    #[test]
    fn encode_splits_long_runs() {
        let payload = [9u8];
        let inputs = vec![&payload[..]; 300];
        let bytes = encode_redundant_packet(0, inputs, |a, b| a == b);
        let packet = decode_redundant_packet(&bytes, &Limits::default(), fixed(8)).unwrap();
        assert_eq!(packet.runs.len(), 2);
        assert_eq!(packet.runs[0].copies, 256);
        assert_eq!(packet.runs[1].copies, 44);
    }
}
