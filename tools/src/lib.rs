//! Introspection and debugging tools for inputsync packets.
//!
//! Input payloads are opaque to the wire format, so every tool here is told
//! how wide one input is. Captures written by the network simulator use a
//! fixed width, which makes them inspectable without the game's host code.
//!
//! # Design Principles
//!
//! - **First-class tooling** - These tools are part of the product, not afterthoughts.
//! - **Human-readable output** - Make it easy to see how redundancy compresses.

use std::fmt::Write as _;

use serde::Serialize;
use wire::{decode_redundant_packet, Limits, WireResult, FIRST_ID_SIZE};

/// Shape of one redundant packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InspectReport {
    pub first_id: u32,
    pub last_id: Option<u64>,
    pub input_count: usize,
    pub packet_bytes: usize,
    /// Bytes the same inputs would take without run merging.
    pub expanded_bytes: usize,
    pub runs: Vec<RunSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub first_id: u64,
    pub copies: usize,
    pub payload_bytes: usize,
}

/// A packet expanded to one entry per input id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedPacket {
    pub first_id: u32,
    pub inputs: Vec<DecodedInput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedInput {
    pub id: u64,
    pub payload: String,
}

/// Parses `bytes` assuming every input is `payload_bits` wide.
pub fn inspect_packet(
    bytes: &[u8],
    payload_bits: usize,
    limits: &Limits,
) -> WireResult<InspectReport> {
    let packet = decode_redundant_packet(bytes, limits, |_| Some(payload_bits))?;
    let runs: Vec<RunSummary> = packet
        .runs
        .iter()
        .map(|run| RunSummary {
            first_id: run.first_id,
            copies: run.copies,
            payload_bytes: run.payload.len(),
        })
        .collect();
    let expanded_bytes = FIRST_ID_SIZE
        + runs
            .iter()
            .map(|run| run.copies * (run.payload_bytes + 1))
            .sum::<usize>();
    Ok(InspectReport {
        first_id: packet.first_id,
        last_id: packet.last_id(),
        input_count: packet.input_count(),
        packet_bytes: bytes.len(),
        expanded_bytes,
        runs,
    })
}

/// Expands `bytes` into `(id, hex payload)` entries.
pub fn decode_packet_json(
    bytes: &[u8],
    payload_bits: usize,
    limits: &Limits,
) -> WireResult<DecodedPacket> {
    let packet = decode_redundant_packet(bytes, limits, |_| Some(payload_bits))?;
    Ok(DecodedPacket {
        first_id: packet.first_id,
        inputs: packet
            .inputs()
            .map(|(id, payload)| DecodedInput {
                id,
                payload: to_hex(payload),
            })
            .collect(),
    })
}

/// One line per input id.
pub fn format_decode_pretty(decoded: &DecodedPacket) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "first_id: {}", decoded.first_id);
    for input in &decoded.inputs {
        let _ = writeln!(out, "  #{:<10} {}", input.id, input.payload);
    }
    out
}

pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, byte| {
        let _ = write!(out, "{byte:02x}");
        out
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wire::{encode_redundant_packet, DecodeError};

    fn sample() -> Vec<u8> {
        let payloads: [&[u8]; 4] = [&[0xab, 0x01], &[0xab, 0x01], &[0xab, 0x01], &[0x10, 0x00]];
        encode_redundant_packet(7, payloads, |a, b| a == b)
    }

    #[test]
    fn inspect_reports_runs() {
        let report = inspect_packet(&sample(), 16, &Limits::default()).unwrap();
        assert_eq!(report.first_id, 7);
        assert_eq!(report.last_id, Some(10));
        assert_eq!(report.input_count, 4);
        assert_eq!(report.packet_bytes, 4 + 3 + 3);
        assert_eq!(report.expanded_bytes, 4 + 4 * 3);
        assert_eq!(
            report.runs,
            vec![
                RunSummary {
                    first_id: 7,
                    copies: 3,
                    payload_bytes: 2
                },
                RunSummary {
                    first_id: 10,
                    copies: 1,
                    payload_bytes: 2
                },
            ]
        );
    }

    #[test]
    fn wrong_width_is_rejected() {
        let err = inspect_packet(&sample(), 24, &Limits::default()).unwrap_err();
        assert!(matches!(err, DecodeError::PayloadOverrun { .. }));
    }

    #[test]
    fn decode_expands_runs() {
        let decoded = decode_packet_json(&sample(), 16, &Limits::default()).unwrap();
        let ids: Vec<u64> = decoded.inputs.iter().map(|input| input.id).collect();
        assert_eq!(ids, vec![7, 8, 9, 10]);
        assert_eq!(decoded.inputs[0].payload, "ab01");
        assert_eq!(decoded.inputs[3].payload, "1000");

        let pretty = format_decode_pretty(&decoded);
        assert!(pretty.starts_with("first_id: 7\n"));
        assert_eq!(pretty.lines().count(), 5);
    }

    #[test]
    fn json_output_is_stable() {
        let decoded = decode_packet_json(&sample(), 16, &Limits::default()).unwrap();
        let json = serde_json::to_value(&decoded).unwrap();
        assert_eq!(json["inputs"][1]["id"], 8);
        assert_eq!(json["inputs"][1]["payload"], "ab01");
    }
}
