//! Wire framing for inputsync.
//!
//! This crate handles the two unreliable messages of the input pipeline: the
//! redundant input packet a player sends every tick, and the one-byte tick
//! speed notification the server sends back. It treats input payloads as
//! opaque byte spans and learns their length from the caller.
//!
//! # Design Principles
//!
//! - **Fail closed** - A packet is parsed completely before any run is returned.
//! - **Bounded decoding** - Packet size and expanded input count are checked against [`Limits`].
//! - **No domain knowledge** - This crate frames inputs, it never interprets them.

mod error;
mod limits;
mod packet;
mod speed;

pub use error::{DecodeError, EncodeError, LimitKind, WireResult};
pub use limits::Limits;
pub use packet::{
    decode_redundant_packet, encode_redundant_packet, InputRun, PacketWriter, RedundantPacket,
    FIRST_ID_SIZE, MAX_RUN_COPIES,
};
pub use speed::{decode_tick_speed, encode_tick_speed, SPEED_PAYLOAD_SIZE};
