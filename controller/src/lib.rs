//! Input controllers for inputsync.
//!
//! Every networked actor has one controller per peer, in one of four roles:
//!
//! - [`PlayerController`] captures input, predicts with it, and streams
//!   redundant packets of every unacknowledged input to the server.
//! - [`ServerController`] reconciles that lossy stream into one input per
//!   tick, relays it to doll peers, and tells the player how fast to tick.
//! - [`DollController`] replays the relayed stream on other peers.
//! - [`NoNetController`] captures and applies in one step, without a network.
//!
//! The embedding application supplies an [`InputHost`] and moves bytes
//! between peers: controllers never touch the transport, they queue
//! [`Outgoing`] messages in their [`Outbox`].
//!
//! # Design Principles
//!
//! - **Lossy transport** - Loss, duplication and reordering are expected and never an error.
//! - **Bounded memory** - Stores have a fixed capacity and throttle instead of growing.
//! - **Single owner** - A controller is driven from one thread, tick by tick.

mod clock;
mod config;
mod doll;
mod driver;
mod error;
mod host;
mod networked;
mod nonet;
mod outbox;
mod peers;
mod pending;
mod player;
mod reconciler;
mod server;
mod store;
mod tracer;
mod types;

#[cfg(test)]
mod test_host;

pub use clock::{SubTickClock, TickRateController};
pub use config::{
    ControllerConfig, MAX_ADDITIONAL_TICK_SPEED, MAX_INPUT_BYTES, MIN_OPTIMAL_QUEUE_DEPTH,
};
pub use doll::DollController;
pub use driver::{advance, replay, TickReport};
pub use error::{ControllerError, ControllerResult};
pub use host::InputHost;
pub use networked::{Controller, NetworkedController};
pub use nonet::NoNetController;
pub use outbox::{ControllerEvent, Outbox, Outgoing};
pub use peers::DollPeers;
pub use pending::{PendingInput, PendingQueue};
pub use player::PlayerController;
pub use reconciler::Reconciler;
pub use server::ServerController;
pub use store::{FrameSnapshot, InputStore};
pub use tracer::NetworkTracer;
pub use types::{InputId, PeerId, Role};

pub use bitstream::{BitError, BitResult, CompressionLevel, InputBuffer};
pub use wire::Limits as WireLimits;
