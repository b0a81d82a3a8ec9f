//! Messages and notifications leaving a controller.

use std::collections::VecDeque;

use crate::types::PeerId;

/// A message the host must deliver for the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    /// Redundant input packet for the server, sent unreliably.
    ServerInputs(Vec<u8>),
    /// Speed bias byte for the governed peer, sent unreliably.
    TickSpeed(u8),
    /// An input packet relayed unmodified to a doll peer, sent unreliably.
    DollInputs { peer: PeerId, packet: Vec<u8> },
    /// Doll flow state for `peer`, sent reliably.
    DollStatus { peer: PeerId, open: bool },
}

/// Local notifications for the embedding application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerEvent {
    DollCommunicationOpened,
    DollCommunicationClosed,
}

/// Queued messages and events, drained by the host after each tick.
#[derive(Debug, Clone, Default)]
pub struct Outbox {
    messages: VecDeque<Outgoing>,
    events: VecDeque<ControllerEvent>,
}

impl Outbox {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Outgoing) {
        self.messages.push_back(message);
    }

    pub fn emit(&mut self, event: ControllerEvent) {
        self.events.push_back(event);
    }

    /// Takes every queued message, oldest first.
    pub fn drain_messages(&mut self) -> impl Iterator<Item = Outgoing> + '_ {
        self.messages.drain(..)
    }

    /// Takes every queued event, oldest first.
    pub fn drain_events(&mut self) -> impl Iterator<Item = ControllerEvent> + '_ {
        self.events.drain(..)
    }

    #[must_use]
    pub fn pending_messages(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.events.is_empty()
    }
}
