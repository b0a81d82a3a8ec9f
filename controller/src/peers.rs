//! Doll peers served by a server controller.

use std::collections::BTreeMap;

use log::debug;

use crate::error::{ControllerError, ControllerResult};
use crate::outbox::{Outbox, Outgoing};
use crate::types::PeerId;

/// Peers that mirror the governed actor, with their flow state.
///
/// The master peer owns the actor and is never a doll.
#[derive(Debug, Clone)]
pub struct DollPeers {
    master: PeerId,
    peers: BTreeMap<PeerId, bool>,
}

impl DollPeers {
    #[must_use]
    pub const fn new(master: PeerId) -> Self {
        Self {
            master,
            peers: BTreeMap::new(),
        }
    }

    #[must_use]
    pub const fn master(&self) -> PeerId {
        self.master
    }

    /// Registers a peer as an active doll. The master and known peers are
    /// ignored.
    pub fn peer_connected(&mut self, peer: PeerId) {
        if peer == self.master {
            return;
        }
        self.peers.entry(peer).or_insert_with(|| {
            debug!("{peer} added as doll");
            true
        });
    }

    pub fn peer_disconnected(&mut self, peer: PeerId) {
        if self.peers.remove(&peer).is_some() {
            debug!("{peer} removed from dolls");
        }
    }

    /// Opens or closes the flow to `peer`, queueing a status message when it
    /// changes. Unknown peers are registered first.
    pub fn set_active(
        &mut self,
        peer: PeerId,
        active: bool,
        outbox: &mut Outbox,
    ) -> ControllerResult<()> {
        if peer == self.master {
            return Err(ControllerError::MasterPeer { peer });
        }
        let state = self.peers.entry(peer).or_insert(true);
        if *state != active {
            *state = active;
            outbox.push(Outgoing::DollStatus { peer, open: active });
        }
        Ok(())
    }

    #[must_use]
    pub fn is_active(&self, peer: PeerId) -> Option<bool> {
        self.peers.get(&peer).copied()
    }

    pub fn active(&self) -> impl Iterator<Item = PeerId> + '_ {
        self.peers
            .iter()
            .filter(|(_, active)| **active)
            .map(|(peer, _)| *peer)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
