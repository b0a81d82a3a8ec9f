//! The authority consuming a player's input stream.

use log::debug;
use wire::Limits;

use crate::clock::TickRateController;
use crate::config::ControllerConfig;
use crate::error::ControllerResult;
use crate::host::InputHost;
use crate::networked::Controller;
use crate::outbox::{Outbox, Outgoing};
use crate::peers::DollPeers;
use crate::reconciler::Reconciler;
use crate::types::{InputId, PeerId, Role};

/// Applies exactly one of the player's inputs per tick, relays the raw
/// stream to doll peers, and steers the player's tick rate.
#[derive(Debug)]
pub struct ServerController<H> {
    host: H,
    config: ControllerConfig,
    reconciler: Reconciler,
    rate: TickRateController,
    peers: DollPeers,
    has_new_input: bool,
    outbox: Outbox,
}

impl<H: InputHost> ServerController<H> {
    /// Creates a server for the actor owned by `master`.
    pub fn new(host: H, config: ControllerConfig, master: PeerId) -> ControllerResult<Self> {
        let limits = config.wire_limits();
        Self::with_limits(host, config, master, limits)
    }

    pub fn with_limits(
        host: H,
        config: ControllerConfig,
        master: PeerId,
        limits: Limits,
    ) -> ControllerResult<Self> {
        config.validate()?;
        Ok(Self {
            host,
            reconciler: Reconciler::with_limits(&config, limits),
            config,
            rate: TickRateController::new(),
            peers: DollPeers::new(master),
            has_new_input: false,
            outbox: Outbox::new(),
        })
    }

    pub fn peer_connected(&mut self, peer: PeerId) {
        self.peers.peer_connected(peer);
    }

    pub fn peer_disconnected(&mut self, peer: PeerId) {
        self.peers.peer_disconnected(peer);
    }

    /// Starts or stops relaying inputs to a doll peer.
    pub fn set_doll_peer_active(&mut self, peer: PeerId, active: bool) -> ControllerResult<()> {
        self.peers.set_active(peer, active, &mut self.outbox)
    }

    #[must_use]
    pub const fn doll_peers(&self) -> &DollPeers {
        &self.peers
    }

    #[must_use]
    pub const fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    #[must_use]
    pub const fn tick_rate(&self) -> &TickRateController {
        &self.rate
    }

    #[must_use]
    pub const fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }
}

impl<H: InputHost> Controller for ServerController<H> {
    fn role(&self) -> Role {
        Role::Server
    }

    fn process(&mut self, delta: f32) -> ControllerResult<()> {
        self.has_new_input = self.reconciler.fetch_next_input(&mut self.host)?;
        if self.reconciler.current_input_id().is_none() || !self.reconciler.has_payload() {
            return Ok(());
        }

        let inputs = self.reconciler.inputs_mut();
        inputs.begin_read();
        self.host.controller_process(delta, inputs)?;

        self.rate.update(
            self.reconciler.missing_packets(),
            self.reconciler.pending().len(),
            delta,
            &self.config,
        );
        if let Some(speed) = self.rate.poll_notification(delta, &self.config) {
            self.outbox.push(Outgoing::TickSpeed(speed));
        }
        Ok(())
    }

    fn receive_inputs(&mut self, packet: &[u8]) -> ControllerResult<usize> {
        for peer in self.peers.active() {
            self.outbox.push(Outgoing::DollInputs {
                peer,
                packet: packet.to_vec(),
            });
        }
        let inserted = self.reconciler.receive_inputs(packet, &mut self.host)?;
        if inserted == 0 {
            debug!("input packet carried nothing new");
        }
        Ok(inserted)
    }

    fn sub_ticks(&mut self, _delta: f32, _iterations_per_second: f32) -> u32 {
        1
    }

    fn last_known_input(&self) -> Option<InputId> {
        self.reconciler.last_known_input()
    }

    fn current_input_id(&self) -> Option<InputId> {
        self.reconciler.current_input_id()
    }

    fn has_new_input(&self) -> bool {
        self.has_new_input
    }

    fn outbox(&mut self) -> &mut Outbox {
        &mut self.outbox
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ControllerError;
    use crate::player::PlayerController;
    use crate::test_host::{payload, ScriptHost};
    use bitstream::{BitResult, CompressionLevel, InputBuffer};
    use wire::encode_redundant_packet;

    fn packet(first_id: u32, values: &[i64]) -> Vec<u8> {
        let payloads: Vec<Vec<u8>> = values.iter().map(|v| payload(*v)).collect();
        encode_redundant_packet(first_id, payloads.iter().map(Vec::as_slice), |a, b| a == b)
    }

    fn server() -> ServerController<ScriptHost> {
        ServerController::new(
            ScriptHost::default(),
            ControllerConfig::for_testing(),
            PeerId::new(1),
        )
        .unwrap()
    }

    #[test]
    fn idle_until_first_input() {
        let mut server = server();
        server.process(0.1).unwrap();
        assert_eq!(server.current_input_id(), None);
        assert!(server.host().applied.is_empty());
        assert!(server.outbox().is_empty());
    }

    #[test]
    fn applies_one_input_per_tick() {
        let mut server = server();
        assert_eq!(server.receive_inputs(&packet(0, &[3, 3, 5])).unwrap(), 3);
        for _ in 0..4 {
            server.process(0.1).unwrap();
        }
        // The fourth tick is a ghost tick replaying the last input.
        assert_eq!(server.host().applied, vec![3, 3, 5, 5]);
        assert!(!server.has_new_input());
        assert_eq!(server.current_input_id(), Some(InputId::new(2)));
    }

    #[test]
    fn sends_speed_notifications() {
        let mut server = server();
        server.receive_inputs(&packet(0, &[1; 20])).unwrap();
        for _ in 0..10 {
            server.process(0.05).unwrap();
        }
        let speeds = server
            .outbox()
            .drain_messages()
            .filter(|message| matches!(message, Outgoing::TickSpeed(_)))
            .count();
        assert!(speeds >= 4, "{speeds} notifications");
    }

    #[test]
    fn relays_to_active_dolls_only() {
        let mut server = server();
        server.peer_connected(PeerId::new(2));
        server.peer_connected(PeerId::new(3));
        server.set_doll_peer_active(PeerId::new(3), false).unwrap();
        server.outbox().drain_messages().for_each(drop);

        let bytes = packet(0, &[1]);
        server.receive_inputs(&bytes).unwrap();
        let relayed: Vec<_> = server.outbox().drain_messages().collect();
        assert_eq!(
            relayed,
            vec![Outgoing::DollInputs {
                peer: PeerId::new(2),
                packet: bytes
            }]
        );
    }

    #[test]
    fn malformed_packet_is_still_relayed_but_rejected() {
        let mut server = server();
        server.peer_connected(PeerId::new(2));
        assert!(matches!(
            server.receive_inputs(&[1, 2]),
            Err(ControllerError::Decode(_))
        ));
        assert_eq!(server.outbox().pending_messages(), 1);
        assert!(server.reconciler().pending().is_empty());
    }

    /// Three 64-bit ints per tick: 24-byte inputs.
    #[derive(Default)]
    struct WideHost {
        ticks: i64,
        applied: usize,
    }

    impl InputHost for WideHost {
        fn collect_inputs(&mut self, _delta: f32, inputs: &mut InputBuffer) -> BitResult<()> {
            self.ticks += 1;
            for lane in 0..3 {
                inputs.add_int(self.ticks * 3 + lane, CompressionLevel::Level0)?;
            }
            Ok(())
        }

        fn controller_process(&mut self, _delta: f32, inputs: &mut InputBuffer) -> BitResult<()> {
            for _ in 0..3 {
                inputs.read_int(CompressionLevel::Level0)?;
            }
            self.applied += 1;
            Ok(())
        }

        fn are_inputs_different(
            &mut self,
            a: &mut InputBuffer,
            b: &mut InputBuffer,
        ) -> BitResult<bool> {
            Ok(a.read_int(CompressionLevel::Level0)? != b.read_int(CompressionLevel::Level0)?)
        }

        fn count_input_size(&mut self, inputs: &mut InputBuffer) -> BitResult<usize> {
            inputs.skip(192)?;
            Ok(192)
        }
    }

    #[test]
    fn accepts_full_window_at_largest_config() {
        let config = ControllerConfig {
            player_input_storage_size: 2000,
            max_redundant_inputs: 1000,
            ..ControllerConfig::default()
        };
        let mut player = PlayerController::new(WideHost::default(), config.clone()).unwrap();
        let mut last = Vec::new();
        for _ in 0..1200 {
            player.process(1.0 / 60.0).unwrap();
            for message in player.outbox().drain_messages() {
                if let Outgoing::ServerInputs(packet) = message {
                    last = packet;
                }
            }
        }
        assert!(last.len() > Limits::default().max_packet_bytes, "{} bytes", last.len());

        let mut server = ServerController::new(WideHost::default(), config, PeerId::new(1)).unwrap();
        assert_eq!(server.receive_inputs(&last).unwrap(), 1001);
        server.process(1.0 / 60.0).unwrap();
        assert_eq!(server.current_input_id(), Some(InputId::new(199)));
        assert_eq!(server.host().applied, 1);
    }

    #[test]
    fn player_operations_are_refused() {
        let mut server = server();
        assert_eq!(server.sub_ticks(1.0, 60.0), 1);
        assert!(matches!(
            server.notify_input_checked(InputId::new(0)),
            Err(ControllerError::RoleMismatch {
                role: Role::Server,
                ..
            })
        ));
        assert!(server.process_instant(0, 0.1).is_err());
        assert!(matches!(
            server.set_doll_peer_active(PeerId::new(1), true),
            Err(ControllerError::MasterPeer { .. })
        ));
    }
}
