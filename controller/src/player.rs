//! The peer that owns an actor and captures its input.

use bitstream::InputBuffer;
use log::{debug, warn};
use wire::decode_tick_speed;

use crate::clock::SubTickClock;
use crate::config::{ControllerConfig, MAX_ADDITIONAL_TICK_SPEED};
use crate::error::{ControllerError, ControllerResult};
use crate::host::InputHost;
use crate::networked::Controller;
use crate::outbox::{Outbox, Outgoing};
use crate::store::InputStore;
use crate::types::{InputId, Role};

/// Captures one input per tick, predicts with it, and streams every
/// unacknowledged input to the server.
#[derive(Debug)]
pub struct PlayerController<H> {
    host: H,
    config: ControllerConfig,
    store: InputStore,
    inputs: InputBuffer,
    next_input_id: InputId,
    current_input_id: Option<InputId>,
    has_new_input: bool,
    tick_speed: f32,
    clock: SubTickClock,
    outbox: Outbox,
}

impl<H: InputHost> PlayerController<H> {
    pub fn new(host: H, config: ControllerConfig) -> ControllerResult<Self> {
        config.validate()?;
        Ok(Self {
            host,
            store: InputStore::new(config.player_input_storage_size),
            config,
            inputs: InputBuffer::new(),
            next_input_id: InputId::default(),
            current_input_id: None,
            has_new_input: false,
            tick_speed: 0.0,
            clock: SubTickClock::new(),
            outbox: Outbox::new(),
        })
    }

    /// Applies a speed notification from the server.
    pub fn receive_tick_speed(&mut self, payload: &[u8]) -> ControllerResult<()> {
        match decode_tick_speed(payload, MAX_ADDITIONAL_TICK_SPEED) {
            Ok(speed) => {
                self.tick_speed = speed;
                Ok(())
            }
            Err(err) => {
                warn!("rejected tick speed notification: {err}");
                Err(err.into())
            }
        }
    }

    /// `true` when the last tick skipped capture because the store is full.
    #[must_use]
    pub fn is_throttled(&self) -> bool {
        !self.has_new_input && self.store.is_full()
    }

    #[must_use]
    pub const fn tick_speed(&self) -> f32 {
        self.tick_speed
    }

    #[must_use]
    pub fn stored_input_count(&self) -> usize {
        self.store.len()
    }

    #[must_use]
    pub fn last_stored_input_id(&self) -> Option<InputId> {
        self.store.last().map(|frame| frame.id)
    }

    #[must_use]
    pub const fn store(&self) -> &InputStore {
        &self.store
    }

    #[must_use]
    pub const fn config(&self) -> &ControllerConfig {
        &self.config
    }

    #[must_use]
    pub const fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Puts the newest stored input back after an aborted capture.
    fn restore_last_input(&mut self) {
        match self.store.last() {
            Some(frame) => self.inputs.load(&frame.inputs),
            None => self.inputs.load(&[]),
        }
    }
}

impl<H: InputHost> Controller for PlayerController<H> {
    fn role(&self) -> Role {
        Role::Player
    }

    fn process(&mut self, delta: f32) -> ControllerResult<()> {
        // Ids are committed only once the input is stored.
        let captured = if self.store.is_full() {
            debug!(
                "input store full ({} inputs), capture skipped",
                self.store.capacity()
            );
            None
        } else {
            self.inputs.begin_write();
            if let Err(err) = self.host.collect_inputs(delta, &mut self.inputs) {
                self.has_new_input = false;
                self.restore_last_input();
                return Err(err.into());
            }
            self.inputs.dry();
            Some(self.next_input_id)
        };
        self.has_new_input = captured.is_some();

        // Prediction runs even while capture is throttled.
        self.inputs.begin_read();
        if let Err(err) = self.host.controller_process(delta, &mut self.inputs) {
            if captured.is_some() {
                self.has_new_input = false;
                self.restore_last_input();
            }
            return Err(err.into());
        }

        if let Some(id) = captured {
            self.store.insert(id, self.inputs.as_bytes().to_vec())?;
            self.next_input_id = id.next();
            self.current_input_id = Some(id);
            let packet = self
                .store
                .encode_redundant(self.config.max_redundant_inputs, &mut self.host)?;
            self.outbox.push(Outgoing::ServerInputs(packet));
        }
        Ok(())
    }

    fn sub_ticks(&mut self, delta: f32, iterations_per_second: f32) -> u32 {
        self.clock
            .sub_ticks(delta, iterations_per_second, self.tick_speed)
    }

    fn notify_input_checked(&mut self, id: InputId) -> ControllerResult<()> {
        self.store.acknowledge(id)?;
        Ok(())
    }

    fn last_known_input(&self) -> Option<InputId> {
        self.last_stored_input_id()
    }

    fn stored_input_id(&self, index: usize) -> Option<InputId> {
        self.store.stored_id(index)
    }

    fn process_instant(&mut self, index: usize, delta: f32) -> ControllerResult<bool> {
        let len = self.store.len();
        let frame = self
            .store
            .get(index)
            .ok_or(ControllerError::IndexOutOfRange { index, len })?;
        self.inputs.load(&frame.inputs);
        self.host.controller_process(delta, &mut self.inputs)?;
        Ok(index + 1 < len)
    }

    fn current_input_id(&self) -> Option<InputId> {
        self.current_input_id
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
    use crate::test_host::{payload, ScriptHost};
    use bitstream::{BitError, BitResult};
    use wire::{decode_redundant_packet, encode_tick_speed, Limits};

    fn player(script: &[i64], capacity: usize) -> PlayerController<ScriptHost> {
        let config = ControllerConfig {
            player_input_storage_size: capacity,
            ..ControllerConfig::for_testing()
        };
        PlayerController::new(ScriptHost::with_script(script), config).unwrap()
    }

    fn sent_packets(player: &mut PlayerController<ScriptHost>) -> Vec<Vec<u8>> {
        player
            .outbox()
            .drain_messages()
            .filter_map(|message| match message {
                Outgoing::ServerInputs(packet) => Some(packet),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn captures_applies_and_sends() {
        let mut player = player(&[4, 4, 9], 16);
        for _ in 0..3 {
            player.process(1.0 / 60.0).unwrap();
        }
        assert_eq!(player.host().applied, vec![4, 4, 9]);
        assert_eq!(player.current_input_id(), Some(InputId::new(2)));
        assert!(player.has_new_input());

        let packets = sent_packets(&mut player);
        assert_eq!(packets.len(), 3);
        let last = decode_redundant_packet(&packets[2], &Limits::default(), |_| Some(8)).unwrap();
        let inputs: Vec<_> = last.inputs().map(|(id, bytes)| (id, bytes.to_vec())).collect();
        assert_eq!(
            inputs,
            vec![(0, payload(4)), (1, payload(4)), (2, payload(9))]
        );
    }

    #[test]
    fn backpressure_keeps_simulating() {
        let mut player = player(&[1, 2, 3, 4, 5], 3);
        for _ in 0..3 {
            player.process(0.1).unwrap();
        }
        assert_eq!(player.stored_input_count(), 3);
        assert!(!player.is_throttled());

        player.process(0.1).unwrap();
        assert_eq!(player.stored_input_count(), 3);
        assert!(player.is_throttled());
        assert!(!player.has_new_input());
        // The last captured input is predicted again.
        assert_eq!(player.host().applied, vec![1, 2, 3, 3]);
        assert_eq!(sent_packets(&mut player).len(), 3);

        player.notify_input_checked(InputId::new(0)).unwrap();
        player.process(0.1).unwrap();
        assert_eq!(player.stored_input_count(), 3);
        assert_eq!(player.current_input_id(), Some(InputId::new(3)));
        assert_eq!(player.host().applied.last(), Some(&4));
    }

    #[test]
    fn acknowledge_desync_is_reported() {
        let mut player = player(&[1, 2, 3], 8);
        for _ in 0..3 {
            player.process(0.1).unwrap();
        }
        player.notify_input_checked(InputId::new(1)).unwrap();
        assert_eq!(player.stored_input_id(0), Some(InputId::new(2)));
        assert!(matches!(
            player.notify_input_checked(InputId::new(0)),
            Err(ControllerError::Desync { .. })
        ));
    }

    #[test]
    fn process_instant_replays_store() {
        let mut player = player(&[5, 6, 7], 8);
        for _ in 0..3 {
            player.process(0.1).unwrap();
        }
        player.host_mut().applied.clear();
        assert!(player.process_instant(0, 0.1).unwrap());
        assert!(player.process_instant(1, 0.1).unwrap());
        assert!(!player.process_instant(2, 0.1).unwrap());
        assert_eq!(player.host().applied, vec![5, 6, 7]);
        assert_eq!(
            player.process_instant(3, 0.1),
            Err(ControllerError::IndexOutOfRange { index: 3, len: 3 })
        );
    }

    #[test]
    fn tick_speed_notification() {
        let mut player = player(&[], 8);
        let byte = encode_tick_speed(MAX_ADDITIONAL_TICK_SPEED, MAX_ADDITIONAL_TICK_SPEED);
        player.receive_tick_speed(&[byte]).unwrap();
        assert!((player.tick_speed() - MAX_ADDITIONAL_TICK_SPEED).abs() < 1e-3);
        assert!(player.receive_tick_speed(&[1, 2]).is_err());
        assert!((player.tick_speed() - MAX_ADDITIONAL_TICK_SPEED).abs() < 1e-3);
    }

    /// Fails the capture or the prediction of one chosen tick.
    struct FailingHost {
        inner: ScriptHost,
        collects: usize,
        fail_collect: Option<usize>,
        processes: usize,
        fail_process: Option<usize>,
    }

    impl FailingHost {
        fn new(script: &[i64]) -> Self {
            Self {
                inner: ScriptHost::with_script(script),
                collects: 0,
                fail_collect: None,
                processes: 0,
                fail_process: None,
            }
        }
    }

    const HOST_FAILURE: BitError = BitError::UnexpectedEof {
        requested: 8,
        available: 0,
    };

    impl InputHost for FailingHost {
        fn collect_inputs(&mut self, delta: f32, inputs: &mut InputBuffer) -> BitResult<()> {
            self.collects += 1;
            if self.fail_collect == Some(self.collects) {
                return Err(HOST_FAILURE);
            }
            self.inner.collect_inputs(delta, inputs)
        }

        fn controller_process(&mut self, delta: f32, inputs: &mut InputBuffer) -> BitResult<()> {
            self.processes += 1;
            if self.fail_process == Some(self.processes) {
                return Err(HOST_FAILURE);
            }
            self.inner.controller_process(delta, inputs)
        }

        fn are_inputs_different(
            &mut self,
            a: &mut InputBuffer,
            b: &mut InputBuffer,
        ) -> BitResult<bool> {
            self.inner.are_inputs_different(a, b)
        }

        fn count_input_size(&mut self, inputs: &mut InputBuffer) -> BitResult<usize> {
            self.inner.count_input_size(inputs)
        }
    }

    fn failing_player(host: FailingHost) -> PlayerController<FailingHost> {
        PlayerController::new(host, ControllerConfig::for_testing()).unwrap()
    }

    #[test]
    fn failed_capture_keeps_ids_contiguous() {
        let mut host = FailingHost::new(&[1, 2, 3, 4]);
        host.fail_collect = Some(2);
        let mut player = failing_player(host);

        player.process(0.1).unwrap();
        assert!(player.process(0.1).is_err());
        assert!(!player.has_new_input());
        assert_eq!(player.current_input_id(), Some(InputId::new(0)));
        assert_eq!(player.last_stored_input_id(), Some(InputId::new(0)));

        player.process(0.1).unwrap();
        player.process(0.1).unwrap();
        assert_eq!(player.current_input_id(), Some(InputId::new(2)));
        assert_eq!(player.stored_input_id(1), Some(InputId::new(1)));

        player.notify_input_checked(InputId::new(0)).unwrap();
        player.notify_input_checked(InputId::new(1)).unwrap();
        assert_eq!(player.stored_input_count(), 1);
    }

    #[test]
    fn failed_prediction_discards_the_capture() {
        let mut host = FailingHost::new(&[5, 6, 7]);
        host.fail_process = Some(2);
        let mut player = failing_player(host);

        player.process(0.1).unwrap();
        assert!(player.process(0.1).is_err());
        assert_eq!(player.stored_input_count(), 1);
        assert_eq!(player.current_input_id(), Some(InputId::new(0)));

        player.process(0.1).unwrap();
        assert_eq!(player.current_input_id(), Some(InputId::new(1)));
        assert_eq!(player.host().inner.applied, vec![5, 7]);
        player.notify_input_checked(InputId::new(1)).unwrap();
        assert_eq!(player.stored_input_count(), 0);
    }

    #[test]
    fn receive_inputs_is_role_mismatch() {
        let mut player = player(&[], 8);
        assert_eq!(
            player.receive_inputs(&[0, 0, 0, 0]),
            Err(ControllerError::RoleMismatch {
                role: Role::Player,
                operation: "receive_inputs"
            })
        );
    }
}
