//! Another peer's view of a remote actor.
//!
//! A doll replays the actor's input stream as relayed by the server. It runs
//! the same reconciliation as the server, keeps what it applied for rewinds,
//! and resynchronizes whenever the server confirms an input it still has
//! queued.

use bitstream::InputBuffer;
use log::{debug, info};

use crate::clock::{SubTickClock, TickRateController};
use crate::config::ControllerConfig;
use crate::error::{ControllerError, ControllerResult};
use crate::host::InputHost;
use crate::networked::Controller;
use crate::outbox::{ControllerEvent, Outbox};
use crate::reconciler::Reconciler;
use crate::store::InputStore;
use crate::types::{InputId, Role};

#[derive(Debug)]
pub struct DollController<H> {
    host: H,
    config: ControllerConfig,
    reconciler: Reconciler,
    store: InputStore,
    rate: TickRateController,
    clock: SubTickClock,
    replay: InputBuffer,
    flow_open: bool,
    communication_detected: bool,
    update_received: bool,
    last_checked_input_id: InputId,
    has_new_input: bool,
    outbox: Outbox,
}

impl<H: InputHost> DollController<H> {
    pub fn new(host: H, config: ControllerConfig) -> ControllerResult<Self> {
        config.validate()?;
        Ok(Self {
            host,
            reconciler: Reconciler::new(&config),
            store: InputStore::new(config.player_input_storage_size),
            config,
            rate: TickRateController::new(),
            clock: SubTickClock::new(),
            replay: InputBuffer::new(),
            flow_open: true,
            communication_detected: false,
            update_received: false,
            last_checked_input_id: InputId::default(),
            has_new_input: false,
            outbox: Outbox::new(),
        })
    }

    /// Applies the flow state sent by the server.
    pub fn receive_doll_status(&mut self, open: bool) {
        if open {
            self.open_flow();
        } else {
            self.close_flow();
        }
    }

    /// Resumes reconciliation. The next server confirmation triggers a hard
    /// reset.
    pub fn open_flow(&mut self) {
        if self.flow_open {
            return;
        }
        self.flow_open = true;
        self.communication_detected = false;
        self.update_received = false;
        info!("doll flow opened");
    }

    pub fn close_flow(&mut self) {
        if !self.flow_open {
            return;
        }
        self.flow_open = false;
        self.outbox.emit(ControllerEvent::DollCommunicationClosed);
        info!("doll flow closed");
    }

    #[must_use]
    pub const fn is_flow_open(&self) -> bool {
        self.flow_open
    }

    #[must_use]
    pub const fn last_checked_input_id(&self) -> InputId {
        self.last_checked_input_id
    }

    #[must_use]
    pub const fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    #[must_use]
    pub const fn store(&self) -> &InputStore {
        &self.store
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

    /// Drops everything applied locally and restarts the stream right
    /// before the last confirmed input.
    pub fn hard_reset(&mut self) {
        self.store.clear();
        self.reconciler.rebase(self.last_checked_input_id.prev());
        self.clock.reset();
        debug!(
            "doll reset to server state at {}",
            self.last_checked_input_id
        );
    }

    /// Hard resets when the confirmed input is still queued, meaning the
    /// server rewound past what the doll already played.
    pub fn soft_reset(&mut self) {
        if self.reconciler.pending().contains(self.last_checked_input_id) {
            self.hard_reset();
        }
    }
}

impl<H: InputHost> Controller for DollController<H> {
    fn role(&self) -> Role {
        Role::Doll
    }

    fn process(&mut self, delta: f32) -> ControllerResult<()> {
        self.rate.update(
            self.reconciler.missing_packets(),
            self.reconciler.pending().len(),
            delta,
            &self.config,
        );

        if !self.flow_open {
            self.has_new_input = false;
            return Ok(());
        }
        if self.update_received && !self.communication_detected {
            self.communication_detected = true;
            self.hard_reset();
            self.outbox.emit(ControllerEvent::DollCommunicationOpened);
            info!("doll communication with server opened");
        }

        let is_new_input = self.reconciler.fetch_next_input(&mut self.host)?;
        self.has_new_input = is_new_input;
        // A reset ahead of the stream leaves an id without a payload.
        let current = self
            .reconciler
            .current_input_id()
            .filter(|_| self.reconciler.has_payload());
        if let Some(id) = current {
            let inputs = self.reconciler.inputs_mut();
            inputs.begin_read();
            self.host.controller_process(delta, inputs)?;
            if is_new_input {
                if self.store.is_full() {
                    debug!("doll store full, {id} not kept");
                } else {
                    let bytes = self.reconciler.inputs().as_bytes().to_vec();
                    self.store.insert(id, bytes)?;
                }
            }
        }

        self.soft_reset();
        Ok(())
    }

    fn receive_inputs(&mut self, packet: &[u8]) -> ControllerResult<usize> {
        if !self.flow_open {
            debug!("doll flow closed, packet ignored");
            return Ok(0);
        }
        self.reconciler.receive_inputs(packet, &mut self.host)
    }

    /// Runs against the server's bias: a doll short on inputs slows down to
    /// build a buffer and speeds up when too many are queued.
    fn sub_ticks(&mut self, delta: f32, iterations_per_second: f32) -> u32 {
        self.clock
            .sub_ticks(delta, iterations_per_second, -self.rate.speed_bias())
    }

    fn notify_input_checked(&mut self, id: InputId) -> ControllerResult<()> {
        if self.flow_open {
            self.last_checked_input_id = id;
            self.update_received = true;
        }
        // Ids adopted through gap recovery are not contiguous.
        self.store.prune_through(id);
        Ok(())
    }

    fn last_known_input(&self) -> Option<InputId> {
        self.reconciler.last_known_input()
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
        self.replay.load(&frame.inputs);
        self.host.controller_process(delta, &mut self.replay)?;
        Ok(index + 1 < len)
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
