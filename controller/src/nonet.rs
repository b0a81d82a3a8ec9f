//! Offline controller: capture and apply in the same tick.

use bitstream::InputBuffer;

use crate::error::ControllerResult;
use crate::host::InputHost;
use crate::networked::Controller;
use crate::outbox::Outbox;
use crate::types::{InputId, Role};

/// Runs the host without any networking. Its output is the reference the
/// networked roles are compared against.
#[derive(Debug)]
pub struct NoNetController<H> {
    host: H,
    inputs: InputBuffer,
    frame_id: u64,
    outbox: Outbox,
}

impl<H: InputHost> NoNetController<H> {
    #[must_use]
    pub fn new(host: H) -> Self {
        Self {
            host,
            inputs: InputBuffer::new(),
            frame_id: 0,
            outbox: Outbox::new(),
        }
    }

    #[must_use]
    pub const fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }
}

impl<H: InputHost> Controller for NoNetController<H> {
    fn role(&self) -> Role {
        Role::NoNet
    }

    fn process(&mut self, delta: f32) -> ControllerResult<()> {
        self.inputs.begin_write();
        self.host.collect_inputs(delta, &mut self.inputs)?;
        self.inputs.dry();
        self.inputs.begin_read();
        self.host.controller_process(delta, &mut self.inputs)?;
        self.frame_id += 1;
        Ok(())
    }

    fn sub_ticks(&mut self, _delta: f32, _iterations_per_second: f32) -> u32 {
        1
    }

    /// Nothing is stored, so a confirmation is a no-op.
    fn notify_input_checked(&mut self, _id: InputId) -> ControllerResult<()> {
        Ok(())
    }

    fn current_input_id(&self) -> Option<InputId> {
        Some(InputId::new(self.frame_id))
    }

    fn has_new_input(&self) -> bool {
        true
    }

    fn outbox(&mut self) -> &mut Outbox {
        &mut self.outbox
    }
}
