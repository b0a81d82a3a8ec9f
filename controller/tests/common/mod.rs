#![allow(dead_code)]

use controller::{
    BitResult, CompressionLevel, Controller, ControllerConfig, InputBuffer, InputHost, InputId,
    Outgoing,
};

const HEADING: CompressionLevel = CompressionLevel::Level2;

/// One tick of input: a jump button and a heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Step {
    pub jump: bool,
    pub heading: i64,
}

impl Step {
    pub const fn new(jump: bool, heading: i64) -> Self {
        Self { jump, heading }
    }
}

/// Host that plays back a fixed script and records what it simulated.
#[derive(Debug, Default)]
pub struct WalkHost {
    script: Vec<Step>,
    cursor: usize,
    pub applied: Vec<Step>,
}

impl WalkHost {
    pub fn new(script: Vec<Step>) -> Self {
        Self {
            script,
            ..Self::default()
        }
    }

    pub fn script(&self) -> &[Step] {
        &self.script
    }

    fn read(inputs: &mut InputBuffer) -> BitResult<Step> {
        Ok(Step {
            jump: inputs.read_bool()?,
            heading: inputs.read_int(HEADING)?,
        })
    }
}

impl InputHost for WalkHost {
    fn collect_inputs(&mut self, _delta: f32, inputs: &mut InputBuffer) -> BitResult<()> {
        let step = self.script.get(self.cursor).copied().unwrap_or_default();
        self.cursor += 1;
        inputs.add_bool(step.jump)?;
        inputs.add_int(step.heading, HEADING)?;
        Ok(())
    }

    fn controller_process(&mut self, _delta: f32, inputs: &mut InputBuffer) -> BitResult<()> {
        let step = Self::read(inputs)?;
        self.applied.push(step);
        Ok(())
    }

    fn are_inputs_different(
        &mut self,
        a: &mut InputBuffer,
        b: &mut InputBuffer,
    ) -> BitResult<bool> {
        Ok(Self::read(a)? != Self::read(b)?)
    }

    fn count_input_size(&mut self, inputs: &mut InputBuffer) -> BitResult<usize> {
        let start = inputs.bit_offset();
        Self::read(inputs)?;
        Ok(inputs.bit_offset() - start)
    }
}

pub fn walk_script(len: usize) -> Vec<Step> {
    (0..len)
        .map(|i| Step::new(i % 7 == 0, (i as i64 / 3) % 40 - 20))
        .collect()
}

pub fn config() -> ControllerConfig {
    ControllerConfig {
        player_input_storage_size: 64,
        ..ControllerConfig::for_testing()
    }
}

/// Takes the packets a player queued for the server.
pub fn drain_server_inputs<C: Controller>(controller: &mut C) -> Vec<Vec<u8>> {
    controller
        .outbox()
        .drain_messages()
        .filter_map(|message| match message {
            Outgoing::ServerInputs(packet) => Some(packet),
            _ => None,
        })
        .collect()
}

/// Records `(id, step)` whenever `controller` adopted a fresh input.
pub fn record_new_input<C: Controller>(
    controller: &C,
    applied: &[Step],
    log: &mut Vec<(InputId, Step)>,
) {
    if controller.has_new_input() {
        if let (Some(id), Some(step)) = (controller.current_input_id(), applied.last()) {
            log.push((id, *step));
        }
    }
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
