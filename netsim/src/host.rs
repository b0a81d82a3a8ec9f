//! A bot walking on a plane, driven by a pre-generated script.

use std::f32::consts::TAU;

use controller::{BitResult, CompressionLevel, InputBuffer, InputHost};

/// Encoded width of one [`BotInput`].
pub const INPUT_BITS: usize = 12;

const DIRECTION: CompressionLevel = CompressionLevel::Level1;
const WALK_SPEED: f32 = 4.0;
const DIRECTION_EPSILON: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BotInput {
    pub direction: [f32; 2],
    pub jump: bool,
}

impl BotInput {
    fn read(inputs: &mut InputBuffer) -> BitResult<Self> {
        Ok(Self {
            direction: inputs.read_normalized_vector2(DIRECTION)?,
            jump: inputs.read_bool()?,
        })
    }

    fn differs(&self, other: &Self) -> bool {
        self.jump != other.jump
            || self
                .direction
                .iter()
                .zip(other.direction)
                .any(|(a, b)| (a - b).abs() > DIRECTION_EPSILON)
    }
}

/// Held directions with occasional idles and jumps, so consecutive inputs
/// repeat the way human input does.
pub fn bot_script(rng: &mut fastrand::Rng, len: usize) -> Vec<BotInput> {
    let mut script = Vec::with_capacity(len);
    while script.len() < len {
        let hold = rng.usize(5..40);
        let direction = if rng.u8(0..4) == 0 {
            [0.0, 0.0]
        } else {
            let angle = rng.f32() * TAU;
            [angle.cos(), angle.sin()]
        };
        for _ in 0..hold {
            script.push(BotInput {
                direction,
                jump: rng.u8(0..30) == 0,
            });
        }
    }
    script.truncate(len);
    script
}

/// Host shared by every simulated peer. Each peer owns its own copy of the
/// script and only the player-side roles ever read from it.
#[derive(Debug, Clone)]
pub struct SimHost {
    script: Vec<BotInput>,
    cursor: usize,
    position: [f32; 2],
    jumps: u32,
    trajectory: Vec<[f32; 2]>,
}

impl SimHost {
    pub fn new(script: Vec<BotInput>) -> Self {
        Self {
            script,
            cursor: 0,
            position: [0.0, 0.0],
            jumps: 0,
            trajectory: Vec::new(),
        }
    }

    pub const fn position(&self) -> [f32; 2] {
        self.position
    }

    pub const fn jumps(&self) -> u32 {
        self.jumps
    }

    /// Number of simulated steps so far.
    pub fn steps(&self) -> usize {
        self.trajectory.len()
    }

    /// Position after `steps` simulated steps, clamped to the last one.
    pub fn position_after(&self, steps: usize) -> Option<[f32; 2]> {
        let index = steps.checked_sub(1)?;
        self.trajectory
            .get(index)
            .or_else(|| self.trajectory.last())
            .copied()
    }
}

impl InputHost for SimHost {
    fn collect_inputs(&mut self, _delta: f32, inputs: &mut InputBuffer) -> BitResult<()> {
        let input = self.script.get(self.cursor).copied().unwrap_or_default();
        self.cursor += 1;
        inputs.add_normalized_vector2(input.direction, DIRECTION)?;
        inputs.add_bool(input.jump)?;
        Ok(())
    }

    fn controller_process(&mut self, delta: f32, inputs: &mut InputBuffer) -> BitResult<()> {
        let input = BotInput::read(inputs)?;
        self.position[0] += input.direction[0] * WALK_SPEED * delta;
        self.position[1] += input.direction[1] * WALK_SPEED * delta;
        if input.jump {
            self.jumps += 1;
        }
        self.trajectory.push(self.position);
        Ok(())
    }

    fn are_inputs_different(
        &mut self,
        a: &mut InputBuffer,
        b: &mut InputBuffer,
    ) -> BitResult<bool> {
        Ok(BotInput::read(a)?.differs(&BotInput::read(b)?))
    }

    fn count_input_size(&mut self, inputs: &mut InputBuffer) -> BitResult<usize> {
        let start = inputs.bit_offset();
        BotInput::read(inputs)?;
        Ok(inputs.bit_offset() - start)
    }
}

pub fn distance(a: [f32; 2], b: [f32; 2]) -> f32 {
    (a[0] - b[0]).hypot(a[1] - b[1])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_width_matches_encoding() {
        let mut host = SimHost::new(vec![BotInput {
            direction: [0.6, 0.8],
            jump: true,
        }]);
        let mut inputs = InputBuffer::new();
        inputs.begin_write();
        host.collect_inputs(0.0, &mut inputs).unwrap();
        inputs.begin_read();
        assert_eq!(host.count_input_size(&mut inputs).unwrap(), INPUT_BITS);
        assert_eq!(inputs.size_in_bytes(), INPUT_BITS.div_ceil(8));
    }

    #[test]
    fn script_is_seeded() {
        let a = bot_script(&mut fastrand::Rng::with_seed(9), 200);
        let b = bot_script(&mut fastrand::Rng::with_seed(9), 200);
        assert_eq!(a, b);
        assert_eq!(a.len(), 200);
    }

    #[test]
    fn walking_moves_the_bot() {
        let mut host = SimHost::new(vec![BotInput {
            direction: [1.0, 0.0],
            jump: false,
        }]);
        let mut inputs = InputBuffer::new();
        inputs.begin_write();
        host.collect_inputs(0.5, &mut inputs).unwrap();
        inputs.begin_read();
        host.controller_process(0.5, &mut inputs).unwrap();
        assert!(host.position()[0] > 1.9);
        assert_eq!(host.steps(), 1);
        assert_eq!(host.position_after(5), Some(host.position()));
        assert_eq!(host.position_after(0), None);
    }
}
