//! Scripted host shared by unit tests.

use bitstream::{BitResult, CompressionLevel, InputBuffer};

use crate::host::InputHost;

const LEVEL: CompressionLevel = CompressionLevel::Level3;

/// One signed byte of input per tick, taken from `script`.
#[derive(Debug, Default)]
pub struct ScriptHost {
    pub script: Vec<i64>,
    pub cursor: usize,
    pub applied: Vec<i64>,
    pub comparisons: usize,
}

impl ScriptHost {
    pub fn with_script(script: &[i64]) -> Self {
        Self {
            script: script.to_vec(),
            ..Self::default()
        }
    }
}

/// Encoded payload for a single scripted value.
#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
pub fn payload(value: i64) -> Vec<u8> {
    vec![value as u8]
}

impl InputHost for ScriptHost {
    fn collect_inputs(&mut self, _delta: f32, inputs: &mut InputBuffer) -> BitResult<()> {
        let value = self.script.get(self.cursor).copied().unwrap_or_default();
        self.cursor += 1;
        inputs.add_int(value, LEVEL)?;
        Ok(())
    }

    fn controller_process(&mut self, _delta: f32, inputs: &mut InputBuffer) -> BitResult<()> {
        let value = inputs.read_int(LEVEL)?;
        self.applied.push(value);
        Ok(())
    }

    fn are_inputs_different(
        &mut self,
        a: &mut InputBuffer,
        b: &mut InputBuffer,
    ) -> BitResult<bool> {
        self.comparisons += 1;
        Ok(a.read_int(LEVEL)? != b.read_int(LEVEL)?)
    }

    fn count_input_size(&mut self, inputs: &mut InputBuffer) -> BitResult<usize> {
        inputs.skip(8)?;
        Ok(8)
    }
}
