//! Capabilities the embedding application provides.

use bitstream::{BitResult, InputBuffer};

/// Application callbacks invoked by every controller.
///
/// The controller owns its host and calls back into it while ticking; input
/// payloads only ever cross this boundary as [`InputBuffer`]s.
pub trait InputHost {
    /// Writes this tick's input sample into `inputs`, which is in write mode.
    fn collect_inputs(&mut self, delta: f32, inputs: &mut InputBuffer) -> BitResult<()>;

    /// Advances the controlled simulation by `delta` using `inputs`, which is
    /// rewound for reading.
    fn controller_process(&mut self, delta: f32, inputs: &mut InputBuffer) -> BitResult<()>;

    /// Whether two inputs would drive the simulation differently.
    ///
    /// Both buffers are rewound for reading and have the same byte size.
    fn are_inputs_different(
        &mut self,
        a: &mut InputBuffer,
        b: &mut InputBuffer,
    ) -> BitResult<bool>;

    /// Number of bits of the input that starts at the read cursor.
    ///
    /// The buffer holds a whole packet; implementations read or skip their
    /// fields and report how far they moved.
    fn count_input_size(&mut self, inputs: &mut InputBuffer) -> BitResult<usize>;
}

/// `true` when `a` and `b` differ in size or in the host's judgement.
pub(crate) fn inputs_differ<H: InputHost + ?Sized>(
    host: &mut H,
    a: &mut InputBuffer,
    b: &mut InputBuffer,
) -> BitResult<bool> {
    if a.size_in_bytes() != b.size_in_bytes() {
        return Ok(true);
    }
    a.begin_read();
    b.begin_read();
    host.are_inputs_different(a, b)
}
