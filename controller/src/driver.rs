//! Frame-loop helpers for hosts.

use crate::error::ControllerResult;
use crate::networked::Controller;

/// What one call to [`advance`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Ticks run.
    pub sub_ticks: u32,
    /// Ticks that applied a fresh input.
    pub new_inputs: u32,
}

/// Runs as many fixed ticks of `1 / iterations_per_second` as the
/// controller asks for after `delta` seconds of wall time.
pub fn advance<C: Controller + ?Sized>(
    controller: &mut C,
    delta: f32,
    iterations_per_second: f32,
) -> ControllerResult<TickReport> {
    if iterations_per_second <= 0.0 {
        return Ok(TickReport::default());
    }
    let step = 1.0 / iterations_per_second;
    let mut report = TickReport {
        sub_ticks: controller.sub_ticks(delta, iterations_per_second),
        new_inputs: 0,
    };
    for _ in 0..report.sub_ticks {
        controller.process(step)?;
        if controller.has_new_input() {
            report.new_inputs += 1;
        }
    }
    Ok(report)
}

/// Re-applies every stored input, oldest first. Returns how many were
/// replayed.
pub fn replay<C: Controller + ?Sized>(controller: &mut C, delta: f32) -> ControllerResult<usize> {
    if controller.stored_input_id(0).is_none() {
        return Ok(0);
    }
    let mut index = 0;
    loop {
        let more = controller.process_instant(index, delta)?;
        index += 1;
        if !more {
            return Ok(index);
        }
    }
}
