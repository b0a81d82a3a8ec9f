//! Receiver-side input reconciliation.
//!
//! The reconciler turns an unordered, lossy stream of redundant packets into
//! exactly one authoritative input per tick:
//!
//! - **Unstarted**: waits for the first input, then adopts the oldest one.
//! - **Streaming**: adopts the queued input whose id follows the current one.
//! - **Recovering**: when the expected id is missing, scans a window of the
//!   queue that grows with every consecutive miss and jumps ahead to the first
//!   input that changes the outcome. Until something is adopted the previous
//!   input is re-applied (a ghost tick).

use bitstream::InputBuffer;
use log::{debug, warn};
use wire::{decode_redundant_packet, Limits};

use crate::config::ControllerConfig;
use crate::error::ControllerResult;
use crate::host::{inputs_differ, InputHost};
use crate::pending::{PendingInput, PendingQueue};
use crate::tracer::NetworkTracer;
use crate::types::InputId;

/// Pending queue plus the per-tick advance state machine.
#[derive(Debug, Clone)]
pub struct Reconciler {
    pending: PendingQueue,
    current_input_id: Option<InputId>,
    inputs: InputBuffer,
    has_payload: bool,
    ghost_input_count: u32,
    tracer: NetworkTracer,
    limits: Limits,
}

impl Reconciler {
    /// Creates a reconciler accepting any packet `config` lets a player send.
    #[must_use]
    pub fn new(config: &ControllerConfig) -> Self {
        Self::with_limits(config, config.wire_limits())
    }

    #[must_use]
    pub fn with_limits(config: &ControllerConfig, limits: Limits) -> Self {
        Self {
            pending: PendingQueue::new(),
            current_input_id: None,
            inputs: InputBuffer::new(),
            has_payload: false,
            ghost_input_count: 0,
            tracer: NetworkTracer::new(config.network_traced_frames),
            limits,
        }
    }

    /// Decodes a redundant packet and queues every input newer than the
    /// current one.
    ///
    /// A malformed packet is rejected as a whole and leaves the queue
    /// untouched. Returns how many inputs were added.
    pub fn receive_inputs<H: InputHost + ?Sized>(
        &mut self,
        packet: &[u8],
        host: &mut H,
    ) -> ControllerResult<usize> {
        let mut sizer = InputBuffer::from_bytes(packet.to_vec());
        let decoded = decode_redundant_packet(packet, &self.limits, |bit_offset| {
            sizer.seek(bit_offset).ok()?;
            host.count_input_size(&mut sizer).ok()
        });
        let decoded = match decoded {
            Ok(decoded) => decoded,
            Err(err) => {
                warn!("rejected input packet ({} bytes): {err}", packet.len());
                return Err(err.into());
            }
        };

        let mut inserted = 0;
        for (id, payload) in decoded.inputs() {
            let id = InputId::new(id);
            if self.current_input_id.is_some_and(|current| id <= current) {
                continue;
            }
            if self.pending.insert(id, payload) {
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    /// Advances by one tick. Returns `true` when a new input was adopted;
    /// otherwise the previous input, if any, stays current.
    pub fn fetch_next_input<H: InputHost + ?Sized>(
        &mut self,
        host: &mut H,
    ) -> ControllerResult<bool> {
        let Some(current) = self.current_input_id else {
            let started = match self.pending.pop_front() {
                Some(first) => {
                    debug!("input stream starts at {}", first.id);
                    self.adopt(first);
                    self.tracer.reset();
                    true
                }
                None => false,
            };
            self.tracer.notify_arrived();
            return Ok(started);
        };

        let next = current.next();
        let (is_new_input, is_missing) = match self.pending.front() {
            None => {
                self.ghost_input_count += 1;
                debug!("no input queued after {current}, reusing it");
                (false, true)
            }
            Some(front) if front.id == next => {
                if let Some(entry) = self.pending.pop_front() {
                    self.adopt(entry);
                }
                self.ghost_input_count = 0;
                (true, false)
            }
            Some(_) => {
                self.ghost_input_count += 1;
                (self.recover(next, host)?, true)
            }
        };

        if is_missing {
            self.tracer.notify_missing();
        } else {
            self.tracer.notify_arrived();
        }
        Ok(is_new_input)
    }

    /// Scans the first `min(g, len)` queued inputs whose id is at most
    /// `next + g`, stopping at the first one that differs from the current
    /// input. The last scanned input is adopted; the others are discarded.
    fn recover<H: InputHost + ?Sized>(
        &mut self,
        next: InputId,
        host: &mut H,
    ) -> ControllerResult<bool> {
        let ghosts = self.ghost_input_count;
        let window = (ghosts as usize).min(self.pending.len());
        let bound = next.raw().saturating_add(u64::from(ghosts));

        let mut recovered: Option<PendingInput> = None;
        let mut candidate = InputBuffer::new();
        for _ in 0..window {
            if self.pending.front().is_some_and(|front| front.id.raw() > bound) {
                break;
            }
            let Some(entry) = self.pending.pop_front() else {
                break;
            };
            candidate.load(&entry.inputs);
            let meaningful = inputs_differ(host, &mut self.inputs, &mut candidate)?;
            recovered = Some(entry);
            if meaningful {
                break;
            }
        }

        match recovered {
            Some(entry) => {
                debug!(
                    "recovered at {} after {ghosts} missed input(s), expected {next}",
                    entry.id
                );
                self.adopt(entry);
                self.ghost_input_count = 0;
                Ok(true)
            }
            None => {
                debug!("ghost tick {ghosts} while waiting for {next}");
                Ok(false)
            }
        }
    }

    fn adopt(&mut self, entry: PendingInput) {
        self.current_input_id = Some(entry.id);
        self.inputs.load(&entry.inputs);
        self.has_payload = true;
    }

    /// Moves the stream back to `current` and drops queued inputs older
    /// than it. `None` restarts the stream from scratch.
    ///
    /// The payload of the last adopted input is kept. A stream rebased
    /// before anything was adopted has a current id but no payload until
    /// the next input is adopted.
    pub fn rebase(&mut self, current: Option<InputId>) {
        self.current_input_id = current;
        self.ghost_input_count = 0;
        match current {
            Some(bound) => self.pending.drop_before(bound),
            None => {
                self.pending.clear();
                self.inputs.load(&[]);
                self.has_payload = false;
            }
        }
    }

    #[must_use]
    pub const fn current_input_id(&self) -> Option<InputId> {
        self.current_input_id
    }

    /// Whether an input was ever adopted, so [`inputs`](Self::inputs) holds
    /// something the host can read.
    #[must_use]
    pub const fn has_payload(&self) -> bool {
        self.has_payload
    }

    /// Payload of the current input.
    #[must_use]
    pub const fn inputs(&self) -> &InputBuffer {
        &self.inputs
    }

    pub fn inputs_mut(&mut self) -> &mut InputBuffer {
        &mut self.inputs
    }

    #[must_use]
    pub const fn pending(&self) -> &PendingQueue {
        &self.pending
    }

    /// Newest queued id.
    #[must_use]
    pub fn last_known_input(&self) -> Option<InputId> {
        self.pending.back().map(|entry| entry.id)
    }

    /// Consecutive ticks without a new input.
    #[must_use]
    pub const fn ghost_input_count(&self) -> u32 {
        self.ghost_input_count
    }

    /// Misses within the tracer window.
    #[must_use]
    pub fn missing_packets(&self) -> usize {
        self.tracer.missing_packets()
    }
}
