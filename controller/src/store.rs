//! Player-side storage of captured inputs.

use std::collections::VecDeque;

use bitstream::InputBuffer;
use wire::PacketWriter;

use crate::error::{ControllerError, ControllerResult};
use crate::host::{inputs_differ, InputHost};
use crate::types::InputId;

/// One captured input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSnapshot {
    pub id: InputId,
    pub inputs: Vec<u8>,
    /// An earlier input this one is known to be equivalent to.
    pub similarity: Option<InputId>,
}

/// Inputs kept until the server confirms them, oldest first.
///
/// Capacity is never exceeded: a full store refuses new inputs instead of
/// evicting, and entries leave only through acknowledgment.
#[derive(Debug, Clone)]
pub struct InputStore {
    frames: VecDeque<FrameSnapshot>,
    capacity: usize,
    last_id: Option<InputId>,
}

impl InputStore {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
            last_id: None,
        }
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.frames.len() >= self.capacity
    }

    /// Appends an input. Ids must be strictly increasing since the last
    /// [`clear`](Self::clear).
    pub fn insert(&mut self, id: InputId, inputs: Vec<u8>) -> ControllerResult<()> {
        if let Some(previous) = self.last_id {
            if id <= previous {
                return Err(ControllerError::OutOfOrder {
                    previous,
                    current: id,
                });
            }
        }
        if self.is_full() {
            return Err(ControllerError::StoreFull {
                capacity: self.capacity,
            });
        }
        self.frames.push_back(FrameSnapshot {
            id,
            inputs,
            similarity: None,
        });
        self.last_id = Some(id);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&FrameSnapshot> {
        self.frames.get(index)
    }

    #[must_use]
    pub fn stored_id(&self, index: usize) -> Option<InputId> {
        self.frames.get(index).map(|frame| frame.id)
    }

    #[must_use]
    pub fn last(&self) -> Option<&FrameSnapshot> {
        self.frames.back()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &FrameSnapshot> {
        self.frames.iter()
    }

    /// Removes everything and forgets the last id.
    pub fn clear(&mut self) {
        self.frames.clear();
        self.last_id = None;
    }

    /// Drops every input with an id up to and including `id`.
    ///
    /// Returns how many inputs remain.
    pub fn prune_through(&mut self, id: InputId) -> usize {
        while self.frames.front().is_some_and(|frame| frame.id <= id) {
            self.frames.pop_front();
        }
        self.frames.len()
    }

    /// Prunes through `id` and checks that the oldest remaining input is
    /// exactly `id + 1`.
    pub fn acknowledge(&mut self, id: InputId) -> ControllerResult<usize> {
        let remaining = self.prune_through(id);
        if let Some(front) = self.frames.front() {
            if front.id != id.next() {
                return Err(ControllerError::Desync {
                    acknowledged: id,
                    next: front.id,
                });
            }
        }
        Ok(remaining)
    }

    /// Encodes the newest `max_redundant_inputs + 1` inputs into a redundant
    /// packet, merging equivalent neighbours into runs.
    ///
    /// Equivalence found here is remembered on each input, so every input is
    /// compared with its predecessor at most once while it stays
    /// equivalent.
    #[allow(clippy::cast_possible_truncation)]
    pub fn encode_redundant<H: InputHost + ?Sized>(
        &mut self,
        max_redundant_inputs: usize,
        host: &mut H,
    ) -> ControllerResult<Vec<u8>> {
        let count = self
            .frames
            .len()
            .min(max_redundant_inputs.saturating_add(1));
        let start = self.frames.len() - count;
        // Ids are truncated to the 32-bit wire header.
        let first_id = self
            .frames
            .get(start)
            .map_or(0, |frame| frame.id.raw() as u32);

        let mut writer = PacketWriter::new(first_id);
        let mut previous_id: Option<InputId> = None;
        let mut previous_similarity: Option<InputId> = None;
        let mut run_inputs = InputBuffer::new();
        let mut candidate = InputBuffer::new();

        for frame in self.frames.range_mut(start..) {
            let is_similar = match previous_id {
                None => false,
                Some(_) if !writer.can_duplicate() => false,
                Some(previous) if frame.similarity == Some(previous) => true,
                Some(_) if frame.similarity.is_none() => {
                    candidate.load(&frame.inputs);
                    !inputs_differ(host, &mut run_inputs, &mut candidate)?
                }
                Some(_) => frame.similarity == previous_similarity,
            };

            if is_similar {
                writer.duplicate_last()?;
                frame.similarity = previous_id;
            } else {
                writer.push_input(&frame.inputs);
                previous_id = Some(frame.id);
                previous_similarity = frame.similarity;
                run_inputs.load(&frame.inputs);
            }
        }

        Ok(writer.finish())
    }
}
