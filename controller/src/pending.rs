//! Receiver-side queue of inputs waiting to be consumed.

use std::collections::VecDeque;

use crate::types::InputId;

/// A received input not yet consumed by the reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingInput {
    pub id: InputId,
    pub inputs: Vec<u8>,
}

/// Inputs sorted by ascending id, without duplicates.
///
/// Windows are bounded by configuration so insertion sort on a deque is
/// plenty.
#[derive(Debug, Clone, Default)]
pub struct PendingQueue {
    entries: VecDeque<PendingInput>,
}

impl PendingQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `inputs` under `id` unless that id is already queued.
    ///
    /// Returns `true` when the entry was added.
    pub fn insert(&mut self, id: InputId, inputs: &[u8]) -> bool {
        match self.entries.binary_search_by_key(&id, |entry| entry.id) {
            Ok(_) => false,
            Err(position) => {
                self.entries.insert(
                    position,
                    PendingInput {
                        id,
                        inputs: inputs.to_vec(),
                    },
                );
                true
            }
        }
    }

    #[must_use]
    pub fn front(&self) -> Option<&PendingInput> {
        self.entries.front()
    }

    #[must_use]
    pub fn back(&self) -> Option<&PendingInput> {
        self.entries.back()
    }

    pub fn pop_front(&mut self) -> Option<PendingInput> {
        self.entries.pop_front()
    }

    /// Whether `id` is queued, scanning from the newest entry.
    #[must_use]
    pub fn contains(&self, id: InputId) -> bool {
        self.entries.iter().rev().any(|entry| entry.id == id)
    }

    /// Drops every entry with an id strictly below `bound`.
    pub fn drop_before(&mut self, bound: InputId) {
        while self.entries.front().is_some_and(|entry| entry.id < bound) {
            self.entries.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &PendingInput> {
        self.entries.iter()
    }

    /// Queued ids, oldest first.
    pub fn ids(&self) -> impl Iterator<Item = InputId> + '_ {
        self.entries.iter().map(|entry| entry.id)
    }
}
