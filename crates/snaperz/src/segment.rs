//! Sparse segment storage.
//!
//! The occupancy list is an arena: `lengths[i]` is the block count of slot
//! `i`, and `next[i]` is the index of the next occupied slot after `i` (or
//! [`NIL`]). Only occupied slots carry a meaningful link. Slot identity is
//! the array index, so there is no per-node allocation.
//!
//! # Representation Invariant
//!
//! Following `next` from `head` visits every slot with a positive length,
//! in ascending index order, and nothing else.

use crate::config::{ConfigError, ExtenderConfig};

/// Link value meaning "no successor".
pub const NIL: u32 = u32::MAX;

/// `L + 1` block counters with a next-occupied linkage.
#[derive(Debug, Clone)]
pub struct SegmentStore {
    lengths: Vec<u32>,
    next: Vec<u32>,
    head: u32,
}

impl SegmentStore {
    /// The fully-extended configuration: one block in every slot.
    #[must_use]
    pub fn fully_extended(config: &ExtenderConfig) -> Self {
        let count = config.segment_count();
        let lengths = vec![1; count];
        let next = (1..=count as u32)
            .map(|i| if i as usize == count { NIL } else { i })
            .collect();
        Self {
            lengths,
            next,
            head: 0,
        }
    }

    /// Build a store from dense segment lengths.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SegmentCount`] when `lengths` does not have
    /// `L + 1` entries and [`ConfigError::BlockCount`] when the entries do
    /// not sum to `L + 1`.
    pub fn from_lengths(config: &ExtenderConfig, lengths: &[u32]) -> Result<Self, ConfigError> {
        check_lengths(config, lengths)?;

        let mut next = vec![NIL; lengths.len()];
        let mut occupied = lengths
            .iter()
            .enumerate()
            .filter(|&(_, &len)| len > 0)
            .map(|(slot, _)| slot as u32);
        // Conservation guarantees at least one occupied slot.
        let head = occupied.next().unwrap_or(0);
        let mut prev = head;
        for slot in occupied {
            next[prev as usize] = slot;
            prev = slot;
        }

        Ok(Self {
            lengths: lengths.to_vec(),
            next,
            head,
        })
    }

    /// Dense view of every slot.
    #[inline]
    #[must_use]
    pub fn lengths(&self) -> &[u32] {
        &self.lengths
    }

    /// Number of slots, `L + 1`.
    #[inline]
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.lengths.len()
    }

    /// Block count of one slot.
    #[inline(always)]
    #[must_use]
    pub fn length_at(&self, slot: usize) -> u32 {
        self.lengths[slot]
    }

    /// First occupied slot. Fixed for the lifetime of a trajectory.
    #[inline(always)]
    #[must_use]
    pub fn head(&self) -> usize {
        self.head as usize
    }

    /// Next occupied slot after an occupied `slot`.
    #[inline(always)]
    #[must_use]
    pub fn next_occupied(&self, slot: usize) -> Option<usize> {
        match self.next[slot] {
            NIL => None,
            n => Some(n as usize),
        }
    }

    /// Whether an occupied `slot` is the rearmost occupied one.
    #[inline(always)]
    #[must_use]
    pub fn is_last(&self, slot: usize) -> bool {
        self.next[slot] == NIL
    }

    /// Occupied slots and their lengths, front to back.
    pub fn occupied(&self) -> Occupied<'_> {
        Occupied {
            store: self,
            slot: Some(self.head()),
        }
    }

    /// Total blocks across all slots.
    #[must_use]
    pub fn block_count(&self) -> u64 {
        self.lengths.iter().map(|&len| u64::from(len)).sum()
    }

    /// Move `moved` blocks from `slot` into `slot + 1`, linking the successor
    /// if it was empty.
    #[inline]
    pub(crate) fn push(&mut self, slot: usize, moved: u32) {
        debug_assert!(moved > 0 && moved < self.lengths[slot]);
        let succ = slot + 1;
        if self.lengths[succ] == 0 {
            self.next[succ] = self.next[slot];
            self.next[slot] = succ as u32;
        }
        self.lengths[slot] -= moved;
        self.lengths[succ] += moved;
    }

    /// Merge `slot + 1` into `slot` and unlink it.
    ///
    /// Returns `false` when `slot` has no occupied successor, in which case
    /// nothing changes.
    #[inline]
    pub(crate) fn pull(&mut self, slot: usize) -> bool {
        if self.is_last(slot) {
            return false;
        }
        let succ = slot + 1;
        let pulled = self.lengths[succ];
        if pulled != 0 {
            self.lengths[slot] += pulled;
            self.lengths[succ] = 0;
            self.next[slot] = self.next[succ];
            self.next[succ] = NIL;
        }
        true
    }

    /// Verify the representation invariant.
    #[must_use]
    pub fn check_links(&self) -> bool {
        let mut expected = self
            .lengths
            .iter()
            .enumerate()
            .filter(|&(_, &len)| len > 0)
            .map(|(slot, _)| slot);
        let linked_match = self
            .occupied()
            .all(|(slot, _)| expected.next() == Some(slot));
        linked_match && expected.next().is_none()
    }
}

/// Iterator over `(slot, length)` for occupied slots.
#[derive(Debug, Clone)]
pub struct Occupied<'a> {
    store: &'a SegmentStore,
    slot: Option<usize>,
}

impl Iterator for Occupied<'_> {
    type Item = (usize, u32);

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.slot?;
        self.slot = self.store.next_occupied(slot);
        Some((slot, self.store.length_at(slot)))
    }
}

/// Validate dense lengths against a configuration.
pub(crate) fn check_lengths(config: &ExtenderConfig, lengths: &[u32]) -> Result<(), ConfigError> {
    if lengths.len() != config.segment_count() {
        return Err(ConfigError::SegmentCount {
            expected: config.segment_count(),
            actual: lengths.len(),
        });
    }
    let actual: u64 = lengths.iter().map(|&len| u64::from(len)).sum();
    let expected = u64::from(config.block_count());
    if actual != expected {
        return Err(ConfigError::BlockCount { expected, actual });
    }
    Ok(())
}
