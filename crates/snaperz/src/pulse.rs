//! Scalar pulse engine.
//!
//! One pulse is a single front-to-back sweep over the occupied slots. Each
//! slot only interacts with its immediate successor, so resolving slots in
//! order gives the same result as firing every piston at once.
//!
//! # Rule
//!
//! ```text
//! len == 1 : pull the whole successor into this slot
//! len  > 1 : push min(limit, len - 1) blocks into the successor
//!            limit = last_push_limit for the rearmost occupied slot,
//!                    push_limit otherwise
//! ```
//!
//! The sentinel slot `L` never acts.

use crate::config::{ConfigError, ExtenderConfig, Limits};
use crate::extender::Extender;
use crate::segment::SegmentStore;

/// Extender advanced by the sparse linked sweep.
///
/// This is the reference engine: the windowed engine must agree with it
/// after every pulse.
///
/// # Example
///
/// ```
/// use snaperz::{Extender, ExtenderConfig, ScalarExtender};
///
/// let config = ExtenderConfig::new(1, 12)?;
/// let mut extender = ScalarExtender::new(config);
/// extender.simulate_pulse();
/// assert_eq!(extender.segments(), vec![2, 0]);
/// assert!(extender.finished());
/// # Ok::<(), snaperz::ConfigError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ScalarExtender {
    config: ExtenderConfig,
    limits: Limits,
    store: SegmentStore,
    pulses: u64,
}

impl ScalarExtender {
    /// Create an extender in the fully-extended configuration.
    #[must_use]
    pub fn new(config: ExtenderConfig) -> Self {
        Self::with_store(config, SegmentStore::fully_extended(&config))
    }

    /// Create an extender from an arbitrary conserving state.
    ///
    /// # Errors
    ///
    /// Fails when `lengths` has the wrong size or does not hold `L + 1`
    /// blocks.
    pub fn from_lengths(config: ExtenderConfig, lengths: &[u32]) -> Result<Self, ConfigError> {
        Ok(Self::with_store(
            config,
            SegmentStore::from_lengths(&config, lengths)?,
        ))
    }

    fn with_store(config: ExtenderConfig, store: SegmentStore) -> Self {
        Self {
            config,
            limits: config.limits(),
            store,
            pulses: 0,
        }
    }

    /// Underlying sparse store.
    #[inline]
    #[must_use]
    pub fn store(&self) -> &SegmentStore {
        &self.store
    }

    fn sweep(&mut self) {
        let sentinel = self.config.length() as usize;
        let mut slot = self.store.head();

        while slot != sentinel {
            let len = self.store.length_at(slot);
            if len > 1 {
                let limit = self.limits.for_slot(self.store.is_last(slot));
                let moved = limit.min(len - 1);
                if moved > 0 {
                    self.store.push(slot, moved);
                }
            } else if !self.store.pull(slot) {
                break;
            }

            match self.store.next_occupied(slot) {
                Some(next) => slot = next,
                None => break,
            }
        }
    }
}

impl Extender for ScalarExtender {
    fn config(&self) -> &ExtenderConfig {
        &self.config
    }

    fn pulses(&self) -> u64 {
        self.pulses
    }

    fn simulate_pulse(&mut self) {
        assert!(!self.finished(), "pulse on a fully retracted extender");
        self.sweep();
        self.pulses += 1;
        debug_assert!(self.store.check_links());
    }

    fn finished(&self) -> bool {
        self.store.length_at(0) == self.config.block_count()
    }

    fn equals(&self, other: &Self) -> bool {
        self.config == other.config && self.store.occupied().eq(other.store.occupied())
    }

    fn segments(&self) -> Vec<u32> {
        self.store.lengths().to_vec()
    }
}
