//! Lane-pipelined pulse engine.
//!
//! Lane `k` of the window runs pulse `n - k`, two slots behind lane `k - 1`.
//! Every pipeline step resolves one `(slot, successor)` pair per lane with
//! the lane-parallel form of the scalar rule, then slides the window one slot
//! along a ring of backing storage. With `W` lanes, `W` pulses are in flight
//! and one sweep of the ring completes `W` of them.
//!
//! # Ring Layout
//!
//! ```text
//! N = max(L + 1, 2W)          ring slots; slots L+1..N are padding (always 0)
//! lane k position  = head - 2k  (mod N)
//! lane k pair      = (cur[k], nxt[k]) = (slot, slot + 1)
//! ```
//!
//! The `cur` and `nxt` vectors swap roles every step (the parity flag): the
//! updated `cur` is shifted up one lane, becoming the `nxt` of the lane
//! behind, while slot `head + 2` is loaded from storage into lane 0. The top
//! lane's value spills back to storage. A loaded slot is zeroed in storage,
//! so storage never holds a stale copy of a window slot.
//!
//! # Last-Slot Signal
//!
//! Each lane carries a running count of the blocks its pulse has swept past.
//! A slot is the rearmost occupied one exactly when the count reaches
//! `L + 1`; the count then resets to zero. A reset while resolving slot 0
//! means every block sits in slot 0, which is the termination test.

use crate::config::{ConfigError, ExtenderConfig, Limits, SegmentWidth};
use crate::lanes::{LaneElem, LaneKernel};
use crate::segment::{check_lengths, SegmentStore};

/// Vectors that never change after construction.
#[derive(Debug, Clone, Copy)]
struct Splats<V> {
    zero: V,
    one: V,
    sentinel: V,
    blocks: V,
    ring: V,
    push: V,
    last_push: V,
}

/// Pipelined extender over a lane kernel `K`.
///
/// Agrees with [`crate::ScalarExtender`] after every pulse; see
/// [`WindowedPipeline::read_out`].
#[derive(Debug, Clone)]
pub struct WindowedPipeline<K: LaneKernel> {
    kernel: K,
    config: ExtenderConfig,
    limits: Limits,
    splats: Splats<K::Vector>,
    /// Ring size `N`.
    ring: usize,
    storage: Vec<K::Elem>,
    windows: [K::Vector; 2],
    parity: usize,
    counter: K::Vector,
    /// Ring position of each lane's `cur` slot.
    at: K::Vector,
    head: usize,
    steps: u64,
    pulses: u64,
    retracted: bool,
}

impl<K: LaneKernel> WindowedPipeline<K> {
    /// Create a pipeline in the fully-extended configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::WidthTooNarrow`] when `L + 1` does not fit the
    /// kernel's lane element.
    pub fn new(kernel: K, config: ExtenderConfig) -> Result<Self, ConfigError> {
        Self::from_store(kernel, &SegmentStore::fully_extended(&config), config)
    }

    /// Create a pipeline from dense segment lengths.
    ///
    /// # Errors
    ///
    /// Fails on a width that cannot hold `L + 1`, or on lengths that do not
    /// form a conserving state.
    pub fn from_lengths(
        kernel: K,
        config: ExtenderConfig,
        lengths: &[u32],
    ) -> Result<Self, ConfigError> {
        check_lengths(&config, lengths)?;
        Self::build(kernel, config, lengths)
    }

    /// Create a pipeline holding the state of a sparse store.
    ///
    /// # Errors
    ///
    /// Fails on a width that cannot hold `L + 1`, or a store of the wrong size.
    pub fn from_store(
        kernel: K,
        store: &SegmentStore,
        config: ExtenderConfig,
    ) -> Result<Self, ConfigError> {
        Self::from_lengths(kernel, config, store.lengths())
    }

    fn build(kernel: K, config: ExtenderConfig, lengths: &[u32]) -> Result<Self, ConfigError> {
        let width: SegmentWidth = K::Elem::WIDTH;
        width.check(&config)?;

        let lanes = K::LANES;
        let length = config.length() as usize;
        let ring = config.segment_count().max(2 * lanes);
        // Ring positions are held in lanes too.
        if ring as u64 > u64::from(width.max_value()) {
            return Err(ConfigError::WidthTooNarrow {
                width,
                blocks: config.block_count(),
            });
        }

        let mut storage = vec![K::Elem::ZERO; ring];
        for (slot, &len) in storage.iter_mut().zip(lengths) {
            *slot = K::Elem::from_u32(len);
        }

        let limits = config.limits();
        let elem = |v: u32| kernel.splat(K::Elem::from_u32(v));
        let splats = Splats {
            zero: kernel.splat(K::Elem::ZERO),
            one: kernel.splat(K::Elem::ONE),
            sentinel: elem(config.length()),
            blocks: elem(config.block_count()),
            ring: elem(ring as u32),
            push: elem(limits.push),
            last_push: elem(limits.last_push),
        };

        // Lane 0 starts just before slot 0; later lanes trail by two slots.
        let at: Vec<K::Elem> = (0..lanes)
            .map(|k| K::Elem::from_u32(((ring - 1 - 2 * k) % ring) as u32))
            .collect();

        // Slot 0 is checked out into lane 0's successor position.
        let mut first = vec![K::Elem::ZERO; lanes];
        first[0] = core::mem::take(&mut storage[0]);

        let retracted = lengths[0] == config.block_count();
        tracing::trace!(lanes, ring, length, %width, "windowed pipeline built");

        Ok(Self {
            kernel,
            config,
            limits,
            splats,
            ring,
            storage,
            windows: [splats.zero, kernel.from_lanes(&first)],
            parity: 0,
            counter: splats.zero,
            at: kernel.from_lanes(&at),
            head: ring - 1,
            steps: 0,
            pulses: 0,
            retracted,
        })
    }

    /// Extender configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ExtenderConfig {
        &self.config
    }

    /// Push limits in use.
    #[inline]
    #[must_use]
    pub fn limits(&self) -> Limits {
        self.limits
    }

    /// Pulses completed.
    #[inline]
    #[must_use]
    pub fn pulses(&self) -> u64 {
        self.pulses
    }

    /// Whether the window has filled and the top lane spills to storage.
    #[inline]
    fn primed(&self) -> bool {
        self.steps >= (2 * K::LANES - 1) as u64
    }

    /// One pipeline step. Returns the per-lane counter-reset mask.
    #[inline(always)]
    fn step(&mut self) -> K::Vector {
        let k = self.kernel;
        let s = self.splats;
        let cur = self.windows[self.parity];
        let nxt = self.windows[self.parity ^ 1];

        let tail = k.ge(self.at, s.sentinel);
        let counter = k.adds(self.counter, cur);
        let last = k.cmpeq(counter, s.blocks);
        let limit = k.select(last, s.last_push, s.push);
        let push = k.andnot(tail, k.min(limit, k.subs(cur, s.one)));
        let pull = k.andnot(k.or(tail, last), k.and(k.cmpeq(cur, s.one), nxt));

        let cur = k.adds(k.subs(cur, push), pull);
        let nxt = k.subs(k.adds(nxt, push), pull);
        let counter = k.subs(k.adds(counter, pull), push);
        let done = k.cmpeq(counter, s.blocks);
        self.counter = k.andnot(done, counter);

        let lanes = K::LANES;
        let n = self.ring;
        if self.primed() {
            let back = (self.head + n + 2 - 2 * lanes) % n;
            self.storage[back] = k.last_lane(cur);
        }
        let front = (self.head + 2) % n;
        let load = core::mem::take(&mut self.storage[front]);

        self.windows[self.parity] = k.shift_in(cur, load);
        self.windows[self.parity ^ 1] = nxt;
        self.parity ^= 1;

        self.head = (self.head + 1) % n;
        let at = k.adds(self.at, s.one);
        self.at = k.andnot(k.cmpeq(at, s.ring), at);
        self.steps += 1;

        done
    }

    /// Advance by exactly one pulse.
    ///
    /// Runs pipeline steps until the newest pulse has resolved slot 0. That
    /// pulse's lane is `pulses % W`; it reaches slot 0 on the ring pass
    /// `pulses / W`.
    ///
    /// # Panics
    ///
    /// Panics once the extender has fully retracted.
    #[inline]
    pub fn simulate_pulse(&mut self) {
        assert!(!self.retracted, "pulse on a fully retracted extender");
        let lanes = K::LANES as u64;
        let lane = (self.pulses % lanes) as usize;
        let target = (self.pulses / lanes) * self.ring as u64 + 2 * lane as u64 + 1;
        assert!(self.steps <= target, "pipeline ahead of pulse {}", self.pulses);

        loop {
            let at_target = self.steps == target;
            let done = self.step();
            if at_target {
                self.retracted = self.kernel.is_set(done, lane);
                break;
            }
        }
        self.pulses += 1;
    }

    /// Whether every block is in slot 0.
    ///
    /// O(1): the newest pulse's counter reset at slot 0 exactly when slot 0
    /// held all `L + 1` blocks.
    #[inline]
    #[must_use]
    pub fn finished(&self) -> bool {
        self.retracted
    }

    fn lanes_of(&self, v: K::Vector) -> Vec<u32> {
        let mut out = vec![K::Elem::ZERO; K::LANES];
        self.kernel.to_lanes(v, &mut out);
        out.into_iter().map(LaneElem::to_u32).collect()
    }

    /// Dense state after exactly [`pulses`](Self::pulses) pulses.
    ///
    /// The window is overlaid on storage, then every pulse still in flight
    /// finishes its sweep with a scalar pass, oldest first.
    #[must_use]
    pub fn read_out(&self) -> Vec<u32> {
        let lanes = K::LANES;
        let n = self.ring as i64;
        let length = self.config.length() as usize;
        let blocks = self.config.block_count();

        let mut dense: Vec<u32> = self.storage.iter().map(|&v| v.to_u32()).collect();
        let cur = self.lanes_of(self.windows[self.parity]);
        let nxt = self.lanes_of(self.windows[self.parity ^ 1]);
        let counters = self.lanes_of(self.counter);

        let pos = self.steps as i64 - 1;
        for k in 0..lanes {
            let a = pos - 2 * k as i64;
            if a >= 0 {
                dense[a.rem_euclid(n) as usize] = cur[k];
            }
            if a + 1 >= 0 {
                dense[(a + 1).rem_euclid(n) as usize] = nxt[k];
            }
        }

        // Lanes whose pulse is part-way through the extender.
        let mut in_flight: Vec<(usize, usize)> = (0..lanes)
            .filter_map(|k| {
                let next = pos - 2 * k as i64;
                if next <= 0 {
                    return None;
                }
                let slot = next.rem_euclid(n) as usize;
                (slot != 0 && slot < length).then_some((slot, k))
            })
            .collect();
        in_flight.sort_unstable_by(|a, b| b.cmp(a));

        for (start, k) in in_flight {
            let mut counter = counters[k];
            for slot in start..length {
                let v = dense[slot];
                counter += v;
                let last = counter == blocks;
                let push = self.limits.for_slot(last).min(v.saturating_sub(1));
                let pull = if v == 1 && !last { dense[slot + 1] } else { 0 };
                dense[slot] = v - push + pull;
                dense[slot + 1] = dense[slot + 1] + push - pull;
                counter = counter + pull - push;
                if counter == blocks {
                    counter = 0;
                }
            }
        }

        dense.truncate(length + 1);
        dense
    }

    /// Extender state equality: same configuration and same segment lengths
    /// at the same positions, whatever the lane phase of either pipeline.
    ///
    /// Pipelines with identical internal state match without a read-out.
    #[must_use]
    pub fn same_segments(&self, other: &Self) -> bool {
        self.config == other.config
            && (self.same_state(other) || self.read_out() == other.read_out())
    }

    /// Pipeline-level state equality.
    ///
    /// Equal pipelines are at the same ring phase with identical windows,
    /// counters and storage, so their read-outs agree and so do all their
    /// future read-outs. Pipelines holding the same extender state at
    /// different phases are not equal here; see
    /// [`same_segments`](Self::same_segments).
    #[must_use]
    pub fn same_state(&self, other: &Self) -> bool {
        let k = self.kernel;
        self.config == other.config
            && self.head == other.head
            && self.primed() == other.primed()
            && k.lanes_eq(self.windows[self.parity], other.windows[other.parity])
            && k.lanes_eq(
                self.windows[self.parity ^ 1],
                other.windows[other.parity ^ 1],
            )
            && k.lanes_eq(self.counter, other.counter)
            && self.storage == other.storage
    }

    /// Blocks held across the window and storage. Always `L + 1`.
    #[must_use]
    pub fn block_count(&self) -> u64 {
        let stored: u64 = self.storage.iter().map(|&v| u64::from(v.to_u32())).sum();
        let windowed: u64 = self
            .windows
            .iter()
            .flat_map(|&w| self.lanes_of(w))
            .map(u64::from)
            .sum();
        stored + windowed
    }
}
