//! Construction-time configuration for an extender.
//!
//! Everything here is fixed once an engine is built: the device length `L`,
//! the clock period `P`, the derived push limits, and the integer width the
//! windowed engine stores segments in.
//!
//! # Limit Derivation
//!
//! ```text
//! push_limit      = min(12, P/4 - 2)
//! last_push_limit = min(push_limit + 1, 12)
//! ```
//!
//! A period shorter than 8 would make the virtual push limit negative and is
//! rejected by [`ExtenderConfig::new`].

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Physical maximum number of blocks a single push can move.
pub const HARD_PUSH_LIMIT: u32 = 12;

/// Shortest clock period with a non-negative virtual push limit.
pub const MIN_PERIOD: u32 = 8;

/// Errors detected while building an extender.
///
/// Every variant is fatal: the engine refuses to start rather than simulate
/// with a configuration that would silently produce wrong results.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The device needs at least one piston.
    #[error("extender length must be at least 1")]
    ZeroLength,

    /// `L + 1` segments do not fit the addressable range.
    #[error("extender length {length} is too large (L + 1 must fit in 32 bits)")]
    LengthOverflow {
        /// Requested length.
        length: u32,
    },

    /// `P / 4 - 2` would be negative.
    #[error(
        "period {period} is too short: the virtual push limit P/4 - 2 is negative (minimum period is {})",
        MIN_PERIOD
    )]
    PeriodTooShort {
        /// Requested period.
        period: u32,
    },

    /// The chosen segment width cannot hold `L + 1`.
    #[error("{width} segments cannot hold {blocks} blocks")]
    WidthTooNarrow {
        /// Requested width.
        width: SegmentWidth,
        /// Total block count `L + 1`.
        blocks: u32,
    },

    /// The requested backend is not available on this CPU.
    #[error("backend {backend} is not available on this machine")]
    BackendUnavailable {
        /// Requested backend.
        backend: Backend,
    },

    /// The backend has no lane kernel for this segment width.
    #[error("backend {backend} does not support {width} segments")]
    UnsupportedLaneWidth {
        /// Requested backend.
        backend: Backend,
        /// Requested width.
        width: SegmentWidth,
    },

    /// A supplied state has the wrong number of segments.
    #[error("expected {expected} segments, got {actual}")]
    SegmentCount {
        /// `L + 1`.
        expected: usize,
        /// Length of the supplied vector.
        actual: usize,
    },

    /// A supplied state does not conserve `L + 1` blocks.
    #[error("segments hold {actual} blocks, expected {expected}")]
    BlockCount {
        /// `L + 1`.
        expected: u64,
        /// Sum of the supplied segments.
        actual: u64,
    },
}

/// Push limits derived from the clock period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Limits {
    /// Virtual push limit for every slot except the last occupied one.
    pub push: u32,
    /// Limit for the last occupied slot, whose rear block is inert.
    pub last_push: u32,
}

impl Limits {
    /// Derive both limits from a clock period.
    ///
    /// Returns `None` when the virtual push limit would be negative.
    #[must_use]
    pub const fn from_period(period: u32) -> Option<Self> {
        let quarter = period / 4;
        if quarter < 2 {
            return None;
        }
        let virt = quarter - 2;
        let push = if virt < HARD_PUSH_LIMIT {
            virt
        } else {
            HARD_PUSH_LIMIT
        };
        let last_push = if push + 1 < HARD_PUSH_LIMIT {
            push + 1
        } else {
            HARD_PUSH_LIMIT
        };
        Some(Self { push, last_push })
    }

    /// The limit applying to a slot, given whether it is the last occupied one.
    #[inline(always)]
    #[must_use]
    pub const fn for_slot(&self, last: bool) -> u32 {
        if last {
            self.last_push
        } else {
            self.push
        }
    }
}

/// Validated `(L, P)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExtenderConfig {
    length: u32,
    period: u32,
    limits: Limits,
}

impl ExtenderConfig {
    /// Validate a device length and clock period.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroLength`] for `length == 0`,
    /// [`ConfigError::LengthOverflow`] when `length + 1` overflows, and
    /// [`ConfigError::PeriodTooShort`] when `period / 4 < 2`.
    ///
    /// # Example
    ///
    /// ```
    /// use snaperz::ExtenderConfig;
    ///
    /// let config = ExtenderConfig::new(65, 12)?;
    /// assert_eq!(config.limits().push, 1);
    /// assert_eq!(config.limits().last_push, 2);
    /// # Ok::<(), snaperz::ConfigError>(())
    /// ```
    pub fn new(length: u32, period: u32) -> Result<Self, ConfigError> {
        if length == 0 {
            return Err(ConfigError::ZeroLength);
        }
        if length == u32::MAX {
            return Err(ConfigError::LengthOverflow { length });
        }
        let limits = Limits::from_period(period).ok_or(ConfigError::PeriodTooShort { period })?;
        Ok(Self {
            length,
            period,
            limits,
        })
    }

    /// Device length `L` (number of pistons).
    #[inline]
    #[must_use]
    pub const fn length(&self) -> u32 {
        self.length
    }

    /// Clock period `P`.
    #[inline]
    #[must_use]
    pub const fn period(&self) -> u32 {
        self.period
    }

    /// Derived push limits.
    #[inline]
    #[must_use]
    pub const fn limits(&self) -> Limits {
        self.limits
    }

    /// Number of slots, `L + 1`.
    #[inline]
    #[must_use]
    pub const fn segment_count(&self) -> usize {
        self.length as usize + 1
    }

    /// Number of blocks, `L + 1`. Conserved by every pulse.
    #[inline]
    #[must_use]
    pub const fn block_count(&self) -> u32 {
        self.length + 1
    }

    /// Narrowest segment width that can hold every block in one slot.
    #[must_use]
    pub const fn width(&self) -> SegmentWidth {
        SegmentWidth::smallest_fit(self.block_count())
    }
}

impl fmt::Display for ExtenderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "L={} P={} (push limit {}, last push limit {})",
            self.length, self.period, self.limits.push, self.limits.last_push
        )
    }
}

/// Integer width of a stored segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SegmentWidth {
    /// 8-bit segments.
    U8,
    /// 16-bit segments.
    U16,
    /// 32-bit segments.
    U32,
}

impl SegmentWidth {
    /// Narrowest width whose maximum value is at least `value`.
    ///
    /// ```
    /// use snaperz::SegmentWidth;
    ///
    /// assert_eq!(SegmentWidth::smallest_fit(66), SegmentWidth::U8);
    /// assert_eq!(SegmentWidth::smallest_fit(256), SegmentWidth::U16);
    /// ```
    #[must_use]
    pub const fn smallest_fit(value: u32) -> Self {
        if value <= u8::MAX as u32 {
            Self::U8
        } else if value <= u16::MAX as u32 {
            Self::U16
        } else {
            Self::U32
        }
    }

    /// Largest value a segment of this width holds.
    #[must_use]
    pub const fn max_value(self) -> u32 {
        match self {
            Self::U8 => u8::MAX as u32,
            Self::U16 => u16::MAX as u32,
            Self::U32 => u32::MAX,
        }
    }

    /// Check that this width holds every block of `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::WidthTooNarrow`] otherwise.
    pub fn check(self, config: &ExtenderConfig) -> Result<(), ConfigError> {
        if config.block_count() > self.max_value() {
            return Err(ConfigError::WidthTooNarrow {
                width: self,
                blocks: config.block_count(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for SegmentWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
        })
    }
}

/// Lane kernel backend for the windowed engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Backend {
    /// AVX2 when the CPU reports it and the width is supported, portable otherwise.
    #[default]
    Auto,
    /// Scalar lane arrays; available everywhere.
    Portable,
    /// 256-bit AVX2 vectors (`x86_64` only).
    Avx2,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Auto => "auto",
            Self::Portable => "portable",
            Self::Avx2 => "avx2",
        })
    }
}

/// Which engine advances the extender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum EngineKind {
    /// Sparse linked sweep, one slot at a time.
    Scalar,
    /// Lane-pipelined sweep with many pulses in flight.
    #[default]
    Windowed,
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Scalar => "scalar",
            Self::Windowed => "windowed",
        })
    }
}

/// Engine selection passed to [`crate::run_engine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EngineOptions {
    /// Engine to build.
    pub kind: EngineKind,
    /// Lane backend (windowed engine only).
    pub backend: Backend,
    /// Forced segment width (windowed engine only); narrowest fit when `None`.
    pub width: Option<SegmentWidth>,
}
