//! Lane-parallel batch operations.
//!
//! The windowed engine is written once against [`LaneKernel`] and
//! instantiated for each backend:
//!
//! - `portable`: plain arrays, any architecture. The correctness oracle.
//! - `x86_64`: 256-bit AVX2 vectors with 8- and 16-bit lanes.
//!
//! # Mask Convention
//!
//! Comparisons return a vector whose lanes are all-ones (true) or zero
//! (false). `and`, `andnot` and `select` take masks in this form.

pub mod portable;

#[cfg(target_arch = "x86_64")]
pub mod x86_64;

use core::fmt::Debug;
use core::ops::{BitAnd, BitOr, Not};

use crate::config::SegmentWidth;

pub use portable::PortableLanes;

#[cfg(target_arch = "x86_64")]
pub use x86_64::{Avx2U16, Avx2U8, CpuFeatures};

/// Unsigned lane element.
pub trait LaneElem:
    Copy
    + Default
    + Eq
    + Ord
    + Debug
    + Send
    + Sync
    + BitAnd<Output = Self>
    + BitOr<Output = Self>
    + Not<Output = Self>
    + 'static
{
    /// Storage width this element represents.
    const WIDTH: SegmentWidth;

    /// All-zeros.
    const ZERO: Self;

    /// One block.
    const ONE: Self;

    /// All-ones; also the saturation point.
    const MAX: Self;

    /// Narrow a `u32`. Callers guarantee `value <= MAX`.
    fn from_u32(value: u32) -> Self;

    /// Widen to `u32`.
    fn to_u32(self) -> u32;

    /// Saturating addition.
    fn saturating_add(self, other: Self) -> Self;

    /// Saturating subtraction.
    fn saturating_sub(self, other: Self) -> Self;
}

macro_rules! impl_lane_elem {
    ($ty:ty, $width:expr) => {
        impl LaneElem for $ty {
            const WIDTH: SegmentWidth = $width;
            const ZERO: Self = 0;
            const ONE: Self = 1;
            const MAX: Self = <$ty>::MAX;

            #[inline(always)]
            fn from_u32(value: u32) -> Self {
                debug_assert!(value <= <$ty>::MAX as u32);
                value as $ty
            }
            #[inline(always)]
            fn to_u32(self) -> u32 {
                self as u32
            }
            #[inline(always)]
            fn saturating_add(self, other: Self) -> Self {
                <$ty>::saturating_add(self, other)
            }
            #[inline(always)]
            fn saturating_sub(self, other: Self) -> Self {
                <$ty>::saturating_sub(self, other)
            }
        }
    };
}

impl_lane_elem!(u8, SegmentWidth::U8);
impl_lane_elem!(u16, SegmentWidth::U16);
impl_lane_elem!(u32, SegmentWidth::U32);

/// Fixed-width vector of unsigned lanes with saturating arithmetic.
///
/// Lane 0 is the lowest lane. Every backend must produce exactly the same
/// lane values as [`PortableLanes`] for the same inputs.
///
/// Implementors are zero-sized tokens; holding one is proof that the
/// backend may run on this machine.
pub trait LaneKernel: Copy + Debug + Send + Sync + 'static {
    /// Lane element type.
    type Elem: LaneElem;

    /// Vector of `LANES` elements.
    type Vector: Copy + Debug;

    /// Number of lanes.
    const LANES: usize;

    /// Every lane set to `value`.
    fn splat(&self, value: Self::Elem) -> Self::Vector;

    /// Load `LANES` elements, lane 0 first.
    fn from_lanes(&self, lanes: &[Self::Elem]) -> Self::Vector;

    /// Store `LANES` elements, lane 0 first.
    fn to_lanes(&self, v: Self::Vector, out: &mut [Self::Elem]);

    /// Value of one lane.
    fn extract(&self, v: Self::Vector, lane: usize) -> Self::Elem;

    /// Value of the highest lane.
    #[inline(always)]
    fn last_lane(&self, v: Self::Vector) -> Self::Elem {
        self.extract(v, Self::LANES - 1)
    }

    /// Move every lane up by one; `fill` enters lane 0 and the top lane is dropped.
    fn shift_in(&self, v: Self::Vector, fill: Self::Elem) -> Self::Vector;

    /// Lane-wise saturating `a + b`.
    fn adds(&self, a: Self::Vector, b: Self::Vector) -> Self::Vector;

    /// Lane-wise saturating `a - b`.
    fn subs(&self, a: Self::Vector, b: Self::Vector) -> Self::Vector;

    /// Lane-wise minimum.
    fn min(&self, a: Self::Vector, b: Self::Vector) -> Self::Vector;

    /// Lane-wise maximum.
    fn max(&self, a: Self::Vector, b: Self::Vector) -> Self::Vector;

    /// Lane-wise `a == b` as a mask.
    fn cmpeq(&self, a: Self::Vector, b: Self::Vector) -> Self::Vector;

    /// Bitwise `a & b`.
    fn and(&self, a: Self::Vector, b: Self::Vector) -> Self::Vector;

    /// Bitwise `!a & b`.
    fn andnot(&self, a: Self::Vector, b: Self::Vector) -> Self::Vector;

    /// Bitwise `a | b`.
    fn or(&self, a: Self::Vector, b: Self::Vector) -> Self::Vector;

    /// `a` where `mask` is set, `b` elsewhere.
    fn select(&self, mask: Self::Vector, a: Self::Vector, b: Self::Vector) -> Self::Vector;

    /// Whether every lane of `a` equals the same lane of `b`.
    fn lanes_eq(&self, a: Self::Vector, b: Self::Vector) -> bool;

    /// Lane-wise unsigned `a >= b` as a mask.
    #[inline(always)]
    fn ge(&self, a: Self::Vector, b: Self::Vector) -> Self::Vector {
        self.cmpeq(self.max(a, b), a)
    }

    /// Whether `lane` of a mask is set.
    #[inline(always)]
    fn is_set(&self, mask: Self::Vector, lane: usize) -> bool {
        self.extract(mask, lane) != Self::Elem::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elem_saturation() {
        assert_eq!(LaneElem::saturating_add(250u8, 10), u8::MAX);
        assert_eq!(LaneElem::saturating_sub(3u16, 5), 0);
        assert_eq!(<u32 as LaneElem>::from_u32(70_000).to_u32(), 70_000);
        assert_eq!(<u16 as LaneElem>::WIDTH, SegmentWidth::U16);
    }
}
