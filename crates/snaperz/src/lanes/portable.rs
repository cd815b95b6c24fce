//! Portable lane kernel.
//!
//! Works on any architecture with plain arrays. Slower than the SIMD
//! kernels but used as the reference they are tested against.

use core::marker::PhantomData;

use super::{LaneElem, LaneKernel};

/// Scalar kernel over `[T; N]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PortableLanes<T, const N: usize> {
    _elem: PhantomData<T>,
}

impl<T, const N: usize> PortableLanes<T, N> {
    /// Create a portable kernel.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self { _elem: PhantomData }
    }
}

#[inline(always)]
fn zip<T: LaneElem, const N: usize>(a: [T; N], b: [T; N], f: impl Fn(T, T) -> T) -> [T; N] {
    core::array::from_fn(|i| f(a[i], b[i]))
}

#[inline(always)]
fn mask<T: LaneElem>(set: bool) -> T {
    if set {
        T::MAX
    } else {
        T::ZERO
    }
}

impl<T: LaneElem, const N: usize> LaneKernel for PortableLanes<T, N> {
    type Elem = T;
    type Vector = [T; N];
    const LANES: usize = N;

    #[inline(always)]
    fn splat(&self, value: T) -> [T; N] {
        [value; N]
    }

    #[inline(always)]
    fn from_lanes(&self, lanes: &[T]) -> [T; N] {
        core::array::from_fn(|i| lanes[i])
    }

    #[inline(always)]
    fn to_lanes(&self, v: [T; N], out: &mut [T]) {
        out[..N].copy_from_slice(&v);
    }

    #[inline(always)]
    fn extract(&self, v: [T; N], lane: usize) -> T {
        v[lane]
    }

    #[inline(always)]
    fn shift_in(&self, v: [T; N], fill: T) -> [T; N] {
        core::array::from_fn(|i| if i == 0 { fill } else { v[i - 1] })
    }

    #[inline(always)]
    fn adds(&self, a: [T; N], b: [T; N]) -> [T; N] {
        zip(a, b, T::saturating_add)
    }

    #[inline(always)]
    fn subs(&self, a: [T; N], b: [T; N]) -> [T; N] {
        zip(a, b, T::saturating_sub)
    }

    #[inline(always)]
    fn min(&self, a: [T; N], b: [T; N]) -> [T; N] {
        zip(a, b, Ord::min)
    }

    #[inline(always)]
    fn max(&self, a: [T; N], b: [T; N]) -> [T; N] {
        zip(a, b, Ord::max)
    }

    #[inline(always)]
    fn cmpeq(&self, a: [T; N], b: [T; N]) -> [T; N] {
        zip(a, b, |x, y| mask(x == y))
    }

    #[inline(always)]
    fn and(&self, a: [T; N], b: [T; N]) -> [T; N] {
        zip(a, b, |x, y| x & y)
    }

    #[inline(always)]
    fn andnot(&self, a: [T; N], b: [T; N]) -> [T; N] {
        zip(a, b, |x, y| !x & y)
    }

    #[inline(always)]
    fn or(&self, a: [T; N], b: [T; N]) -> [T; N] {
        zip(a, b, |x, y| x | y)
    }

    #[inline(always)]
    fn select(&self, m: [T; N], a: [T; N], b: [T; N]) -> [T; N] {
        core::array::from_fn(|i| if m[i] != T::ZERO { a[i] } else { b[i] })
    }

    #[inline(always)]
    fn lanes_eq(&self, a: [T; N], b: [T; N]) -> bool {
        a == b
    }
}
