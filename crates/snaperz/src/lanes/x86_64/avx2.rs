//! AVX2 lane kernels.
//!
//! # Lane Shift
//!
//! `shift_in` moves every lane up by one element across the 128-bit halves:
//!
//! ```text
//! carry   = permute2x128(v, v, 0x08)     // [0, v.lo]
//! shifted = alignr(v, carry, 16 - size)  // per half: (v:carry) >> (16 - size)
//! result  = insert(shifted, fill, 0)
//! ```

use core::arch::x86_64::*;
use core::mem::size_of;

use super::CpuFeatures;
use crate::lanes::LaneKernel;
use crate::window::WindowedPipeline;

macro_rules! avx2_kernel {
    (
        $(#[$doc:meta])*
        $name:ident {
            elem: $elem:ty as $signed:ty,
            lanes: $lanes:expr,
            set1: $set1:ident,
            adds: $adds:ident,
            subs: $subs:ident,
            min: $min:ident,
            max: $max:ident,
            cmpeq: $cmpeq:ident,
            insert: $insert:ident,
            align: $align:literal,
        }
    ) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy)]
        pub struct $name {
            _private: (),
        }

        impl $name {
            /// Hand out a kernel if the CPU supports AVX2.
            #[must_use]
            pub fn detect() -> Option<Self> {
                // SAFETY: AVX2 was just detected.
                CpuFeatures::detect()
                    .avx2
                    .then(|| unsafe { Self::new_unchecked() })
            }

            /// Create a kernel without CPU feature validation.
            ///
            /// # Safety
            ///
            /// Executing any kernel operation on a CPU without AVX2 is
            /// undefined behavior (SIGILL).
            #[inline]
            #[must_use]
            pub const unsafe fn new_unchecked() -> Self {
                Self { _private: () }
            }
        }

        // SAFETY (all blocks below): a kernel value only exists once AVX2
        // has been detected or asserted through `new_unchecked`.
        impl LaneKernel for $name {
            type Elem = $elem;
            type Vector = __m256i;
            const LANES: usize = $lanes;

            #[inline(always)]
            fn splat(&self, value: $elem) -> __m256i {
                unsafe { $set1(value as $signed) }
            }

            #[inline(always)]
            fn from_lanes(&self, lanes: &[$elem]) -> __m256i {
                assert!(lanes.len() >= $lanes);
                unsafe { _mm256_loadu_si256(lanes.as_ptr().cast()) }
            }

            #[inline(always)]
            fn to_lanes(&self, v: __m256i, out: &mut [$elem]) {
                assert!(out.len() >= $lanes);
                unsafe { _mm256_storeu_si256(out.as_mut_ptr().cast(), v) }
            }

            #[inline(always)]
            fn extract(&self, v: __m256i, lane: usize) -> $elem {
                let mut out = [0; $lanes];
                self.to_lanes(v, &mut out);
                out[lane]
            }

            #[inline(always)]
            fn shift_in(&self, v: __m256i, fill: $elem) -> __m256i {
                unsafe {
                    let carry = _mm256_permute2x128_si256::<0x08>(v, v);
                    let shifted = _mm256_alignr_epi8::<$align>(v, carry);
                    $insert::<0>(shifted, fill as $signed)
                }
            }

            #[inline(always)]
            fn adds(&self, a: __m256i, b: __m256i) -> __m256i {
                unsafe { $adds(a, b) }
            }

            #[inline(always)]
            fn subs(&self, a: __m256i, b: __m256i) -> __m256i {
                unsafe { $subs(a, b) }
            }

            #[inline(always)]
            fn min(&self, a: __m256i, b: __m256i) -> __m256i {
                unsafe { $min(a, b) }
            }

            #[inline(always)]
            fn max(&self, a: __m256i, b: __m256i) -> __m256i {
                unsafe { $max(a, b) }
            }

            #[inline(always)]
            fn cmpeq(&self, a: __m256i, b: __m256i) -> __m256i {
                unsafe { $cmpeq(a, b) }
            }

            #[inline(always)]
            fn and(&self, a: __m256i, b: __m256i) -> __m256i {
                unsafe { _mm256_and_si256(a, b) }
            }

            #[inline(always)]
            fn andnot(&self, a: __m256i, b: __m256i) -> __m256i {
                unsafe { _mm256_andnot_si256(a, b) }
            }

            #[inline(always)]
            fn or(&self, a: __m256i, b: __m256i) -> __m256i {
                unsafe { _mm256_or_si256(a, b) }
            }

            #[inline(always)]
            fn select(&self, mask: __m256i, a: __m256i, b: __m256i) -> __m256i {
                // Masks are whole-lane, so a byte blend is exact for 16-bit lanes too.
                unsafe { _mm256_blendv_epi8(b, a, mask) }
            }

            #[inline(always)]
            fn lanes_eq(&self, a: __m256i, b: __m256i) -> bool {
                unsafe { _mm256_movemask_epi8(_mm256_cmpeq_epi8(a, b)) == -1 }
            }

            #[inline(always)]
            fn is_set(&self, mask: __m256i, lane: usize) -> bool {
                let bits = unsafe { _mm256_movemask_epi8(mask) } as u32;
                (bits >> (lane * size_of::<$elem>())) & 1 != 0
            }
        }
    };
}

avx2_kernel! {
    /// 32 lanes of `u8` in one YMM register.
    ///
    /// Holds extenders with `L + 1 <= 255`.
    Avx2U8 {
        elem: u8 as i8,
        lanes: 32,
        set1: _mm256_set1_epi8,
        adds: _mm256_adds_epu8,
        subs: _mm256_subs_epu8,
        min: _mm256_min_epu8,
        max: _mm256_max_epu8,
        cmpeq: _mm256_cmpeq_epi8,
        insert: _mm256_insert_epi8,
        align: 15,
    }
}

avx2_kernel! {
    /// 16 lanes of `u16` in one YMM register.
    Avx2U16 {
        elem: u16 as i16,
        lanes: 16,
        set1: _mm256_set1_epi16,
        adds: _mm256_adds_epu16,
        subs: _mm256_subs_epu16,
        min: _mm256_min_epu16,
        max: _mm256_max_epu16,
        cmpeq: _mm256_cmpeq_epi16,
        insert: _mm256_insert_epi16,
        align: 14,
    }
}

/// Advance a pipeline by one pulse with AVX2 code generation.
///
/// # Safety
///
/// The CPU must support AVX2.
#[target_feature(enable = "avx2")]
pub(crate) unsafe fn simulate_pulse_avx2<K: LaneKernel>(pipeline: &mut WindowedPipeline<K>) {
    pipeline.simulate_pulse();
}
