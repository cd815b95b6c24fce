//! x86_64 lane kernels.
//!
//! # Kernels
//!
//! | Kernel | Lanes | Element |
//! |--------|-------|---------|
//! | [`Avx2U8`] | 32 | `u8` |
//! | [`Avx2U16`] | 16 | `u16` |
//!
//! Both operate on one `__m256i` per vector and need AVX2 at runtime.
//! A kernel token is only handed out after [`CpuFeatures::detect`] reports
//! AVX2, or through an `unsafe` constructor.

mod avx2;
mod features;

pub(crate) use avx2::simulate_pulse_avx2;
pub use avx2::{Avx2U16, Avx2U8};
pub use features::CpuFeatures;
