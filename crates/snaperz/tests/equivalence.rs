//! Property-based equivalence between the scalar and windowed engines.
//!
//! Random conserving states are advanced by both engines; the windowed
//! read-out must match the scalar state after every pulse. The portable
//! kernel is the reference for the AVX2 kernels.

use proptest::prelude::*;
use snaperz::lanes::{LaneKernel, PortableLanes};
use snaperz::{
    Backend, Extender, ExtenderConfig, ScalarExtender, SegmentStore, SegmentWidth,
    WindowedExtender, WindowedPipeline,
};

const PERIODS: [u32; 12] = [8, 9, 12, 13, 16, 20, 24, 33, 40, 56, 64, 100];

/// `(length, period, lengths)` with `L + 1` blocks scattered over `L + 1` slots.
fn conserving_state(max_length: u32) -> impl Strategy<Value = (u32, u32, Vec<u32>)> {
    (1..=max_length, prop::sample::select(PERIODS.to_vec()))
        .prop_flat_map(|(length, period)| {
            let slots = length as usize + 1;
            (
                Just(length),
                Just(period),
                prop::collection::vec(0..slots, slots),
                any::<bool>(),
            )
        })
        .prop_map(|(length, period, picks, extended)| {
            let mut lengths = vec![0u32; length as usize + 1];
            if extended {
                lengths.fill(1);
            } else {
                for slot in picks {
                    lengths[slot] += 1;
                }
            }
            (length, period, lengths)
        })
}

fn track<E: Extender>(
    scalar: &mut ScalarExtender,
    other: &mut E,
    pulses: usize,
) -> Result<(), TestCaseError> {
    prop_assert_eq!(other.segments(), scalar.segments(), "initial read-out");
    prop_assert_eq!(other.finished(), scalar.finished());
    for pulse in 0..pulses {
        if scalar.finished() {
            break;
        }
        scalar.simulate_pulse();
        other.simulate_pulse();
        prop_assert_eq!(other.segments(), scalar.segments(), "after pulse {}", pulse + 1);
        prop_assert_eq!(other.finished(), scalar.finished(), "finished after pulse {}", pulse + 1);
        prop_assert_eq!(other.pulses(), scalar.pulses());
    }
    Ok(())
}

fn track_pipeline<K: LaneKernel>(
    kernel: K,
    config: ExtenderConfig,
    lengths: &[u32],
    pulses: usize,
) -> Result<(), TestCaseError> {
    let mut scalar = ScalarExtender::from_lengths(config, lengths).unwrap();
    let mut window = WindowedPipeline::from_lengths(kernel, config, lengths).unwrap();
    let blocks = u64::from(config.block_count());
    for pulse in 0..pulses {
        if scalar.finished() {
            break;
        }
        scalar.simulate_pulse();
        window.simulate_pulse();
        prop_assert_eq!(window.read_out(), scalar.segments(), "W={} pulse {}", K::LANES, pulse + 1);
        prop_assert_eq!(window.finished(), scalar.finished());
        prop_assert_eq!(window.block_count(), blocks);
    }
    Ok(())
}

// =============================================================================
// Scalar Invariants
// =============================================================================

proptest! {
    /// Every pulse conserves L + 1 blocks and keeps the links consistent.
    #[test]
    fn prop_scalar_conserves_blocks((length, period, lengths) in conserving_state(60), pulses in 1usize..200) {
        let config = ExtenderConfig::new(length, period).unwrap();
        let mut scalar = ScalarExtender::from_lengths(config, &lengths).unwrap();
        for _ in 0..pulses {
            if scalar.finished() {
                break;
            }
            scalar.simulate_pulse();
            prop_assert_eq!(scalar.store().block_count(), u64::from(length) + 1);
            prop_assert!(scalar.store().check_links());
        }
    }

    /// A sparse store rebuilt from a simulated state has the same links.
    #[test]
    fn prop_store_rebuild_matches((length, period, lengths) in conserving_state(40), pulses in 0usize..50) {
        let config = ExtenderConfig::new(length, period).unwrap();
        let mut scalar = ScalarExtender::from_lengths(config, &lengths).unwrap();
        for _ in 0..pulses {
            if scalar.finished() {
                break;
            }
            scalar.simulate_pulse();
        }
        let rebuilt = SegmentStore::from_lengths(&config, &scalar.segments()).unwrap();
        prop_assert!(rebuilt.occupied().eq(scalar.store().occupied()));
    }
}

// =============================================================================
// Windowed vs Scalar
// =============================================================================

proptest! {
    /// 8-bit portable engine tracks the scalar engine.
    #[test]
    fn prop_portable_u8_matches_scalar((length, period, lengths) in conserving_state(70), pulses in 1usize..150) {
        let config = ExtenderConfig::new(length, period).unwrap();
        let mut scalar = ScalarExtender::from_lengths(config, &lengths).unwrap();
        let mut window =
            WindowedExtender::from_lengths(config, Backend::Portable, Some(SegmentWidth::U8), &lengths).unwrap();
        track(&mut scalar, &mut window, pulses)?;
    }

    /// 16- and 32-bit portable engines track the scalar engine.
    #[test]
    fn prop_portable_wide_matches_scalar((length, period, lengths) in conserving_state(50), pulses in 1usize..100) {
        let config = ExtenderConfig::new(length, period).unwrap();
        for width in [SegmentWidth::U16, SegmentWidth::U32] {
            let mut scalar = ScalarExtender::from_lengths(config, &lengths).unwrap();
            let mut window =
                WindowedExtender::from_lengths(config, Backend::Portable, Some(width), &lengths).unwrap();
            track(&mut scalar, &mut window, pulses)?;
        }
    }

    /// Narrow windows exercise rings much longer than the window.
    #[test]
    fn prop_narrow_windows_match_scalar((length, period, lengths) in conserving_state(60), pulses in 1usize..120) {
        let config = ExtenderConfig::new(length, period).unwrap();
        track_pipeline(PortableLanes::<u8, 1>::new(), config, &lengths, pulses)?;
        track_pipeline(PortableLanes::<u8, 2>::new(), config, &lengths, pulses)?;
        track_pipeline(PortableLanes::<u16, 4>::new(), config, &lengths, pulses)?;
        track_pipeline(PortableLanes::<u32, 5>::new(), config, &lengths, pulses)?;
    }

    /// Whatever backend `Auto` picks tracks the scalar engine.
    #[test]
    fn prop_auto_backend_matches_scalar((length, period, lengths) in conserving_state(70), pulses in 1usize..150) {
        let config = ExtenderConfig::new(length, period).unwrap();
        let mut scalar = ScalarExtender::from_lengths(config, &lengths).unwrap();
        let mut window = WindowedExtender::from_lengths(config, Backend::Auto, None, &lengths).unwrap();
        track(&mut scalar, &mut window, pulses)?;
    }
}

// =============================================================================
// AVX2 vs Portable
// =============================================================================

#[cfg(target_arch = "x86_64")]
proptest! {
    /// AVX2 pipelines hold exactly the portable pipeline's state.
    #[test]
    fn prop_avx2_matches_portable((length, period, lengths) in conserving_state(70), pulses in 1usize..150) {
        use snaperz::lanes::CpuFeatures;

        if !CpuFeatures::detect().avx2 {
            return Ok(());
        }
        let config = ExtenderConfig::new(length, period).unwrap();
        for width in [SegmentWidth::U8, SegmentWidth::U16] {
            let mut simd = WindowedExtender::from_lengths(config, Backend::Avx2, Some(width), &lengths).unwrap();
            let mut portable =
                WindowedExtender::from_lengths(config, Backend::Portable, Some(width), &lengths).unwrap();
            for _ in 0..pulses {
                if portable.finished() {
                    break;
                }
                simd.simulate_pulse();
                portable.simulate_pulse();
                prop_assert_eq!(simd.segments(), portable.segments());
                prop_assert_eq!(simd.finished(), portable.finished());
            }
        }
    }
}

// =============================================================================
// Equality Laws
// =============================================================================

proptest! {
    /// Reflexive, symmetric and transitive across clones advanced in step.
    #[test]
    fn prop_equality_laws((length, period, lengths) in conserving_state(40), pulses in 0usize..60) {
        let config = ExtenderConfig::new(length, period).unwrap();
        let mut a = WindowedExtender::from_lengths(config, Backend::Auto, None, &lengths).unwrap();
        let mut s = ScalarExtender::from_lengths(config, &lengths).unwrap();
        for _ in 0..pulses {
            if s.finished() {
                break;
            }
            a.simulate_pulse();
            s.simulate_pulse();
        }
        let b = a.clone();
        let c = b.clone();
        prop_assert!(a.equals(&a));
        prop_assert!(a.equals(&b) && b.equals(&a));
        prop_assert!(a.equals(&b) && b.equals(&c) && a.equals(&c));

        let t = s.clone();
        prop_assert!(s.equals(&t) && t.equals(&s));
    }

    /// Pulsing one copy makes it differ whenever its state changed.
    #[test]
    fn prop_divergence_detected((length, period, lengths) in conserving_state(40)) {
        let config = ExtenderConfig::new(length, period).unwrap();
        let s = ScalarExtender::from_lengths(config, &lengths).unwrap();
        prop_assume!(!s.finished());
        let mut moved = s.clone();
        moved.simulate_pulse();
        prop_assert_eq!(s.equals(&moved), s.segments() == moved.segments());

        let w = WindowedExtender::from_lengths(config, Backend::Auto, None, &lengths).unwrap();
        let mut w_moved = w.clone();
        w_moved.simulate_pulse();
        prop_assert_eq!(w.equals(&w_moved), w.segments() == w_moved.segments());
        prop_assert_eq!(w.equals(&w_moved), s.equals(&moved));
    }

    /// Windowed equality holds exactly when the read-outs agree.
    #[test]
    fn prop_windowed_equality_is_structural((length, period, lengths) in conserving_state(30), a in 0usize..80, b in 0usize..80) {
        let config = ExtenderConfig::new(length, period).unwrap();
        let start = WindowedExtender::from_lengths(config, Backend::Portable, None, &lengths).unwrap();
        let advance = |n: usize| {
            let mut e = start.clone();
            for _ in 0..n {
                if e.finished() {
                    break;
                }
                e.simulate_pulse();
            }
            e
        };
        let (x, y) = (advance(a), advance(b));
        prop_assert_eq!(x.equals(&y), x.segments() == y.segments());
        prop_assert_eq!(y.equals(&x), x.equals(&y));
    }
}

#[test]
fn fresh_extenders_are_equal() {
    let config = ExtenderConfig::new(65, 24).unwrap();
    assert!(ScalarExtender::new(config).equals(&ScalarExtender::new(config)));
    let a = WindowedExtender::new(config, Backend::Auto, None).unwrap();
    let b = WindowedExtender::new(config, Backend::Auto, None).unwrap();
    assert!(a.equals(&b));
}
