//! Known outcomes for small extenders.
//!
//! Retraction and loop counts are engine-independent.

use snaperz::{
    run_engine, Backend, EngineKind, EngineOptions, ExtenderConfig, LoopDetection, Outcome,
    RunOptions, SegmentWidth,
};

fn options(loop_check: LoopDetection) -> RunOptions {
    RunOptions {
        loop_check: Some(loop_check),
        status_interval: None,
        pulse_limit: Some(1_000_000),
    }
}

fn scalar(length: u32, period: u32, loop_check: LoopDetection) -> Outcome {
    let config = ExtenderConfig::new(length, period).unwrap();
    let engine = EngineOptions {
        kind: EngineKind::Scalar,
        ..EngineOptions::default()
    };
    run_engine(config, &engine, &options(loop_check))
        .unwrap()
        .outcome
}

/// Windowed engine with 32 lanes, whichever backend provides them.
fn windowed(length: u32, period: u32, loop_check: LoopDetection) -> Outcome {
    let config = ExtenderConfig::new(length, period).unwrap();
    let engine = EngineOptions {
        kind: EngineKind::Windowed,
        backend: Backend::Auto,
        width: Some(SegmentWidth::U8),
    };
    run_engine(config, &engine, &options(loop_check))
        .unwrap()
        .outcome
}

// =============================================================================
// Retraction
// =============================================================================

#[test]
fn retraction_counts() {
    let cases = [
        (1, 12, 1),
        (2, 12, 3),
        (3, 16, 3),
        (4, 12, 9),
        (4, 16, 8),
        (4, 20, 7),
        (5, 16, 18),
        (8, 12, 23),
        (8, 16, 19),
        (8, 24, 16),
        (10, 20, 37),
        (16, 12, 451),
        (16, 24, 35),
        (20, 12, 921),
        (20, 40, 273),
        (20, 56, 134),
        (40, 40, 139),
    ];
    for (length, period, pulses) in cases {
        let expected = Outcome::Finished { pulses };
        assert_eq!(
            scalar(length, period, LoopDetection::Fast),
            expected,
            "scalar L={length} P={period}"
        );
        assert_eq!(
            windowed(length, period, LoopDetection::Fast),
            expected,
            "windowed L={length} P={period}"
        );
    }
}

#[test]
fn long_retraction() {
    assert_eq!(
        scalar(30, 12, LoopDetection::Slow),
        Outcome::Finished { pulses: 4673 }
    );
    assert_eq!(
        windowed(40, 12, LoopDetection::Fast),
        Outcome::Finished { pulses: 21567 }
    );
}

// =============================================================================
// Loops
// =============================================================================

#[test]
fn scalar_loops_fast_and_slow() {
    let cases = [
        (3, 8, 3, 4),
        (4, 8, 2, 2),
        (16, 16, 183, 184),
        (16, 20, 79, 80),
        (20, 16, 1539, 1540),
        (20, 20, 167, 168),
        (30, 40, 69, 70),
        (40, 16, 13599, 13600),
        (40, 56, 1095, 1096),
    ];
    for (length, period, fast, slow) in cases {
        assert_eq!(
            scalar(length, period, LoopDetection::Fast),
            Outcome::Looping { pulses: fast },
            "fast L={length} P={period}"
        );
        assert_eq!(
            scalar(length, period, LoopDetection::Slow),
            Outcome::Looping { pulses: slow },
            "slow L={length} P={period}"
        );
    }
}

#[test]
fn full_length_loops() {
    assert_eq!(
        scalar(65, 24, LoopDetection::Fast),
        Outcome::Looping { pulses: 4163 }
    );
    assert_eq!(
        scalar(65, 56, LoopDetection::Fast),
        Outcome::Looping { pulses: 551 }
    );
}

#[test]
fn windowed_loops_match_scalar() {
    let cases = [
        (3, 8, 3, 4),
        (16, 16, 183, 184),
        (16, 20, 79, 80),
        (30, 40, 69, 70),
        (40, 16, 13599, 13600),
    ];
    for (length, period, fast, slow) in cases {
        assert_eq!(
            windowed(length, period, LoopDetection::Fast),
            Outcome::Looping { pulses: fast },
            "fast L={length} P={period}"
        );
        assert_eq!(
            windowed(length, period, LoopDetection::Slow),
            Outcome::Looping { pulses: slow },
            "slow L={length} P={period}"
        );
    }
}

#[test]
fn pulse_limit_reports_halt() {
    let config = ExtenderConfig::new(65, 12).unwrap();
    let options = RunOptions {
        loop_check: None,
        status_interval: None,
        pulse_limit: Some(500),
    };
    let report = run_engine(config, &EngineOptions::default(), &options).unwrap();
    assert_eq!(report.outcome, Outcome::Halted { pulses: 500 });
}
