//! Snaperz extender simulator.
//!
//! An extender is a chain of `L + 1` slots holding `L + 1` blocks. Every
//! clock pulse each occupied slot either pulls its successor in (a single
//! piston) or pushes blocks out to it (a stack of pistons). The question for
//! a given length `L` and clock period `P` is whether the device ever fully
//! retracts, and after how many pulses, or whether it cycles forever.
//!
//! # Engines
//!
//! | Engine | Representation | Pulses in flight |
//! |--------|----------------|------------------|
//! | [`ScalarExtender`] | sparse linked slots | 1 |
//! | [`WindowedExtender`] | lane window over a storage ring | lane count (up to 32) |
//!
//! Both implement [`Extender`] and agree after every pulse.
//!
//! # Example: Single Run
//!
//! ```
//! use snaperz::{CycleDetector, ExtenderConfig, LoopDetection, ScalarExtender, SimulationState};
//!
//! let config = ExtenderConfig::new(4, 16)?;
//! let mut detector = CycleDetector::new(ScalarExtender::new(config), LoopDetection::Fast);
//! let state = loop {
//!     let state = detector.advance();
//!     if state.is_terminal() {
//!         break state;
//!     }
//! };
//! assert_eq!(state, SimulationState::Finished { pulses: 8 });
//! # Ok::<(), snaperz::ConfigError>(())
//! ```
//!
//! # Example: Driver
//!
//! ```
//! use snaperz::{run_engine, EngineOptions, ExtenderConfig, Outcome, RunOptions};
//!
//! let config = ExtenderConfig::new(3, 8)?;
//! let report = run_engine(config, &EngineOptions::default(), &RunOptions::default())?;
//! assert_eq!(report.outcome, Outcome::Looping { pulses: 3 });
//! assert_eq!(report.outcome.to_string(), "Loop at 3 pulses.");
//! # Ok::<(), snaperz::ConfigError>(())
//! ```

#![warn(missing_docs)]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod config;
pub mod cycle;
pub mod driver;
pub mod extender;
pub mod lanes;
pub mod pulse;
pub mod segment;
pub mod window;

pub use config::{
    Backend, ConfigError, EngineKind, EngineOptions, ExtenderConfig, Limits, SegmentWidth,
    HARD_PUSH_LIMIT, MIN_PERIOD,
};
pub use cycle::{CycleDetector, LoopDetection, SimulationState};
pub use driver::{
    format_elapsed, run_engine, Outcome, Report, RunOptions, Simulation, DEFAULT_STATUS_INTERVAL,
};
pub use extender::{Extender, WindowedExtender};
pub use pulse::ScalarExtender;
pub use segment::SegmentStore;
pub use window::WindowedPipeline;
