//! Simulation driver.
//!
//! Repeats pulses until the extender retracts, a loop is detected, or an
//! optional pulse cap is hit, logging a status line at a fixed interval.

use core::fmt;
use std::time::{Duration, Instant};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, EngineKind, EngineOptions, ExtenderConfig};
use crate::cycle::{CycleDetector, LoopDetection, SimulationState};
use crate::extender::{Extender, WindowedExtender};
use crate::pulse::ScalarExtender;

/// Pulses between status lines by default.
pub const DEFAULT_STATUS_INTERVAL: u64 = 100_000_000;

/// Driver settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RunOptions {
    /// Loop detection mode, or `None` to only stop on retraction.
    pub loop_check: Option<LoopDetection>,
    /// Pulses between status lines, or `None` for no status lines.
    pub status_interval: Option<u64>,
    /// Stop after this many pulses even if still running.
    pub pulse_limit: Option<u64>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            loop_check: Some(LoopDetection::Fast),
            status_interval: Some(DEFAULT_STATUS_INTERVAL),
            pulse_limit: None,
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Outcome {
    /// Fully retracted.
    Finished {
        /// Pulses taken.
        pulses: u64,
    },
    /// Entered a cycle.
    Looping {
        /// Pulse count at detection.
        pulses: u64,
    },
    /// Stopped at the pulse limit.
    Halted {
        /// Pulses taken.
        pulses: u64,
    },
}

impl Outcome {
    /// Pulse count at the end of the run.
    #[must_use]
    pub const fn pulses(&self) -> u64 {
        match *self {
            Self::Finished { pulses } | Self::Looping { pulses } | Self::Halted { pulses } => {
                pulses
            }
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finished { pulses } => write!(f, "Done! {pulses} pulses in total."),
            Self::Looping { pulses } => write!(f, "Loop at {pulses} pulses."),
            Self::Halted { pulses } => write!(f, "Halted after {pulses} pulses."),
        }
    }
}

/// Result of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Report {
    /// How the run ended.
    pub outcome: Outcome,
    /// Wall-clock time spent pulsing.
    pub elapsed: Duration,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.outcome)?;
        write!(f, "The operation took {}.", format_elapsed(self.elapsed))
    }
}

/// Format a duration as `"<seconds> seconds"` with millisecond precision.
///
/// ```
/// use std::time::Duration;
/// use snaperz::format_elapsed;
///
/// assert_eq!(format_elapsed(Duration::from_millis(12_345)), "12.345 seconds");
/// ```
#[must_use]
pub fn format_elapsed(elapsed: Duration) -> String {
    format!("{}.{:03} seconds", elapsed.as_secs(), elapsed.subsec_millis())
}

enum Runner<E: Extender> {
    Plain(E),
    Checked(CycleDetector<E>),
}

/// A single run of one engine.
pub struct Simulation<E: Extender> {
    runner: Runner<E>,
    options: RunOptions,
}

impl<E: Extender> Simulation<E> {
    /// Prepare a run starting from `extender`.
    #[must_use]
    pub fn new(extender: E, options: RunOptions) -> Self {
        let runner = match options.loop_check {
            Some(mode) => Runner::Checked(CycleDetector::new(extender, mode)),
            None => Runner::Plain(extender),
        };
        Self { runner, options }
    }

    /// One iteration of the driver loop.
    pub fn advance(&mut self) -> SimulationState {
        match &mut self.runner {
            Runner::Checked(detector) => detector.advance(),
            Runner::Plain(extender) => {
                if extender.finished() {
                    return SimulationState::Finished {
                        pulses: extender.pulses(),
                    };
                }
                extender.simulate_pulse();
                if extender.finished() {
                    SimulationState::Finished {
                        pulses: extender.pulses(),
                    }
                } else {
                    SimulationState::Running
                }
            }
        }
    }

    /// Pulses taken by the (hare) extender.
    #[must_use]
    pub fn pulses(&self) -> u64 {
        match &self.runner {
            Runner::Checked(detector) => detector.pulses(),
            Runner::Plain(extender) => extender.pulses(),
        }
    }

    /// Run to a terminal state or the pulse limit.
    pub fn run(mut self) -> Report {
        let start = Instant::now();
        let interval = self.options.status_interval.filter(|&n| n > 0);

        let outcome = loop {
            if let Some(limit) = self.options.pulse_limit {
                if self.pulses() >= limit {
                    break Outcome::Halted {
                        pulses: self.pulses(),
                    };
                }
            }
            match self.advance() {
                SimulationState::Running => {}
                SimulationState::Finished { pulses } => break Outcome::Finished { pulses },
                SimulationState::Looping { pulses } => break Outcome::Looping { pulses },
            }
            if let Some(every) = interval {
                let pulses = self.pulses();
                if pulses % every == 0 {
                    tracing::info!(pulses, "{pulses} pulses so far...");
                }
            }
        };

        let elapsed = start.elapsed();
        tracing::info!(
            pulses = outcome.pulses(),
            elapsed = %format_elapsed(elapsed),
            "{outcome}"
        );
        Report { outcome, elapsed }
    }
}

/// Build the engine described by `engine` and run it.
///
/// # Errors
///
/// Returns the engine's construction error, see [`WindowedExtender::new`].
pub fn run_engine(
    config: ExtenderConfig,
    engine: &EngineOptions,
    options: &RunOptions,
) -> Result<Report, ConfigError> {
    tracing::info!(%config, engine = %engine.kind, loop_check = ?options.loop_check, "starting simulation");
    let report = match engine.kind {
        EngineKind::Scalar => Simulation::new(ScalarExtender::new(config), *options).run(),
        EngineKind::Windowed => {
            let extender = WindowedExtender::new(config, engine.backend, engine.width)?;
            Simulation::new(extender, *options).run()
        }
    };
    Ok(report)
}
