//! Constant-memory loop detection.
//!
//! A hare advances every iteration and a tortoise every second iteration.
//! If the trajectory is eventually periodic the two meet inside the cycle,
//! and no history is stored.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::extender::Extender;

/// How often hare and tortoise are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum LoopDetection {
    /// Compare after every pulse.
    #[default]
    Fast,
    /// Compare after even pulses only; half the comparisons, detection may
    /// come one pulse later.
    Slow,
}

impl fmt::Display for LoopDetection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Fast => "fast",
            Self::Slow => "slow",
        })
    }
}

/// Where a simulation stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SimulationState {
    /// Neither terminal signal has fired.
    Running,
    /// Every block reached slot 0 after `pulses` pulses.
    Finished {
        /// Pulses taken.
        pulses: u64,
    },
    /// Hare and tortoise met after `pulses` hare pulses.
    Looping {
        /// Hare pulse count at detection.
        pulses: u64,
    },
}

impl SimulationState {
    /// Whether the simulation has stopped.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// Hare and tortoise over one engine type.
#[derive(Debug, Clone)]
pub struct CycleDetector<E: Extender> {
    hare: E,
    tortoise: E,
    mode: LoopDetection,
    pulses: u64,
}

impl<E: Extender> CycleDetector<E> {
    /// Start both runners from `extender`'s state.
    #[must_use]
    pub fn new(extender: E, mode: LoopDetection) -> Self {
        let tortoise = extender.clone();
        Self {
            hare: extender,
            tortoise,
            mode,
            pulses: 0,
        }
    }

    /// The fast runner.
    #[must_use]
    pub fn hare(&self) -> &E {
        &self.hare
    }

    /// The slow runner.
    #[must_use]
    pub fn tortoise(&self) -> &E {
        &self.tortoise
    }

    /// Comparison mode.
    #[must_use]
    pub fn mode(&self) -> LoopDetection {
        self.mode
    }

    /// Hare pulses so far.
    #[must_use]
    pub fn pulses(&self) -> u64 {
        self.pulses
    }

    /// Run one iteration: pulse the hare, maybe the tortoise, then test.
    ///
    /// Termination is checked before equality. Once a terminal state has
    /// been returned, further calls return it again without pulsing.
    pub fn advance(&mut self) -> SimulationState {
        if self.hare.finished() {
            return SimulationState::Finished {
                pulses: self.pulses,
            };
        }

        self.hare.simulate_pulse();
        self.pulses += 1;
        let even = self.pulses % 2 == 0;
        if even {
            self.tortoise.simulate_pulse();
        }

        if self.hare.finished() {
            return SimulationState::Finished {
                pulses: self.pulses,
            };
        }
        // The tortoise takes its first step on pulse 2.
        let compare = match self.mode {
            LoopDetection::Fast => self.pulses >= 2,
            LoopDetection::Slow => even,
        };
        if compare && self.hare.equals(&self.tortoise) {
            return SimulationState::Looping {
                pulses: self.pulses,
            };
        }
        SimulationState::Running
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtenderConfig;
    use crate::pulse::ScalarExtender;

    fn run(length: u32, period: u32, mode: LoopDetection) -> SimulationState {
        let config = ExtenderConfig::new(length, period).unwrap();
        let mut detector = CycleDetector::new(ScalarExtender::new(config), mode);
        loop {
            let state = detector.advance();
            if state.is_terminal() {
                return state;
            }
        }
    }

    #[test]
    fn test_finishes() {
        assert_eq!(
            run(1, 12, LoopDetection::Fast),
            SimulationState::Finished { pulses: 1 }
        );
        assert_eq!(
            run(4, 16, LoopDetection::Fast),
            SimulationState::Finished { pulses: 8 }
        );
        assert_eq!(
            run(16, 12, LoopDetection::Slow),
            SimulationState::Finished { pulses: 451 }
        );
    }

    #[test]
    fn test_two_cycle_fast_and_slow() {
        assert_eq!(
            run(3, 8, LoopDetection::Fast),
            SimulationState::Looping { pulses: 3 }
        );
        assert_eq!(
            run(3, 8, LoopDetection::Slow),
            SimulationState::Looping { pulses: 4 }
        );
    }

    #[test]
    fn test_long_loops() {
        assert_eq!(
            run(16, 16, LoopDetection::Fast),
            SimulationState::Looping { pulses: 183 }
        );
        assert_eq!(
            run(16, 16, LoopDetection::Slow),
            SimulationState::Looping { pulses: 184 }
        );
        assert_eq!(
            run(30, 40, LoopDetection::Fast),
            SimulationState::Looping { pulses: 69 }
        );
    }

    #[test]
    fn test_terminal_state_is_sticky() {
        let config = ExtenderConfig::new(1, 12).unwrap();
        let mut detector = CycleDetector::new(ScalarExtender::new(config), LoopDetection::Fast);
        assert_eq!(detector.advance(), SimulationState::Finished { pulses: 1 });
        assert_eq!(detector.advance(), SimulationState::Finished { pulses: 1 });
        assert_eq!(detector.hare().pulses(), 1);
        assert_eq!(detector.tortoise().pulses(), 0);
    }
}
