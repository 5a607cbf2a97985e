//! Asymmetric attack/decay filter applied once per analysis window.

use super::features::{BandEnergies, SmoothedBands};
use super::AnalysisError;

/// Default decay coefficient. Applied per window, so the perceived release
/// time depends on window size and sample rate.
pub const SMOOTHING: f32 = 0.15;

#[derive(Clone, Copy, Debug)]
pub struct Smoother {
    coefficient: f32,
    state: SmoothedBands,
}

impl Smoother {
    pub fn new(coefficient: f32) -> Result<Self, AnalysisError> {
        Self::with_state(coefficient, SmoothedBands::ZERO)
    }

    /// Resume from previously published values, e.g. when a session restarts.
    pub fn with_state(coefficient: f32, state: SmoothedBands) -> Result<Self, AnalysisError> {
        if !(coefficient > 0.0 && coefficient <= 1.0) {
            return Err(AnalysisError::InvalidSmoothing(coefficient));
        }
        Ok(Self { coefficient, state })
    }

    pub fn state(&self) -> SmoothedBands {
        self.state
    }

    pub fn apply(&mut self, raw: BandEnergies) -> SmoothedBands {
        self.state = SmoothedBands {
            bass: step(self.state.bass, raw.bass, self.coefficient),
            mids: step(self.state.mids, raw.mids, self.coefficient),
            treble: step(self.state.treble, raw.treble, self.coefficient),
        };
        self.state
    }
}

impl Default for Smoother {
    fn default() -> Self {
        Self {
            coefficient: SMOOTHING,
            state: SmoothedBands::ZERO,
        }
    }
}

/// Instant attack, geometric release toward `raw`.
pub fn step(previous: f32, raw: f32, coefficient: f32) -> f32 {
    if raw > previous {
        raw
    } else {
        previous + (raw - previous) * coefficient
    }
}
