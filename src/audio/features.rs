/// Per-window band intensities straight out of the analyzer, each in [0, 1].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BandEnergies {
    pub bass: f32,
    pub mids: f32,
    pub treble: f32,
}

impl BandEnergies {
    pub const ZERO: Self = Self {
        bass: 0.0,
        mids: 0.0,
        treble: 0.0,
    };

    /// Clamp every band into [0, 1]. NaN collapses to 0.
    pub fn clamped(self) -> Self {
        Self {
            bass: clamp_unit(self.bass),
            mids: clamp_unit(self.mids),
            treble: clamp_unit(self.treble),
        }
    }
}

/// Attack/decay-filtered band values; the only state readers ever see.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SmoothedBands {
    pub bass: f32,
    pub mids: f32,
    pub treble: f32,
}

impl SmoothedBands {
    pub const ZERO: Self = Self {
        bass: 0.0,
        mids: 0.0,
        treble: 0.0,
    };

    pub fn max_abs_diff(&self, other: &Self) -> f32 {
        (self.bass - other.bass)
            .abs()
            .max((self.mids - other.mids).abs())
            .max((self.treble - other.treble).abs())
    }
}

fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
