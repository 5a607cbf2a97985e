//! Mapping of FFT bins onto the bass / mids / treble bands.
//!
//! The canonical layout was tuned for a 1024-sample window at 48 kHz
//! (46.875 Hz per bin): bass is bins 1..=5, mids 6..=40, treble 41..=249,
//! normalized by 100, 200 and 300. [`BandMapping::Scaled`] keeps the same
//! crossover frequencies for any window size and sample rate.

use clap::ValueEnum;
use serde::Deserialize;
use std::ops::Range;

use super::AnalysisError;

pub const REFERENCE_WINDOW: usize = 1024;
pub const REFERENCE_SAMPLE_RATE: u32 = 48_000;

/// Upper (exclusive) edges of each band at the reference format.
pub const BASS_CEILING_HZ: f64 = 281.25;
pub const MIDS_CEILING_HZ: f64 = 1921.875;
pub const TREBLE_CEILING_HZ: f64 = 11718.75;

/// Empirical divisors mapping typical program material near [0, 1].
pub const BASS_NORM: f32 = 100.0;
pub const MIDS_NORM: f32 = 200.0;
pub const TREBLE_NORM: f32 = 300.0;

const FIXED_BASS: Range<usize> = 1..6;
const FIXED_MIDS: Range<usize> = 6..41;
const FIXED_TREBLE: Range<usize> = 41..250;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BandMapping {
    /// Literal bin numbers and divisors, whatever the stream format.
    Fixed,
    /// Crossovers kept in Hz; divisors follow the window size.
    #[default]
    Scaled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Band {
    Bass,
    Mids,
    Treble,
}

/// Half-open bin ranges per band plus their normalization divisors.
#[derive(Clone, Debug, PartialEq)]
pub struct BandLayout {
    window_size: usize,
    pub bass: Range<usize>,
    pub mids: Range<usize>,
    pub treble: Range<usize>,
    pub bass_norm: f32,
    pub mids_norm: f32,
    pub treble_norm: f32,
}

impl BandLayout {
    pub fn new(
        mapping: BandMapping,
        sample_rate: u32,
        window_size: usize,
    ) -> Result<Self, AnalysisError> {
        if window_size < 2 || !window_size.is_power_of_two() {
            return Err(AnalysisError::NotPowerOfTwo(window_size));
        }
        if sample_rate == 0 {
            return Err(AnalysisError::ZeroSampleRate);
        }
        match mapping {
            BandMapping::Fixed => Self::fixed(window_size),
            BandMapping::Scaled => Ok(Self::scaled(sample_rate, window_size)),
        }
    }

    fn fixed(window_size: usize) -> Result<Self, AnalysisError> {
        let available = window_size / 2;
        if FIXED_TREBLE.end > available {
            return Err(AnalysisError::LayoutTooWide {
                needed: FIXED_TREBLE.end,
                window: window_size,
                available,
            });
        }
        Ok(Self {
            window_size,
            bass: FIXED_BASS,
            mids: FIXED_MIDS,
            treble: FIXED_TREBLE,
            bass_norm: BASS_NORM,
            mids_norm: MIDS_NORM,
            treble_norm: TREBLE_NORM,
        })
    }

    fn scaled(sample_rate: u32, window_size: usize) -> Self {
        let half = window_size / 2;
        let edge = |hz: f64| -> usize {
            let bin = (hz * window_size as f64 / sample_rate as f64).round() as usize;
            bin.clamp(1, half)
        };
        let bass_end = edge(BASS_CEILING_HZ);
        let mids_end = edge(MIDS_CEILING_HZ).max(bass_end);
        let treble_end = edge(TREBLE_CEILING_HZ).max(mids_end);

        // A full-scale sinusoid's bin magnitude grows linearly with N.
        let scale = window_size as f32 / REFERENCE_WINDOW as f32;
        Self {
            window_size,
            bass: 1..bass_end,
            mids: bass_end..mids_end,
            treble: mids_end..treble_end,
            bass_norm: BASS_NORM * scale,
            mids_norm: MIDS_NORM * scale,
            treble_norm: TREBLE_NORM * scale,
        }
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Which band, if any, integrates `bin`.
    pub fn band_of(&self, bin: usize) -> Option<Band> {
        if self.bass.contains(&bin) {
            Some(Band::Bass)
        } else if self.mids.contains(&bin) {
            Some(Band::Mids)
        } else if self.treble.contains(&bin) {
            Some(Band::Treble)
        } else {
            None
        }
    }

    pub fn bin_width_hz(&self, sample_rate: u32) -> f64 {
        sample_rate as f64 / self.window_size as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaled_matches_fixed_at_reference_format() {
        let scaled =
            BandLayout::new(BandMapping::Scaled, REFERENCE_SAMPLE_RATE, REFERENCE_WINDOW).unwrap();
        let fixed = BandLayout::new(BandMapping::Fixed, 44_100, REFERENCE_WINDOW).unwrap();
        assert_eq!(scaled, fixed);
    }

    #[test]
    fn scaled_follows_sample_rate() {
        let layout = BandLayout::new(BandMapping::Scaled, 44_100, 1024).unwrap();
        // 281.25 Hz at 43.07 Hz/bin rounds to bin 7
        assert_eq!(layout.bass, 1..7);
        assert_eq!(layout.mids, 7..45);
        assert_eq!(layout.treble, 45..272);
    }

    #[test]
    fn scaled_divisors_follow_window() {
        let layout = BandLayout::new(BandMapping::Scaled, 48_000, 2048).unwrap();
        assert_eq!(layout.bass_norm, 200.0);
        assert_eq!(layout.treble, 82..500);
    }

    #[test]
    fn fixed_ignores_sample_rate() {
        let layout = BandLayout::new(BandMapping::Fixed, 96_000, 4096).unwrap();
        assert_eq!(layout.bass, 1..6);
        assert_eq!(layout.mids, 6..41);
        assert_eq!(layout.treble, 41..250);
        assert_eq!(layout.treble_norm, 300.0);
    }

    #[test]
    fn fixed_rejects_small_windows() {
        let err = BandLayout::new(BandMapping::Fixed, 48_000, 256).unwrap_err();
        assert!(matches!(err, AnalysisError::LayoutTooWide { needed: 250, .. }));
    }

    #[test]
    fn rejects_bad_formats() {
        assert_eq!(
            BandLayout::new(BandMapping::Scaled, 48_000, 1000),
            Err(AnalysisError::NotPowerOfTwo(1000))
        );
        assert_eq!(
            BandLayout::new(BandMapping::Scaled, 0, 1024),
            Err(AnalysisError::ZeroSampleRate)
        );
    }

    #[test]
    fn bands_are_disjoint_and_skip_dc() {
        for (mapping, rate, window) in [
            (BandMapping::Fixed, 48_000, 1024),
            (BandMapping::Scaled, 44_100, 1024),
            (BandMapping::Scaled, 48_000, 64),
            (BandMapping::Scaled, 8_000, 512),
            (BandMapping::Scaled, 192_000, 8),
        ] {
            let layout = BandLayout::new(mapping, rate, window).unwrap();
            assert_eq!(layout.band_of(0), None);
            assert_eq!(layout.bass.end, layout.mids.start);
            assert_eq!(layout.mids.end, layout.treble.start);
            assert!(layout.treble.end <= window / 2);

            for bin in 1..window / 2 {
                let hits = [&layout.bass, &layout.mids, &layout.treble]
                    .iter()
                    .filter(|r| r.contains(&bin))
                    .count();
                let expected = usize::from(bin < layout.treble.end);
                assert_eq!(hits, expected, "bin {bin} of {mapping:?} {rate}/{window}");
            }
        }
    }

    #[test]
    fn bin_width_at_reference() {
        let layout = BandLayout::new(BandMapping::Fixed, 48_000, 1024).unwrap();
        assert!((layout.bin_width_hz(48_000) - 46.875).abs() < 1e-9);
    }
}
