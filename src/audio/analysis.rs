use rustfft::num_complex::Complex;
use serde::Deserialize;
use std::ops::Range;

use super::accumulator::FrameAccumulator;
use super::bands::{BandLayout, BandMapping, REFERENCE_WINDOW};
use super::features::{BandEnergies, SmoothedBands};
use super::smoothing::{Smoother, SMOOTHING};
use super::transform::fft_in_place;
use super::AnalysisError;

/// Tunables for the analysis chain, read from the `[analysis]` config table.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisSettings {
    pub window_size: usize,
    pub smoothing: f32,
    pub band_mapping: BandMapping,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            window_size: REFERENCE_WINDOW,
            smoothing: SMOOTHING,
            band_mapping: BandMapping::default(),
        }
    }
}

impl AnalysisSettings {
    /// Check everything that doesn't depend on the negotiated stream format.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.window_size < 2 || !self.window_size.is_power_of_two() {
            return Err(AnalysisError::NotPowerOfTwo(self.window_size));
        }
        Smoother::new(self.smoothing)?;
        if self.band_mapping == BandMapping::Fixed {
            // Sample rate is irrelevant for the fixed layout.
            BandLayout::new(BandMapping::Fixed, 1, self.window_size)?;
        }
        Ok(())
    }
}

/// Integrates FFT magnitudes over the three band ranges of one window.
pub struct BandAnalyzer {
    layout: BandLayout,
    /// Reused across windows
    spectrum: Vec<Complex<f64>>,
}

impl BandAnalyzer {
    pub fn new(layout: BandLayout) -> Self {
        let spectrum = vec![Complex::new(0.0, 0.0); layout.window_size()];
        Self { layout, spectrum }
    }

    pub fn layout(&self) -> &BandLayout {
        &self.layout
    }

    /// Analyze one complete window. Only the lower half of the spectrum is
    /// read since a real input's transform is conjugate-symmetric.
    pub fn analyze(&mut self, window: &[f32]) -> Result<BandEnergies, AnalysisError> {
        let n = self.layout.window_size();
        if window.len() != n {
            return Err(AnalysisError::WindowLength {
                expected: n,
                actual: window.len(),
            });
        }

        for (slot, &sample) in self.spectrum.iter_mut().zip(window) {
            *slot = Complex::new(sample as f64, 0.0);
        }
        fft_in_place(&mut self.spectrum)?;

        let half = &self.spectrum[..n / 2];
        let magnitude = |bins: &Range<usize>| -> f64 {
            half[bins.clone()].iter().map(|c| c.norm()).sum()
        };

        let raw = BandEnergies {
            bass: (magnitude(&self.layout.bass) / self.layout.bass_norm as f64) as f32,
            mids: (magnitude(&self.layout.mids) / self.layout.mids_norm as f64) as f32,
            treble: (magnitude(&self.layout.treble) / self.layout.treble_norm as f64) as f32,
        };
        Ok(raw.clamped())
    }
}

/// Accumulator, analyzer and smoother wired together for one stream format.
pub struct BandPipeline {
    channels: usize,
    accumulator: FrameAccumulator,
    analyzer: BandAnalyzer,
    smoother: Smoother,
}

impl BandPipeline {
    /// `seed` is the last published state, so restarts continue to decay
    /// from where the previous session left off.
    pub fn new(
        settings: &AnalysisSettings,
        channels: usize,
        sample_rate: u32,
        seed: SmoothedBands,
    ) -> Result<Self, AnalysisError> {
        let layout = BandLayout::new(settings.band_mapping, sample_rate, settings.window_size)?;
        log::debug!(
            "Band layout @ {}Hz/{}: bass {:?}, mids {:?}, treble {:?} ({:.2} Hz/bin)",
            sample_rate,
            settings.window_size,
            layout.bass,
            layout.mids,
            layout.treble,
            layout.bin_width_hz(sample_rate)
        );
        Ok(Self {
            channels,
            accumulator: FrameAccumulator::new(settings.window_size)?,
            analyzer: BandAnalyzer::new(layout),
            smoother: Smoother::with_state(settings.smoothing, seed)?,
        })
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn layout(&self) -> &BandLayout {
        self.analyzer.layout()
    }

    pub fn smoothed(&self) -> SmoothedBands {
        self.smoother.state()
    }

    /// Feed interleaved samples; `publish` runs once per completed window.
    /// Returns the number of windows analyzed.
    pub fn push_samples<F>(&mut self, interleaved: &[f32], mut publish: F) -> usize
    where
        F: FnMut(SmoothedBands),
    {
        let Self {
            channels,
            accumulator,
            analyzer,
            smoother,
        } = self;
        accumulator.push(interleaved, *channels, |window| {
            analyze_window(analyzer, smoother, window, &mut publish)
        })
    }

    /// Feed `frames` frames of silence.
    pub fn push_silence<F>(&mut self, frames: usize, mut publish: F) -> usize
    where
        F: FnMut(SmoothedBands),
    {
        let Self {
            accumulator,
            analyzer,
            smoother,
            ..
        } = self;
        accumulator.push_silence(frames, |window| {
            analyze_window(analyzer, smoother, window, &mut publish)
        })
    }
}

fn analyze_window<F>(
    analyzer: &mut BandAnalyzer,
    smoother: &mut Smoother,
    window: &[f32],
    publish: &mut F,
) where
    F: FnMut(SmoothedBands),
{
    match analyzer.analyze(window) {
        Ok(raw) => publish(smoother.apply(raw)),
        Err(err) => log::warn!("Dropping analysis window: {}", err),
    }
}
