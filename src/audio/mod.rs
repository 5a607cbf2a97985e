//! Spectral analysis: mono windowing, FFT, band integration and smoothing.

pub mod accumulator;
pub mod analysis;
pub mod bands;
pub mod decode;
pub mod features;
pub mod smoothing;
pub mod transform;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("transform size must be a power of two, got {0}")]
    NotPowerOfTwo(usize),
    #[error("analysis window must hold {expected} samples, got {actual}")]
    WindowLength { expected: usize, actual: usize },
    #[error("smoothing coefficient must be in (0, 1], got {0}")]
    InvalidSmoothing(f32),
    #[error("sample rate must be > 0")]
    ZeroSampleRate,
    #[error("band layout needs bins up to {needed}, window of {window} only has {available}")]
    LayoutTooWide {
        needed: usize,
        window: usize,
        available: usize,
    },
}
