//! Live bass/mids/treble levels of whatever the system is playing.
//!
//! A [`CaptureSession`] runs one background thread that pulls audio from a
//! [`LoopbackSource`], analyzes it in fixed windows and publishes three
//! smoothed values in [0, 1] that any thread may read at any time.

pub mod audio;
pub mod capture;
pub mod config;

pub use audio::analysis::AnalysisSettings;
pub use audio::bands::BandMapping;
pub use audio::features::SmoothedBands;
pub use capture::{
    BandReader, CaptureError, CaptureSession, CaptureSettings, CaptureStats, CpalLoopback,
    FileSource, LoopbackSource, SessionState,
};
