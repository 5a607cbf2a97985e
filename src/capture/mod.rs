//! Capture thread lifecycle and the platform audio boundary.

pub mod file;
pub mod loopback;
pub mod session;
pub mod source;

pub use file::FileSource;
pub use loopback::CpalLoopback;
pub use session::{BandReader, CaptureSession, CaptureSettings, CaptureStats, SessionState};
pub use source::{LoopbackSource, LoopbackStream, Packet, StreamFormat};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no audio output device found")]
    NoDevice,
    #[error("no output device matches '{0}'")]
    DeviceNotFound(String),
    #[error("failed to query device format: {0}")]
    Format(String),
    #[error("unsupported sample format {0}, loopback capture needs f32")]
    UnsupportedSampleFormat(String),
    #[error("stream reports zero channels")]
    ZeroChannels,
    #[error("failed to build capture stream: {0}")]
    Build(String),
    #[error("failed to start capture stream: {0}")]
    Start(String),
    #[error("read failed: {0}")]
    Read(String),
    #[error("capture stream disconnected")]
    Disconnected,
    #[error("failed to spawn capture thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error(transparent)]
    Analysis(#[from] crate::audio::AnalysisError),
    #[error("{0}")]
    Source(String),
}
