//! Contract between the capture thread and a platform audio source.
//!
//! A [`LoopbackSource`] is shared with the session and asked for a fresh
//! [`LoopbackStream`] each time the capture thread starts. The stream is
//! opened, polled and dropped on that thread only, so implementations may
//! hold handles that are not `Send`. Dropping the stream releases every
//! handle it acquired.

use super::CaptureError;

/// Negotiated layout of the interleaved f32 frames a stream delivers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamFormat {
    pub channels: u16,
    pub sample_rate: u32,
}

/// One buffer pulled from the stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Packet {
    pub frames: usize,
    /// Contents must be treated as silence regardless of the sample values.
    pub silent: bool,
}

pub trait LoopbackSource: Send + Sync + 'static {
    /// Acquire the endpoint and negotiate a format. Nothing is delivered
    /// until [`LoopbackStream::start`].
    fn open(&self) -> Result<Box<dyn LoopbackStream>, CaptureError>;

    /// Human-readable name for logs.
    fn describe(&self) -> String;
}

pub trait LoopbackStream {
    fn format(&self) -> StreamFormat;

    fn start(&mut self) -> Result<(), CaptureError>;

    /// Frames in the next pending packet, 0 when nothing is waiting.
    fn available_frames(&mut self) -> Result<usize, CaptureError>;

    /// Replace `buf` with the next packet's interleaved samples.
    fn read_frames(&mut self, buf: &mut Vec<f32>) -> Result<Packet, CaptureError>;
}
