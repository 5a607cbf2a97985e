//! Replays a decoded audio file in real time as if it were system output.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use super::source::{LoopbackSource, LoopbackStream, Packet, StreamFormat};
use super::CaptureError;
use crate::audio::decode::{decode_audio, DecodedAudio};

/// 10 ms at 48 kHz, a typical shared-mode period.
pub const PACKET_FRAMES: usize = 480;

pub struct FileSource {
    audio: Arc<DecodedAudio>,
    looping: bool,
    name: String,
}

impl FileSource {
    pub fn open_path(path: &Path, looping: bool) -> Result<Self> {
        let audio = decode_audio(path)?;
        Ok(Self::from_audio(audio, looping, path.display().to_string()))
    }

    pub fn from_audio(audio: DecodedAudio, looping: bool, name: impl Into<String>) -> Self {
        Self {
            audio: Arc::new(audio),
            looping,
            name: name.into(),
        }
    }

    pub fn duration_secs(&self) -> f32 {
        self.audio.duration_secs()
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }
}

impl LoopbackSource for FileSource {
    fn open(&self) -> Result<Box<dyn LoopbackStream>, CaptureError> {
        if self.audio.channels == 0 {
            return Err(CaptureError::ZeroChannels);
        }
        let channels = u16::try_from(self.audio.channels)
            .map_err(|_| CaptureError::Source(format!("{} channels", self.audio.channels)))?;
        Ok(Box::new(FileStream {
            audio: Arc::clone(&self.audio),
            format: StreamFormat {
                channels,
                sample_rate: self.audio.sample_rate,
            },
            looping: self.looping,
            cursor: 0,
            delivered: 0,
            started: None,
        }))
    }

    fn describe(&self) -> String {
        format!("file '{}'", self.name)
    }
}

struct FileStream {
    audio: Arc<DecodedAudio>,
    format: StreamFormat,
    looping: bool,
    /// Next frame to deliver.
    cursor: usize,
    /// Frames delivered since `start`, used for pacing.
    delivered: u64,
    started: Option<Instant>,
}

impl FileStream {
    fn due_frames(&self) -> u64 {
        match self.started {
            Some(started) => {
                (started.elapsed().as_secs_f64() * self.format.sample_rate as f64) as u64
            }
            None => 0,
        }
    }
}

impl LoopbackStream for FileStream {
    fn format(&self) -> StreamFormat {
        self.format
    }

    fn start(&mut self) -> Result<(), CaptureError> {
        self.started = Some(Instant::now());
        Ok(())
    }

    fn available_frames(&mut self) -> Result<usize, CaptureError> {
        let total = self.audio.frames();
        if total == 0 {
            return Ok(0);
        }
        let backlog = self.due_frames().saturating_sub(self.delivered);
        let remaining = if self.looping {
            PACKET_FRAMES
        } else {
            total - self.cursor
        };
        Ok((backlog.min(PACKET_FRAMES as u64) as usize).min(remaining))
    }

    fn read_frames(&mut self, buf: &mut Vec<f32>) -> Result<Packet, CaptureError> {
        let frames = self.available_frames()?;
        let channels = self.audio.channels;
        let total = self.audio.frames();

        buf.clear();
        let mut left = frames;
        while left > 0 {
            let run = left.min(total - self.cursor);
            let start = self.cursor * channels;
            buf.extend_from_slice(&self.audio.samples[start..start + run * channels]);
            self.cursor += run;
            left -= run;
            if self.cursor == total && self.looping {
                self.cursor = 0;
            }
        }
        self.delivered += frames as u64;

        Ok(Packet {
            frames,
            silent: false,
        })
    }
}
