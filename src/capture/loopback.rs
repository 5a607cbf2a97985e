//! System output capture through cpal.
//!
//! Building an input stream on an output device gives loopback capture on
//! WASAPI. On hosts without that, the default input (e.g. a PulseAudio
//! monitor source) is used instead.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use crossbeam_channel::{Receiver, TryRecvError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::source::{LoopbackSource, LoopbackStream, Packet, StreamFormat};
use super::CaptureError;

/// Packets the platform callback may queue before new ones are dropped.
pub const DEFAULT_QUEUE_PACKETS: usize = 64;

pub struct CpalLoopback {
    device: Option<String>,
    queue_packets: usize,
}

impl CpalLoopback {
    /// `device` is a case-insensitive substring of the device name; `None`
    /// picks the default output.
    pub fn new(device: Option<String>, queue_packets: usize) -> Self {
        Self {
            device,
            queue_packets: queue_packets.max(1),
        }
    }
}

impl Default for CpalLoopback {
    fn default() -> Self {
        Self::new(None, DEFAULT_QUEUE_PACKETS)
    }
}

impl LoopbackSource for CpalLoopback {
    fn open(&self) -> Result<Box<dyn LoopbackStream>, CaptureError> {
        let host = cpal::default_host();
        let device = pick_device(&host, self.device.as_deref())?;
        let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());

        let (config, sample_format) = select_stream_config(&device)?;
        if sample_format != SampleFormat::F32 {
            return Err(CaptureError::UnsupportedSampleFormat(format!(
                "{:?}",
                sample_format
            )));
        }
        let format = StreamFormat {
            channels: config.channels,
            sample_rate: config.sample_rate.0,
        };

        let (packet_tx, packet_rx) = crossbeam_channel::bounded::<Vec<f32>>(self.queue_packets);
        let overruns = Arc::new(AtomicU64::new(0));
        let overruns_cb = Arc::clone(&overruns);

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    // Never block the platform thread; a full queue drops the packet.
                    if packet_tx.try_send(data.to_vec()).is_err() {
                        overruns_cb.fetch_add(1, Ordering::Relaxed);
                    }
                },
                |err| log::warn!("Audio stream error: {}", err),
                None,
            )
            .map_err(|e| CaptureError::Build(e.to_string()))?;

        log::info!(
            "Loopback device '{}' ({} ch @ {} Hz)",
            device_name,
            format.channels,
            format.sample_rate
        );

        Ok(Box::new(CpalStream {
            stream,
            packets: packet_rx,
            pending: None,
            format,
            overruns,
        }))
    }

    fn describe(&self) -> String {
        match &self.device {
            Some(name) => format!("loopback '{}'", name),
            None => "default loopback".to_string(),
        }
    }
}

/// Names of the output devices the default host reports.
pub fn list_output_devices() -> Result<Vec<String>, CaptureError> {
    let host = cpal::default_host();
    let devices = host
        .output_devices()
        .map_err(|e| CaptureError::Source(e.to_string()))?;
    Ok(devices
        .map(|d| d.name().unwrap_or_else(|_| "unknown".to_string()))
        .collect())
}

fn pick_device(host: &cpal::Host, wanted: Option<&str>) -> Result<cpal::Device, CaptureError> {
    let Some(wanted) = wanted else {
        return host
            .default_output_device()
            .or_else(|| host.default_input_device())
            .ok_or(CaptureError::NoDevice);
    };

    let needle = wanted.to_lowercase();
    let matches = |device: &cpal::Device| {
        device
            .name()
            .map(|name| name.to_lowercase().contains(&needle))
            .unwrap_or(false)
    };

    if let Ok(mut outputs) = host.output_devices() {
        if let Some(device) = outputs.find(|d| matches(d)) {
            return Ok(device);
        }
    }
    if let Ok(mut inputs) = host.input_devices() {
        if let Some(device) = inputs.find(|d| matches(d)) {
            return Ok(device);
        }
    }
    Err(CaptureError::DeviceNotFound(wanted.to_string()))
}

/// The output mix format is what loopback delivers; input-only devices
/// fall back to their own default.
fn select_stream_config(device: &cpal::Device) -> Result<(StreamConfig, SampleFormat), CaptureError> {
    let supported = device
        .default_output_config()
        .or_else(|_| device.default_input_config())
        .map_err(|e| CaptureError::Format(e.to_string()))?;
    let sample_format = supported.sample_format();
    Ok((supported.config(), sample_format))
}

struct CpalStream {
    // Declared first so the platform stream is torn down before the queue.
    stream: cpal::Stream,
    packets: Receiver<Vec<f32>>,
    pending: Option<Vec<f32>>,
    format: StreamFormat,
    overruns: Arc<AtomicU64>,
}

impl CpalStream {
    fn frames_in(&self, packet: &[f32]) -> usize {
        packet.len() / usize::from(self.format.channels.max(1))
    }
}

impl LoopbackStream for CpalStream {
    fn format(&self) -> StreamFormat {
        self.format
    }

    fn start(&mut self) -> Result<(), CaptureError> {
        self.stream
            .play()
            .map_err(|e| CaptureError::Start(e.to_string()))
    }

    fn available_frames(&mut self) -> Result<usize, CaptureError> {
        while self.pending.is_none() {
            match self.packets.try_recv() {
                Ok(packet) if packet.is_empty() => continue,
                Ok(packet) => self.pending = Some(packet),
                Err(TryRecvError::Empty) => return Ok(0),
                Err(TryRecvError::Disconnected) => return Err(CaptureError::Disconnected),
            }
        }
        Ok(self.pending.as_deref().map_or(0, |p| self.frames_in(p)))
    }

    fn read_frames(&mut self, buf: &mut Vec<f32>) -> Result<Packet, CaptureError> {
        if self.pending.is_none() {
            self.available_frames()?;
        }
        let packet = self
            .pending
            .take()
            .ok_or_else(|| CaptureError::Read("no packet pending".to_string()))?;
        let frames = self.frames_in(&packet);
        *buf = packet;
        Ok(Packet {
            frames,
            silent: false,
        })
    }
}

impl Drop for CpalStream {
    fn drop(&mut self) {
        if let Err(err) = self.stream.pause() {
            log::debug!("Pausing loopback stream on release failed: {}", err);
        }
        let overruns = self.overruns.load(Ordering::Relaxed);
        if overruns > 0 {
            log::warn!("Loopback queue overflowed {} time(s); packets were dropped", overruns);
        }
    }
}
