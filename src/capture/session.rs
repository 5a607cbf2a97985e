//! Background capture thread and the band values it publishes.
//!
//! One thread per running session pulls packets from a [`LoopbackSource`],
//! feeds them through a [`BandPipeline`] and publishes the smoothed bands
//! after every analysis window. Readers only ever copy three floats out
//! from under a short lock.
//!
//! Lifecycle: `Idle -> Starting -> Running -> Stopping -> Idle`. Failing to
//! open or start the stream goes straight back to `Idle`; the published
//! values then simply stop changing.

use parking_lot::Mutex;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::loopback::DEFAULT_QUEUE_PACKETS;
use super::source::{LoopbackSource, LoopbackStream};
use super::CaptureError;
use crate::audio::analysis::{AnalysisSettings, BandPipeline};
use crate::audio::features::SmoothedBands;

/// Tunables for the capture loop, read from the `[capture]` config table.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct CaptureSettings {
    /// Idle sleep between polls once the stream is drained.
    pub poll_interval_ms: u64,
    /// Depth of the platform callback queue.
    pub queue_packets: usize,
    /// Substring of the device to capture from.
    pub device: Option<String>,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1,
            queue_packets: DEFAULT_QUEUE_PACKETS,
            device: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Starting,
    Running,
    Stopping,
}

/// Counters accumulated over the lifetime of a session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CaptureStats {
    /// Capture threads spawned.
    pub threads_spawned: u64,
    pub packets: u64,
    pub silent_packets: u64,
    /// Packets dropped because the stream reported zero channels.
    pub skipped_packets: u64,
    pub read_failures: u64,
    pub windows: u64,
}

#[derive(Default)]
struct Counters {
    threads_spawned: AtomicU64,
    packets: AtomicU64,
    silent_packets: AtomicU64,
    skipped_packets: AtomicU64,
    read_failures: AtomicU64,
    windows: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> CaptureStats {
        CaptureStats {
            threads_spawned: self.threads_spawned.load(Ordering::Relaxed),
            packets: self.packets.load(Ordering::Relaxed),
            silent_packets: self.silent_packets.load(Ordering::Relaxed),
            skipped_packets: self.skipped_packets.load(Ordering::Relaxed),
            read_failures: self.read_failures.load(Ordering::Relaxed),
            windows: self.windows.load(Ordering::Relaxed),
        }
    }
}

struct Shared {
    bands: Mutex<SmoothedBands>,
    state: Mutex<SessionState>,
    running: AtomicBool,
    counters: Counters,
}

impl Shared {
    fn new() -> Self {
        Self {
            bands: Mutex::new(SmoothedBands::ZERO),
            state: Mutex::new(SessionState::Idle),
            running: AtomicBool::new(false),
            counters: Counters::default(),
        }
    }

    fn bands(&self) -> SmoothedBands {
        *self.bands.lock()
    }

    fn publish(&self, bands: SmoothedBands) {
        *self.bands.lock() = bands;
    }

    fn state(&self) -> SessionState {
        *self.state.lock()
    }

    fn set_state(&self, state: SessionState) {
        *self.state.lock() = state;
    }
}

/// Cheap, cloneable read access to the published bands from any thread.
#[derive(Clone)]
pub struct BandReader {
    shared: Arc<Shared>,
}

impl BandReader {
    pub fn snapshot(&self) -> SmoothedBands {
        self.shared.bands()
    }

    pub fn bass(&self) -> f32 {
        self.shared.bands.lock().bass
    }

    pub fn mids(&self) -> f32 {
        self.shared.bands.lock().mids
    }

    pub fn treble(&self) -> f32 {
        self.shared.bands.lock().treble
    }
}

pub struct CaptureSession {
    source: Arc<dyn LoopbackSource>,
    analysis: AnalysisSettings,
    poll_interval: Duration,
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl CaptureSession {
    pub fn new(
        source: Arc<dyn LoopbackSource>,
        analysis: AnalysisSettings,
        capture: &CaptureSettings,
    ) -> Result<Self, CaptureError> {
        analysis.validate()?;
        Ok(Self {
            source,
            analysis,
            poll_interval: Duration::from_millis(capture.poll_interval_ms),
            shared: Arc::new(Shared::new()),
            worker: None,
        })
    }

    /// Spawn the capture thread. A no-op while a thread is already running.
    ///
    /// Only a failure to spawn the thread is reported here; stream
    /// acquisition happens on the new thread and failures there are logged
    /// and leave the session idle.
    pub fn start(&mut self) -> Result<(), CaptureError> {
        if self.shared.running.load(Ordering::Acquire) {
            log::debug!("start() ignored: capture already running");
            return Ok(());
        }
        // Reap a thread that gave up on its own before spawning a new one.
        self.join_worker();

        self.shared.running.store(true, Ordering::Release);
        self.shared.set_state(SessionState::Starting);

        let source = Arc::clone(&self.source);
        let shared = Arc::clone(&self.shared);
        let analysis = self.analysis.clone();
        let poll_interval = self.poll_interval;

        let spawned = thread::Builder::new()
            .name("bandtap-capture".to_string())
            .spawn(move || capture_thread(source.as_ref(), &analysis, poll_interval, &shared));

        match spawned {
            Ok(handle) => {
                self.worker = Some(handle);
                Ok(())
            }
            Err(err) => {
                self.shared.running.store(false, Ordering::Release);
                self.shared.set_state(SessionState::Idle);
                Err(CaptureError::Spawn(err))
            }
        }
    }

    /// Signal the capture thread and wait for it to release the stream.
    /// Nothing is published after this returns. Safe to call repeatedly or
    /// without a prior `start()`.
    pub fn stop(&mut self) {
        self.shared.running.store(false, Ordering::Release);
        if self.worker.is_none() {
            log::debug!("stop() ignored: no capture thread");
            return;
        }
        self.join_worker();
        let stats = self.shared.counters.snapshot();
        log::info!(
            "Capture stopped: {} packets, {} windows, {} read failures",
            stats.packets,
            stats.windows,
            stats.read_failures
        );
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    pub fn stats(&self) -> CaptureStats {
        self.shared.counters.snapshot()
    }

    pub fn reader(&self) -> BandReader {
        BandReader {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn bands(&self) -> SmoothedBands {
        self.shared.bands()
    }

    pub fn bass(&self) -> f32 {
        self.shared.bands.lock().bass
    }

    pub fn mids(&self) -> f32 {
        self.shared.bands.lock().mids
    }

    pub fn treble(&self) -> f32 {
        self.shared.bands.lock().treble
    }

    fn join_worker(&mut self) {
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                log::error!("Capture thread panicked");
                self.shared.running.store(false, Ordering::Release);
                self.shared.set_state(SessionState::Idle);
            }
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.stop();
    }
}

fn capture_thread(
    source: &dyn LoopbackSource,
    analysis: &AnalysisSettings,
    poll_interval: Duration,
    shared: &Shared,
) {
    shared.counters.threads_spawned.fetch_add(1, Ordering::Relaxed);

    if let Err(err) = run_capture(source, analysis, poll_interval, shared) {
        log::error!("Capture from {} unavailable: {}", source.describe(), err);
    }

    shared.running.store(false, Ordering::Release);
    shared.set_state(SessionState::Idle);
}

fn run_capture(
    source: &dyn LoopbackSource,
    analysis: &AnalysisSettings,
    poll_interval: Duration,
    shared: &Shared,
) -> Result<(), CaptureError> {
    shared.set_state(SessionState::Starting);

    // Dropping `stream` on any early return releases whatever was acquired.
    let mut stream = source.open()?;
    let format = stream.format();
    let mut pipeline = BandPipeline::new(
        analysis,
        usize::from(format.channels),
        format.sample_rate,
        shared.bands(),
    )?;
    stream.start()?;

    if format.channels == 0 {
        log::warn!("{} reports zero channels; packets will be skipped", source.describe());
    }
    log::info!(
        "Capturing from {} ({} ch @ {} Hz, window {})",
        source.describe(),
        format.channels,
        format.sample_rate,
        analysis.window_size
    );
    shared.set_state(SessionState::Running);

    let mut buf = Vec::new();
    while shared.running.load(Ordering::Acquire) {
        drain_stream(stream.as_mut(), &mut pipeline, &mut buf, shared);
        thread::sleep(poll_interval);
    }

    shared.set_state(SessionState::Stopping);
    drop(stream);
    Ok(())
}

/// Pull packets until the stream reports none pending. A failed poll or
/// read drops the current packet and waits for the next poll.
fn drain_stream(
    stream: &mut dyn LoopbackStream,
    pipeline: &mut BandPipeline,
    buf: &mut Vec<f32>,
    shared: &Shared,
) {
    loop {
        match stream.available_frames() {
            Ok(0) => return,
            Ok(_) => {}
            Err(err) => {
                note_read_failure(shared, &err);
                return;
            }
        }

        let packet = match stream.read_frames(buf) {
            Ok(packet) => packet,
            Err(err) => {
                note_read_failure(shared, &err);
                return;
            }
        };
        shared.counters.packets.fetch_add(1, Ordering::Relaxed);

        let publish = |bands| shared.publish(bands);
        let windows = if packet.silent {
            shared.counters.silent_packets.fetch_add(1, Ordering::Relaxed);
            pipeline.push_silence(packet.frames, publish)
        } else if pipeline.channels() == 0 {
            shared.counters.skipped_packets.fetch_add(1, Ordering::Relaxed);
            continue;
        } else {
            let len = (packet.frames * pipeline.channels()).min(buf.len());
            pipeline.push_samples(&buf[..len], publish)
        };
        shared
            .counters
            .windows
            .fetch_add(windows as u64, Ordering::Relaxed);
    }
}

fn note_read_failure(shared: &Shared, err: &CaptureError) {
    let previous = shared.counters.read_failures.fetch_add(1, Ordering::Relaxed);
    if previous == 0 {
        log::warn!("Capture read failed, skipping packet: {}", err);
    } else {
        log::debug!("Capture read failed, skipping packet: {}", err);
    }
}
