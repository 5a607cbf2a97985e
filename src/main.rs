mod cli;
mod meter;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bandtap::capture::loopback::list_output_devices;
use bandtap::config::{self, Config};
use bandtap::{CaptureSession, CpalLoopback, FileSource, LoopbackSource};
use cli::Cli;
use meter::BandMeters;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    if cli.list_devices {
        let devices = list_output_devices().context("Failed to enumerate output devices")?;
        println!("Output devices:");
        for name in &devices {
            println!("  {}", name);
        }
        return Ok(());
    }

    let mut cfg = Config::default();
    if let Some(path) = config::discover_config_path(cli.config.as_deref()) {
        if let Some(loaded) = config::load_config(&path) {
            log::info!("Loaded config from {}", path.display());
            cfg = loaded;
        } else {
            log::warn!("Failed to load config from {}, using defaults", path.display());
        }
    }
    apply_overrides(&mut cfg, &cli);
    cfg.analysis
        .validate()
        .context("Invalid analysis settings")?;

    // A non-looping file ends the run on its own.
    let mut run_for = cli
        .seconds
        .map(Duration::try_from_secs_f64)
        .transpose()
        .context("--seconds must be a non-negative number")?;
    let source: Arc<dyn LoopbackSource> = match &cli.file {
        Some(path) => {
            let file = FileSource::open_path(path, cli.looping)?;
            if run_for.is_none() && !file.is_looping() {
                run_for = Some(Duration::from_secs_f32(file.duration_secs()));
            }
            Arc::new(file)
        }
        None => Arc::new(CpalLoopback::new(
            cfg.capture.device.clone(),
            cfg.capture.queue_packets,
        )),
    };

    log::info!("bandtap - live band levels");
    log::info!("Source: {}", source.describe());
    log::info!(
        "Window: {} samples, smoothing {}, {:?} mapping, {} fps",
        cfg.analysis.window_size,
        cfg.analysis.smoothing,
        cfg.analysis.band_mapping,
        cfg.display.fps
    );

    let mut session = CaptureSession::new(source, cfg.analysis.clone(), &cfg.capture)?;
    session.start().context("Failed to start capture")?;

    let meters = BandMeters::new()?;
    let frame = Duration::from_secs_f64(1.0 / f64::from(cfg.display.fps.max(1)));
    let started = Instant::now();
    loop {
        meters.update(session.bands());
        if run_for.is_some_and(|limit| started.elapsed() >= limit) {
            break;
        }
        if !session.is_running() {
            log::warn!("Capture ended, see errors above");
            break;
        }
        std::thread::sleep(frame);
    }

    session.stop();
    meters.finish();

    let stats = session.stats();
    log::info!(
        "Done: {} packets ({} silent, {} skipped), {} windows, {} read failures",
        stats.packets,
        stats.silent_packets,
        stats.skipped_packets,
        stats.windows,
        stats.read_failures
    );
    Ok(())
}

/// Flags the user passed take precedence over the config file.
fn apply_overrides(cfg: &mut Config, cli: &Cli) {
    if let Some(window) = cli.window {
        cfg.analysis.window_size = window;
    }
    if let Some(smoothing) = cli.smoothing {
        cfg.analysis.smoothing = smoothing;
    }
    if let Some(mapping) = cli.band_mapping {
        cfg.analysis.band_mapping = mapping;
    }
    if let Some(fps) = cli.fps {
        cfg.display.fps = fps;
    }
    if cli.device.is_some() {
        cfg.capture.device = cli.device.clone();
    }
}
