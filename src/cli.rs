use bandtap::BandMapping;
use clap::Parser;
use std::path::PathBuf;

/// Flags left unset fall back to the config file, then to built-in defaults.
#[derive(Parser, Debug)]
#[command(name = "bandtap", about = "Live bass/mids/treble meters for system audio output")]
pub struct Cli {
    /// Config file (default: ./bandtap.toml, then the user config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Replay an audio file (WAV, MP3, FLAC, OGG) instead of capturing output
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Loop the file given with --file
    #[arg(long = "loop", requires = "file")]
    pub looping: bool,

    /// Stop after this many seconds (default: until the file ends, or forever)
    #[arg(short, long)]
    pub seconds: Option<f64>,

    /// Analysis window in samples (power of two)
    #[arg(short, long)]
    pub window: Option<usize>,

    /// Decay coefficient (0.0-1.0]
    #[arg(long)]
    pub smoothing: Option<f32>,

    /// How FFT bins are assigned to bands
    #[arg(long, value_enum)]
    pub band_mapping: Option<BandMapping>,

    /// Meter refresh rate
    #[arg(long)]
    pub fps: Option<u32>,

    /// Output device to capture (case-insensitive substring)
    #[arg(short, long)]
    pub device: Option<String>,

    /// List output devices and exit
    #[arg(long)]
    pub list_devices: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_flags_overrides_nothing() {
        let cli = Cli::try_parse_from(["bandtap"]).unwrap();
        assert!(cli.config.is_none());
        assert!(cli.window.is_none());
        assert!(cli.band_mapping.is_none());
        assert!(!cli.looping);
        assert!(!cli.list_devices);
    }

    #[test]
    fn parses_overrides() {
        let cli = Cli::try_parse_from([
            "bandtap",
            "--file",
            "song.flac",
            "--loop",
            "--window",
            "2048",
            "--band-mapping",
            "fixed",
            "--seconds",
            "2.5",
        ])
        .unwrap();
        assert_eq!(cli.file, Some(PathBuf::from("song.flac")));
        assert!(cli.looping);
        assert_eq!(cli.window, Some(2048));
        assert_eq!(cli.band_mapping, Some(BandMapping::Fixed));
        assert_eq!(cli.seconds, Some(2.5));
    }

    #[test]
    fn loop_requires_file() {
        assert!(Cli::try_parse_from(["bandtap", "--loop"]).is_err());
    }
}
