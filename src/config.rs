use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::audio::analysis::AnalysisSettings;
use crate::capture::CaptureSettings;

#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisSettings,
    #[serde(default)]
    pub capture: CaptureSettings,
    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct DisplayConfig {
    #[serde(default = "default_fps")]
    pub fps: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { fps: default_fps() }
    }
}

fn default_fps() -> u32 { 30 }

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(err) => {
            log::debug!("{}: {}", path.display(), err);
            None
        }
    }
}

/// `explicit` if given, else `./bandtap.toml`, else the per-user config file.
pub fn discover_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from("bandtap.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("bandtap").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}
