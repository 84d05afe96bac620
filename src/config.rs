use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

pub const DEFAULT_PATH: &str = "chargeview.yaml";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub input: InputConfig,
    pub display: DisplayConfig,
    pub playback: PlaybackConfig,
    pub domain: DomainConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub field: PathBuf,
    pub density: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub width: usize,
    pub height: usize,
    pub target_fps: usize,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Animation frames per second.
    pub fps: f64,
    /// Seconds to hold the first frame before playback starts.
    pub start_delay: f64,
    /// Loop back to the first frame after the last one.
    pub repeat: bool,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DomainConfig {
    pub x_min: f64,
    pub x_max: f64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            field: PathBuf::from("electric_field.txt"),
            density: PathBuf::from("data.dat"),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 960,
            height: 720,
            target_fps: 60,
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            fps: 30.0,
            start_delay: 5.0,
            repeat: true,
        }
    }
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self { x_min: 0.0, x_max: 1.0 }
    }
}

/// Load the config file at `path`. A missing file gives the defaults; an
/// unreadable or malformed one is reported and also gives the defaults.
pub fn load(path: &Path) -> Config {
    if !path.exists() {
        return Config::default();
    }
    match std::fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str(&contents) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!("failed to parse {}: {e}; using defaults", path.display());
                Config::default()
            }
        },
        Err(e) => {
            warn!("failed to read {}: {e}; using defaults", path.display());
            Config::default()
        }
    }
}
