//! Configuration for trackwave
//!
//! Configuration is stored as YAML in the user's config directory.
//! Default location: ~/.config/trackwave/config.yaml

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::{VisualizerError, VisualizerResult};
use crate::render::surface::Rgba;
use crate::synth::TrackRecipe;

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Waveform colors and sizing
    pub render: RenderStyle,
    /// Frequency analysis settings
    pub analyser: AnalyserConfig,
    /// Host tick length; one frame is delivered per tick
    pub frame_interval_ms: u64,
    /// Demo catalog shown by the terminal host
    pub tracks: Vec<TrackConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            render: RenderStyle::default(),
            analyser: AnalyserConfig::default(),
            frame_interval_ms: 16,
            tracks: default_tracks(),
        }
    }
}

/// Rendering parameters of a waveform visualizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderStyle {
    /// Bar color
    pub color: Rgba,
    /// Background fill, none keeps the surface transparent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<Rgba>,
    /// Height used when the container reports none
    pub height: f64,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            color: Rgba::rgb(0x0e, 0xa5, 0xe9),
            background: None,
            height: 40.0,
        }
    }
}

impl RenderStyle {
    /// Background to paint, if any
    pub fn fill(&self) -> Option<Rgba> {
        self.background.filter(|c| !c.is_transparent())
    }
}

/// Analyser smoothing and decibel window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyserConfig {
    /// Averaging constant between frames, in [0, 1)
    pub smoothing: f32,
    /// Magnitude mapped to byte 0
    pub min_decibels: f32,
    /// Magnitude mapped to byte 255
    pub max_decibels: f32,
}

impl Default for AnalyserConfig {
    fn default() -> Self {
        Self {
            smoothing: 0.8,
            min_decibels: -100.0,
            max_decibels: -30.0,
        }
    }
}

impl AnalyserConfig {
    /// Smoothing in [0, 1) and a non-empty decibel window
    pub fn validate(&self) -> VisualizerResult<()> {
        if !(0.0..1.0).contains(&self.smoothing) {
            return Err(VisualizerError::InvalidAnalyser(format!(
                "smoothing {} must be in [0, 1)",
                self.smoothing
            )));
        }
        if self.min_decibels >= self.max_decibels {
            return Err(VisualizerError::InvalidAnalyser(format!(
                "min decibels {} must be below max decibels {}",
                self.min_decibels, self.max_decibels
            )));
        }
        Ok(())
    }
}

/// One catalog entry of the demo list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackConfig {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub duration_secs: f64,
    #[serde(default = "default_root_hz")]
    pub root_hz: f64,
    #[serde(default = "default_bpm")]
    pub bpm: f64,
}

fn default_root_hz() -> f64 {
    110.0
}

fn default_bpm() -> f64 {
    120.0
}

impl TrackConfig {
    pub fn recipe(&self) -> TrackRecipe {
        TrackRecipe {
            duration_secs: self.duration_secs,
            root_hz: self.root_hz,
            bpm: self.bpm,
        }
    }
}

fn default_tracks() -> Vec<TrackConfig> {
    let track = |id: &str, title: &str, artist: &str, duration_secs, root_hz, bpm| TrackConfig {
        id: id.to_string(),
        title: title.to_string(),
        artist: artist.to_string(),
        duration_secs,
        root_hz,
        bpm,
    };
    vec![
        track("1", "Low Tide", "Harbor Lights", 95.0, 98.0, 118.0),
        track("2", "Copper Wire", "Static Bloom", 140.0, 130.8, 128.0),
        track("3", "Night Ferry", "Harbor Lights", 200.0, 82.4, 96.0),
        track("4", "Glass Orchard", "Mira Vale", 120.0, 146.8, 140.0),
    ]
}

/// Get the default config file path
///
/// Returns: ~/.config/trackwave/config.yaml
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
        .join("trackwave")
        .join("config.yaml")
}

/// Load configuration from a YAML file
///
/// If the file doesn't exist, returns default config.
/// If the file exists but is invalid, logs a warning and returns default config.
pub fn load_config(path: &Path) -> AppConfig {
    log::info!("load_config: Loading from {:?}", path);

    if !path.exists() {
        log::info!("load_config: Config file doesn't exist, using defaults");
        return AppConfig::default();
    }

    match std::fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str::<AppConfig>(&contents) {
            Ok(mut config) => {
                if let Err(e) = config.analyser.validate() {
                    log::warn!("load_config: {}, using default analyser settings", e);
                    config.analyser = AnalyserConfig::default();
                }
                log::info!(
                    "load_config: Loaded config - {} tracks, frame interval {}ms",
                    config.tracks.len(),
                    config.frame_interval_ms
                );
                config
            }
            Err(e) => {
                log::warn!("load_config: Failed to parse config: {}, using defaults", e);
                AppConfig::default()
            }
        },
        Err(e) => {
            log::warn!(
                "load_config: Failed to read config file: {}, using defaults",
                e
            );
            AppConfig::default()
        }
    }
}

/// Save configuration to a YAML file
///
/// Creates parent directories if they don't exist.
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    log::info!("save_config: Saving to {:?}", path);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
    }

    let yaml = serde_yaml::to_string(config).context("Failed to serialize config to YAML")?;

    std::fs::write(path, yaml)
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    log::info!("save_config: Config saved successfully");
    Ok(())
}
