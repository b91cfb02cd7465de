//! Application configuration, loaded from `~/.config/pagereel/config.toml`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub recording: RecordingConfig,
    #[serde(default)]
    pub preview: PreviewConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log filter, e.g. "info" or "pagereel=debug".
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Directory where recordings and reports land.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

/// Knobs for one recording run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingConfig {
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
    #[serde(default = "default_fps")]
    pub fps: u32,
    /// Fraction of changed pixels below which two frames count as identical.
    #[serde(default = "default_animation_threshold")]
    pub animation_threshold: f64,
    /// Seconds to wait for animations to settle at each waypoint.
    #[serde(default = "default_animation_timeout")]
    pub animation_timeout: f64,
    #[serde(default = "default_min_section_height")]
    pub min_section_height: f64,
    #[serde(default = "default_true")]
    pub include_return_to_top: bool,
    /// Multiplier applied to every waypoint's dwell time.
    #[serde(default = "default_multiplier")]
    pub pause_multiplier: f64,
    /// Multiplier applied to every waypoint's scroll duration.
    #[serde(default = "default_multiplier")]
    pub scroll_duration_multiplier: f64,
    /// Re-check framing after arriving at each waypoint.
    #[serde(default = "default_true")]
    pub verify_framing: bool,
    #[serde(default = "default_max_framing_retries")]
    pub max_framing_retries: u32,
    /// Milliseconds to let layout settle after each scroll animation.
    #[serde(default = "default_scroll_settle_ms")]
    pub scroll_settle_ms: u64,
}

/// Knobs for the interactive preview pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewConfig {
    /// Fast scroll between waypoints, in seconds.
    #[serde(default = "default_preview_scroll_duration")]
    pub scroll_duration: f64,
    /// Short dwell at each waypoint, in seconds.
    #[serde(default = "default_preview_pause")]
    pub pause_duration: f64,
    #[serde(default = "default_true")]
    pub capture_screenshots: bool,
    #[serde(default = "default_screenshot_dir")]
    pub screenshot_dir: PathBuf,
    /// Fine position adjustment step, in pixels.
    #[serde(default = "default_adjustment_step")]
    pub adjustment_step: f64,
    /// Coarse position adjustment step, in pixels.
    #[serde(default = "default_large_adjustment_step")]
    pub large_adjustment_step: f64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            output_dir: default_output_dir(),
        }
    }
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            output_path: default_output_path(),
            fps: default_fps(),
            animation_threshold: default_animation_threshold(),
            animation_timeout: default_animation_timeout(),
            min_section_height: default_min_section_height(),
            include_return_to_top: true,
            pause_multiplier: default_multiplier(),
            scroll_duration_multiplier: default_multiplier(),
            verify_framing: true,
            max_framing_retries: default_max_framing_retries(),
            scroll_settle_ms: default_scroll_settle_ms(),
        }
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            scroll_duration: default_preview_scroll_duration(),
            pause_duration: default_preview_pause(),
            capture_screenshots: true,
            screenshot_dir: default_screenshot_dir(),
            adjustment_step: default_adjustment_step(),
            large_adjustment_step: default_large_adjustment_step(),
        }
    }
}

impl AppConfig {
    /// Load from the default path, falling back to defaults when the file
    /// does not exist.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)?;
        toml::from_str(&content).map_err(|e| Error::Config(format!("invalid config: {e}")))
    }

    /// Write the config to the default path, creating directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("serialize config: {e}")))?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let base = dirs::config_dir()
            .ok_or_else(|| Error::Config("cannot determine config directory".to_string()))?;
        Ok(base.join("pagereel").join("config.toml"))
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("recordings")
}

fn default_output_path() -> PathBuf {
    PathBuf::from("demo.mp4")
}

fn default_fps() -> u32 {
    30
}

fn default_animation_threshold() -> f64 {
    0.03
}

fn default_animation_timeout() -> f64 {
    5.0
}

fn default_min_section_height() -> f64 {
    200.0
}

fn default_true() -> bool {
    true
}

fn default_multiplier() -> f64 {
    1.0
}

fn default_max_framing_retries() -> u32 {
    3
}

fn default_scroll_settle_ms() -> u64 {
    100
}

fn default_preview_scroll_duration() -> f64 {
    0.5
}

fn default_preview_pause() -> f64 {
    1.0
}

fn default_screenshot_dir() -> PathBuf {
    PathBuf::from("preview_screenshots")
}

fn default_adjustment_step() -> f64 {
    10.0
}

fn default_large_adjustment_step() -> f64 {
    50.0
}
