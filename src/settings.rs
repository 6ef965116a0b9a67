//! Game settings
//!
//! Persisted as JSON. Every field has a default so partial files load fine.

use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure to load or validate a settings file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid settings: {0}")]
    Invalid(String),
}

/// Game configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Window ===
    pub window_width: f32,
    pub window_height: f32,
    /// Host frame rate; the simulation step is its reciprocal
    pub target_fps: u32,

    // === Rules ===
    pub starting_lives: u32,
    /// Per-axis ball speed (pixels/s)
    pub ball_speed: f32,
    pub bricks_per_row: u32,
    pub brick_rows: u32,

    // === Effects ===
    /// Collisions an extra paddle survives
    pub extra_paddle_hits: u32,
    /// Ball impacts before the camera returns to normal
    pub camera_focus_hits: u32,

    /// Fixed RNG seed; `None` picks one at startup
    pub seed: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            window_width: 700.0,
            window_height: 500.0,
            target_fps: 80,

            starting_lives: 4,
            ball_speed: crate::consts::BALL_SPEED,
            bricks_per_row: 20,
            brick_rows: 5,

            extra_paddle_hits: 4,
            camera_focus_hits: 4,

            seed: None,
        }
    }
}

impl Settings {
    /// Window size as a vector
    pub fn window_dimensions(&self) -> Vec2 {
        Vec2::new(self.window_width, self.window_height)
    }

    /// Fixed simulation step in seconds
    pub fn frame_dt(&self) -> f32 {
        1.0 / self.target_fps.max(1) as f32
    }

    /// Parse and validate settings from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded settings from {}", path.as_ref().display());
        Ok(settings)
    }

    /// Load settings, falling back to defaults on any error
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path.as_ref()) {
            Ok(settings) => settings,
            Err(err) => {
                log::warn!("{err}; using default settings");
                Self::default()
            }
        }
    }

    /// Save settings as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        log::info!("Settings saved");
        Ok(())
    }

    /// Reject settings the game cannot be built from
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_width <= 0.0 || self.window_height <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "window must have positive size, got {}x{}",
                self.window_width, self.window_height
            )));
        }
        if self.starting_lives == 0 {
            return Err(ConfigError::Invalid("starting_lives must be at least 1".into()));
        }
        if self.bricks_per_row == 0 || self.brick_rows == 0 {
            return Err(ConfigError::Invalid("brick grid must not be empty".into()));
        }
        if self.target_fps == 0 {
            return Err(ConfigError::Invalid("target_fps must be at least 1".into()));
        }
        Ok(())
    }
}
