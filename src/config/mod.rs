//! Configuration management for wlcheck
//!
//! This module handles loading, parsing, and validating configuration
//! from TOML files. Every section is optional; missing sections fall back
//! to the defaults the client would use without any file at all.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::renderer::Canvas;

/// Main configuration struct containing all client settings
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ClientConfig {
    /// Toplevel window settings
    #[serde(default)]
    pub window: WindowConfig,

    /// Frame-callback driven animation
    #[serde(default)]
    pub animation: AnimationConfig,

    /// General client settings
    #[serde(default)]
    pub general: GeneralConfig,
}

/// Toplevel window configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    /// Title set on the xdg_toplevel
    pub title: String,

    /// Buffer width (pixels)
    pub width: u32,

    /// Buffer height (pixels)
    pub height: u32,
}

/// Animation configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnimationConfig {
    /// Re-render on every frame callback instead of only on configure
    pub enabled: bool,

    /// Scroll speed of the checkerboard (pixels per second)
    pub speed: f32,
}

/// General client settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log a frame notice every N presented frames (0 disables)
    pub frame_log_interval: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        let canvas = Canvas::default();
        Self {
            title: "Example client".to_string(),
            width: canvas.width,
            height: canvas.height,
        }
    }
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            speed: Self::default_speed(),
        }
    }
}

impl AnimationConfig {
    fn default_speed() -> f32 {
        24.0
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            frame_log_interval: 60,
        }
    }
}

impl WindowConfig {
    /// Canvas the renderer paints for this window
    pub fn canvas(&self) -> Canvas {
        Canvas::new(self.width, self.height)
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        // Expand ~ to home directory
        let expanded_path = if path.to_string_lossy().starts_with('~') {
            let home = std::env::var("HOME").context("Failed to get HOME environment variable")?;
            let rest = path.strip_prefix("~").unwrap_or(path);
            Path::new(&home).join(rest)
        } else {
            path.to_path_buf()
        };

        let contents = fs::read_to_string(&expanded_path)
            .with_context(|| format!("Failed to read config file: {}", expanded_path.display()))?;

        let config: ClientConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", expanded_path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.window.title.trim().is_empty() {
            anyhow::bail!("Invalid window title: must not be empty");
        }

        if self.window.width == 0 || self.window.height == 0 {
            anyhow::bail!(
                "Invalid window size {}x{}: both dimensions must be non-zero",
                self.window.width,
                self.window.height
            );
        }

        // wl_shm takes the pool size and stride as i32.
        let bytes = u64::from(self.window.width) * u64::from(self.window.height) * 4;
        if bytes > i32::MAX as u64 {
            anyhow::bail!(
                "Invalid window size {}x{}: buffer of {} bytes exceeds the shm pool limit",
                self.window.width,
                self.window.height,
                bytes
            );
        }

        if !self.animation.speed.is_finite() || self.animation.speed < 0.0 {
            anyhow::bail!("Invalid animation speed: must be a finite value >= 0.0");
        }

        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        fs::write(path, contents).context("Failed to write configuration file")?;

        Ok(())
    }
}
