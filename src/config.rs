//! Session configuration loaded from YAML.
//!
//! ```yaml
//! api_key: "..."
//! frame:
//!   width: 640
//!   height: 480
//! camera:
//!   horizontal_fov_deg: 60.0
//! arbitrary_tracker:
//!   default_distance: 600.0
//!   default_scale: 100.0
//! ```
//!
//! Every section except `api_key` may be omitted.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::tracking::camera::{CameraParameters, DEFAULT_HORIZONTAL_FOV_DEG};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TrackingConfig {
    pub api_key: String,
    #[serde(default)]
    pub frame: FrameConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub arbitrary_tracker: ArbitraryTrackerConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct FrameConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct CameraConfig {
    pub horizontal_fov_deg: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            horizontal_fov_deg: DEFAULT_HORIZONTAL_FOV_DEG,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ArbitraryTrackerConfig {
    /// Distance in front of the camera of the default seed pose.
    pub default_distance: f64,
    /// Outline half-extent used when not seeded from an image target.
    pub default_scale: f64,
}

impl Default for ArbitraryTrackerConfig {
    fn default() -> Self {
        Self {
            default_distance: 600.0,
            default_scale: 100.0,
        }
    }
}

impl TrackingConfig {
    pub fn new(api_key: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            api_key: api_key.into(),
            frame: FrameConfig { width, height },
            camera: CameraConfig::default(),
            arbitrary_tracker: ArbitraryTrackerConfig::default(),
        }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: TrackingConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.frame.width == 0 || self.frame.height == 0 {
            bail!(
                "frame size must be non-zero, got {}x{}",
                self.frame.width,
                self.frame.height
            );
        }
        let fov = self.camera.horizontal_fov_deg;
        if !(fov > 0.0 && fov < 180.0) {
            bail!("horizontal_fov_deg must be in (0, 180), got {}", fov);
        }
        if self.arbitrary_tracker.default_scale <= 0.0 {
            bail!(
                "default_scale must be positive, got {}",
                self.arbitrary_tracker.default_scale
            );
        }
        Ok(())
    }

    /// Camera parameters with intrinsics guessed from the frame size.
    pub fn camera_parameters(&self) -> CameraParameters {
        CameraParameters::guessed_with_fov(
            self.frame.width,
            self.frame.height,
            self.camera.horizontal_fov_deg,
        )
    }
}
