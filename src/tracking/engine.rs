//! Interfaces to the third-party tracking engines.
//!
//! The engines do all feature detection, pose estimation and sensor fusion.
//! Sessions only drive them through these traits, which keeps the session
//! logic testable against a fake engine.

use nalgebra::{Matrix3, UnitQuaternion, Vector3};

use crate::error::{Result, TrackingError};
use crate::geometry::Pose;
use crate::tracking::camera::CameraParameters;

/// Channel count of bitmaps registered as image targets (RGBA).
pub const TARGET_CHANNELS: u32 = 4;

/// Borrowed camera frame, valid for the duration of one call.
#[derive(Debug, Clone, Copy)]
pub struct FrameBuffer<'a> {
    pub data: &'a [u8],
    pub width: u32,
    pub height: u32,
    pub channels: u32,
    /// Bytes of padding at the end of each row.
    pub padding: u32,
    /// Whether the engine should flip the image before processing.
    pub flip: bool,
}

impl<'a> FrameBuffer<'a> {
    /// Describe a frame, checking that `data` covers the declared geometry.
    pub fn new(
        data: &'a [u8],
        width: u32,
        height: u32,
        channels: u32,
        padding: u32,
        flip: bool,
    ) -> Result<Self> {
        if width == 0 || height == 0 || channels == 0 {
            return Err(TrackingError::InvalidFrame(format!(
                "degenerate frame {}x{}x{}",
                width, height, channels
            )));
        }

        let row = width as usize * channels as usize;
        let stride = row + padding as usize;
        // The last row may omit its padding
        let required = stride * (height as usize - 1) + row;
        if data.len() < required {
            return Err(TrackingError::InvalidFrame(format!(
                "{} bytes supplied, {}x{}x{} with padding {} needs {}",
                data.len(),
                width,
                height,
                channels,
                padding,
                required
            )));
        }

        Ok(Self {
            data,
            width,
            height,
            channels,
            padding,
            flip,
        })
    }

    /// Single-channel frame that is never flipped.
    pub fn grayscale(data: &'a [u8], width: u32, height: u32, padding: u32) -> Result<Self> {
        Self::new(data, width, height, 1, padding, false)
    }

    /// Bytes between the starts of consecutive rows.
    pub fn stride(&self) -> usize {
        self.width as usize * self.channels as usize + self.padding as usize
    }
}

/// Size of a bitmap as reported by its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitmapInfo {
    pub width: u32,
    pub height: u32,
}

/// A host-owned RGBA bitmap whose pixels must be locked while read.
pub trait PixelSource {
    fn info(&self) -> Result<BitmapInfo>;

    /// Lock the pixel memory and borrow it. Must be paired with
    /// [`PixelSource::unlock_pixels`].
    fn lock_pixels(&self) -> Result<&[u8]>;

    fn unlock_pixels(&self) -> Result<()>;
}

/// Owned, tightly packed RGBA bitmap.
#[derive(Debug, Clone, PartialEq)]
pub struct RgbaBitmap {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl RgbaBitmap {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * TARGET_CHANNELS as usize;
        if width == 0 || height == 0 || pixels.len() != expected {
            return Err(TrackingError::PixelSource(format!(
                "{}x{} RGBA bitmap needs {} bytes, got {}",
                width,
                height,
                expected,
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

impl PixelSource for RgbaBitmap {
    fn info(&self) -> Result<BitmapInfo> {
        Ok(BitmapInfo {
            width: self.width,
            height: self.height,
        })
    }

    // Owned memory needs no pinning
    fn lock_pixels(&self) -> Result<&[u8]> {
        Ok(&self.pixels)
    }

    fn unlock_pixels(&self) -> Result<()> {
        Ok(())
    }
}

/// Pixel data handed to the engine when creating an image trackable.
#[derive(Debug, Clone, Copy)]
pub struct TargetImage<'a> {
    pub pixels: &'a [u8],
    pub width: u32,
    pub height: u32,
    pub channels: u32,
    pub padding: u32,
}

/// An image trackable detected in the last processed frame.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedTrackable {
    pub name: String,
    /// Physical width in engine units.
    pub width: f64,
    /// Physical height in engine units.
    pub height: f64,
    pub pose: Pose,
}

/// Planar image-target tracking engine.
pub trait ImageTrackingEngine {
    /// Engine-side representation of a registered image.
    type Trackable;

    fn set_api_key(&mut self, key: &str) -> Result<()>;
    fn set_camera_parameters(&mut self, parameters: &CameraParameters);
    fn set_maximum_simultaneous_tracking(&mut self, count: usize);

    /// Build a trackable from raw pixels; `None` if the image is unsuitable.
    fn create_trackable(&self, image: &TargetImage<'_>, name: &str) -> Option<Self::Trackable>;
    fn add_trackable(&mut self, trackable: Self::Trackable) -> bool;

    fn process_frame(&mut self, frame: &FrameBuffer<'_>);
    fn detected_trackables(&self) -> Vec<DetectedTrackable>;
    fn camera_matrix(&self) -> Matrix3<f64>;
}

/// Markerless 6-DoF tracking engine.
pub trait ArbitraryTrackingEngine {
    fn set_api_key(&mut self, key: &str) -> Result<()>;
    fn set_camera_parameters(&mut self, parameters: &CameraParameters);

    fn start(&mut self, position: &Vector3<f64>, orientation: &UnitQuaternion<f64>);
    fn stop(&mut self);

    /// Orientation estimate from another sensor. Without it the engine never
    /// reports an orientation.
    fn set_sensed_orientation(&mut self, orientation: &UnitQuaternion<f64>);

    fn process_frame(&mut self, frame: &FrameBuffer<'_>);
    fn is_tracking(&self) -> bool;
    fn position(&self) -> Vector3<f64>;
    fn orientation(&self) -> UnitQuaternion<f64>;
    fn camera_matrix(&self) -> Matrix3<f64>;
}
