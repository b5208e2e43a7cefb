//! Camera parameters handed to the tracking engines.

use nalgebra::Matrix3;

/// Horizontal field of view assumed when intrinsics are guessed (degrees).
pub const DEFAULT_HORIZONTAL_FOV_DEG: f64 = 60.0;

/// Pinhole camera parameters for one image stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraParameters {
    pub width: u32,
    pub height: u32,
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

impl CameraParameters {
    /// Parameters for a `width` x `height` stream with intrinsics guessed from
    /// the default field of view.
    pub fn guessed(width: u32, height: u32) -> Self {
        Self::guessed_with_fov(width, height, DEFAULT_HORIZONTAL_FOV_DEG)
    }

    /// Guess intrinsics when the real calibration is unknown: square pixels,
    /// principal point at the image centre, and a focal length matching the
    /// given horizontal field of view.
    pub fn guessed_with_fov(width: u32, height: u32, horizontal_fov_deg: f64) -> Self {
        let half_fov = (horizontal_fov_deg * 0.5).to_radians();
        let focal = (width as f64 * 0.5) / half_fov.tan();
        Self {
            width,
            height,
            fx: focal,
            fy: focal,
            cx: width as f64 * 0.5,
            cy: height as f64 * 0.5,
        }
    }

    /// 3x3 intrinsic matrix K.
    #[rustfmt::skip]
    pub fn camera_matrix(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.fx, 0.0, self.cx,
            0.0, self.fy, self.cy,
            0.0, 0.0, 1.0,
        )
    }
}
