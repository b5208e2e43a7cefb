//! Builds frame overlays by projecting a tracked object's centre and corners.
//!
//! A trackable sits at the origin of its own frame, so its outline is the
//! rectangle `(±half_width, ±half_height, 0)`. Projecting the origin and
//! those four corners with the tracked pose gives the outline on screen.

use nalgebra::{Matrix3, Point2, Vector3};

use crate::error::Result;
use crate::geometry::{Pose, project_pose};
use crate::tracking::result::FrameOverlay;

/// Half-extents of the outline in the object's XY plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HalfExtents {
    pub half_width: f64,
    pub half_height: f64,
}

impl HalfExtents {
    /// Extents of a rectangle with the given full width and height.
    pub fn rectangle(width: f64, height: f64) -> Self {
        Self {
            half_width: width * 0.5,
            half_height: height * 0.5,
        }
    }

    /// Square whose half-extent on both axes is `scale`.
    pub fn square(scale: f64) -> Self {
        Self {
            half_width: scale,
            half_height: scale,
        }
    }
}

/// Outline corners in the order (-,-), (-,+), (+,+), (+,-).
pub fn corner_points(extents: &HalfExtents) -> [Vector3<f64>; 4] {
    let w = extents.half_width;
    let h = extents.half_height;
    [
        Vector3::new(-w, -h, 0.0),
        Vector3::new(-w, h, 0.0),
        Vector3::new(w, h, 0.0),
        Vector3::new(w, -h, 0.0),
    ]
}

/// Project centre and corners of a tracked object into an overlay.
pub fn encode_overlay(
    intrinsics: &Matrix3<f64>,
    pose: &Pose,
    extents: &HalfExtents,
) -> Result<FrameOverlay> {
    let center = to_f32(project_pose(&Vector3::zeros(), intrinsics, pose)?);

    let mut corners = [Point2::origin(); 4];
    for (slot, corner) in corners.iter_mut().zip(corner_points(extents).iter()) {
        *slot = to_f32(project_pose(corner, intrinsics, pose)?);
    }

    Ok(FrameOverlay { center, corners })
}

fn to_f32(p: Point2<f64>) -> Point2<f32> {
    Point2::new(p.x as f32, p.y as f32)
}
