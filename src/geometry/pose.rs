//! Rigid pose of a tracked object relative to the camera.

use nalgebra::{Matrix3, Quaternion, UnitQuaternion, Vector3};

/// Position + orientation of a trackable's local frame in the camera frame.
///
/// Equivalently, the rotation R and translation T of a camera looking at the
/// trackable, so a point X in the trackable frame maps to `R * X + T`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    /// Translation in millimetres.
    pub position: Vector3<f64>,
    pub orientation: UnitQuaternion<f64>,
}

impl Pose {
    pub fn new(position: Vector3<f64>, orientation: UnitQuaternion<f64>) -> Self {
        Self {
            position,
            orientation,
        }
    }

    pub fn identity() -> Self {
        Self {
            position: Vector3::zeros(),
            orientation: UnitQuaternion::identity(),
        }
    }

    /// Build a pose from w-first quaternion components.
    ///
    /// The quaternion is taken as-is: callers supply unit quaternions and the
    /// components are not renormalized.
    pub fn from_quaternion(qw: f64, qx: f64, qy: f64, qz: f64, position: Vector3<f64>) -> Self {
        let orientation = UnitQuaternion::new_unchecked(Quaternion::new(qw, qx, qy, qz));
        Self {
            position,
            orientation,
        }
    }

    /// Rotation part as a 3x3 matrix.
    pub fn rotation_matrix(&self) -> Matrix3<f64> {
        self.orientation.to_rotation_matrix().into_inner()
    }

    /// Map a point from the trackable frame into the camera frame.
    pub fn transform_point(&self, point: &Vector3<f64>) -> Vector3<f64> {
        self.rotation_matrix() * point + self.position
    }

    /// True when the position is exactly the origin.
    ///
    /// Engines report this before a real estimate exists, so it doubles as
    /// the "pose not yet available" sentinel.
    pub fn has_zero_position(&self) -> bool {
        self.position.x == 0.0 && self.position.y == 0.0 && self.position.z == 0.0
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}
