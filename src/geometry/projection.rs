//! Pinhole projection of points on a tracked object into screen space.
//!
//! A point X (3x1) on the object, seen by a camera with rotation R and
//! translation T and intrinsics K, lands at the homogeneous image point
//!
//! ```text
//! xh = K [R | T] X = K (R X + T)
//! ```
//!
//! and at pixel `(xh.x / xh.z, xh.y / xh.z)`.

use nalgebra::{Matrix3, Point2, UnitQuaternion, Vector3};

use crate::error::{Result, TrackingError};
use crate::geometry::Pose;

/// Project `point` (object frame) to pixel coordinates.
///
/// Returns [`TrackingError::InvalidProjection`] when the homogeneous depth is
/// exactly zero or the division produces a non-finite coordinate.
pub fn project(
    point: &Vector3<f64>,
    intrinsics: &Matrix3<f64>,
    position: &Vector3<f64>,
    orientation: &UnitQuaternion<f64>,
) -> Result<Point2<f64>> {
    let rotation = orientation.to_rotation_matrix().into_inner();

    // Point expressed in the camera frame
    let x_cam = rotation * point + position;
    let x_h = intrinsics * x_cam;

    if x_h.z == 0.0 {
        return Err(TrackingError::InvalidProjection { depth: x_h.z });
    }

    let u = x_h.x / x_h.z;
    let v = x_h.y / x_h.z;
    if !u.is_finite() || !v.is_finite() {
        return Err(TrackingError::InvalidProjection { depth: x_h.z });
    }

    Ok(Point2::new(u, v))
}

/// [`project`] with the camera extrinsics taken from a tracked pose.
#[inline]
pub fn project_pose(
    point: &Vector3<f64>,
    intrinsics: &Matrix3<f64>,
    pose: &Pose,
) -> Result<Point2<f64>> {
    project(point, intrinsics, &pose.position, &pose.orientation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn k_matrix() -> Matrix3<f64> {
        Matrix3::new(500.0, 0.0, 320.0, 0.0, 500.0, 240.0, 0.0, 0.0, 1.0)
    }

    #[test]
    fn test_origin_in_front_of_unit_camera_projects_to_zero() {
        let p = project(
            &Vector3::zeros(),
            &Matrix3::identity(),
            &Vector3::new(0.0, 0.0, 5.0),
            &UnitQuaternion::identity(),
        )
        .unwrap();
        assert_relative_eq!(p, Point2::new(0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_centre_lands_on_principal_point() {
        let p = project(
            &Vector3::zeros(),
            &k_matrix(),
            &Vector3::new(0.0, 0.0, 600.0),
            &UnitQuaternion::identity(),
        )
        .unwrap();
        assert_relative_eq!(p, Point2::new(320.0, 240.0), epsilon = 1e-9);
    }

    #[test]
    fn test_offset_point_scales_with_focal_over_depth() {
        let p = project(
            &Vector3::new(100.0, -50.0, 0.0),
            &k_matrix(),
            &Vector3::new(0.0, 0.0, 500.0),
            &UnitQuaternion::identity(),
        )
        .unwrap();
        assert_relative_eq!(p, Point2::new(420.0, 190.0), epsilon = 1e-9);
    }

    #[test]
    fn test_rotation_applied_before_translation() {
        // 90 degrees about y sends +x onto -z
        let rot = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), std::f64::consts::FRAC_PI_2);
        let p = project(
            &Vector3::new(100.0, 0.0, 0.0),
            &Matrix3::identity(),
            &Vector3::new(10.0, 0.0, 200.0),
            &rot,
        )
        .unwrap();
        assert_relative_eq!(p.x, 10.0 / 100.0, epsilon = 1e-9);
        assert_relative_eq!(p.y, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_deterministic() {
        let rot = UnitQuaternion::from_euler_angles(0.1, -0.2, 0.3);
        let pos = Vector3::new(12.0, -4.0, 700.0);
        let x = Vector3::new(50.0, 25.0, 0.0);
        let a = project(&x, &k_matrix(), &pos, &rot).unwrap();
        let b = project(&x, &k_matrix(), &pos, &rot).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_point_on_camera_plane_is_rejected() {
        let err = project(
            &Vector3::new(1.0, 1.0, 0.0),
            &Matrix3::identity(),
            &Vector3::zeros(),
            &UnitQuaternion::identity(),
        )
        .unwrap_err();
        assert_eq!(err, TrackingError::InvalidProjection { depth: 0.0 });
    }

    #[test]
    fn test_project_pose_matches_project() {
        let pose = Pose::new(
            Vector3::new(5.0, 6.0, 400.0),
            UnitQuaternion::from_euler_angles(0.05, 0.0, -0.1),
        );
        let x = Vector3::new(-30.0, 40.0, 0.0);
        let a = project_pose(&x, &k_matrix(), &pose).unwrap();
        let b = project(&x, &k_matrix(), &pose.position, &pose.orientation).unwrap();
        assert_eq!(a, b);
    }
}
