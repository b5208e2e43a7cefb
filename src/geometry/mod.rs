//! Geometry utilities: tracked poses and screen-space projection.

pub mod pose;
pub mod projection;

pub use pose::Pose;
pub use projection::{project, project_pose};
