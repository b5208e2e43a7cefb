//! Tracking sessions: drive the third-party engines frame by frame and turn
//! the tracked pose into a screen-space overlay.
//!
//! - Image targets: planar images registered up front, detected per frame
//! - Arbitrary tracking: markerless 6-DoF tracking seeded from a pose
//! - Encoding: centre + corner projection into a [`FrameOverlay`]

pub mod arbitrary_session;
pub mod camera;
pub mod encoder;
pub mod engine;
pub mod image_session;
pub mod result;
pub mod state;

#[cfg(test)]
pub(crate) mod fake;

pub use arbitrary_session::{ArbitrarySeed, ArbitraryTrackerSession};
pub use camera::CameraParameters;
pub use engine::{
    ArbitraryTrackingEngine, DetectedTrackable, FrameBuffer, ImageTrackingEngine, PixelSource,
    RgbaBitmap,
};
pub use image_session::ImageTrackerSession;
pub use result::{FrameOverlay, OverlayPrimitive, ProjectedFrame};
pub use state::{ArbitraryState, DetectionState};
