//! Markerless ("arbitrary") tracking session.
//!
//! The engine is started from a seed pose, either the pose of an image
//! target currently detected by an [`ImageTrackerSession`] or a fixed pose in
//! front of the camera. Before every frame the host must hand over an
//! orientation estimate from the inertial sensors; without it the engine
//! never reports an orientation.

use nalgebra::{Matrix3, UnitQuaternion, Vector3};
use tracing::{debug, info, warn};

use crate::config::{ArbitraryTrackerConfig, TrackingConfig};
use crate::error::{Result, TrackingError};
use crate::geometry::Pose;
use crate::imu::OrientationSample;
use crate::tracking::camera::CameraParameters;
use crate::tracking::encoder::{HalfExtents, encode_overlay};
use crate::tracking::engine::{ArbitraryTrackingEngine, FrameBuffer, ImageTrackingEngine};
use crate::tracking::image_session::ImageTrackerSession;
use crate::tracking::result::{OverlayPrimitive, ProjectedFrame};
use crate::tracking::state::ArbitraryState;

/// Distance in front of the camera of the default seed (millimetres).
pub const DEFAULT_SEED_DISTANCE: f64 = 600.0;
/// Outline half-extent when not seeded from an image target.
pub const DEFAULT_SCALE: f64 = 100.0;

/// Starting pose and outline scale for markerless tracking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArbitrarySeed {
    pub pose: Pose,
    /// Half-extent of the square outline projected around the pose.
    pub scale: f64,
}

impl ArbitrarySeed {
    /// Seed `distance` straight ahead of the camera, without rotation.
    pub fn in_front(distance: f64, scale: f64) -> Self {
        Self {
            pose: Pose::new(Vector3::new(0.0, 0.0, distance), UnitQuaternion::identity()),
            scale,
        }
    }

    pub fn from_config(config: &ArbitraryTrackerConfig) -> Self {
        Self::in_front(config.default_distance, config.default_scale)
    }

    /// Seed from the first target the image session currently detects.
    ///
    /// The scale is half the target's physical height.
    pub fn from_image_session<E: ImageTrackingEngine>(
        session: &ImageTrackerSession<E>,
    ) -> Result<Self> {
        let detected = session.detected_trackables();
        let trackable = detected.first().ok_or(TrackingError::TargetNotDetected)?;
        Ok(Self {
            pose: trackable.pose,
            scale: trackable.height * 0.5,
        })
    }
}

impl Default for ArbitrarySeed {
    fn default() -> Self {
        Self::in_front(DEFAULT_SEED_DISTANCE, DEFAULT_SCALE)
    }
}

pub struct ArbitraryTrackerSession<A: ArbitraryTrackingEngine> {
    engine: A,
    camera: CameraParameters,
    intrinsics: Matrix3<f64>,
    default_seed: ArbitrarySeed,
    /// Fixed at `start()`; `None` until the first start.
    scale: Option<f64>,
    state: ArbitraryState,
    /// Whether an orientation was supplied since the last frame.
    orientation_fresh: bool,
}

impl<A: ArbitraryTrackingEngine> ArbitraryTrackerSession<A> {
    pub fn new(engine: A, credential: &str, width: u32, height: u32) -> Result<Self> {
        Self::with_camera(
            engine,
            credential,
            CameraParameters::guessed(width, height),
            ArbitrarySeed::default(),
        )
    }

    pub fn from_config(engine: A, config: &TrackingConfig) -> Result<Self> {
        Self::with_camera(
            engine,
            &config.api_key,
            config.camera_parameters(),
            ArbitrarySeed::from_config(&config.arbitrary_tracker),
        )
    }

    fn with_camera(
        mut engine: A,
        credential: &str,
        camera: CameraParameters,
        default_seed: ArbitrarySeed,
    ) -> Result<Self> {
        engine.set_camera_parameters(&camera);
        engine.set_api_key(credential)?;

        let intrinsics = engine.camera_matrix();
        info!(
            width = camera.width,
            height = camera.height,
            fx = camera.fx,
            "Arbitrary tracker initialised"
        );

        Ok(Self {
            engine,
            camera,
            intrinsics,
            default_seed,
            scale: None,
            state: ArbitraryState::Stopped,
            orientation_fresh: false,
        })
    }

    /// Start (or restart) tracking from `seed`.
    pub fn start(&mut self, seed: ArbitrarySeed) {
        self.scale = Some(seed.scale);
        self.engine.start(&seed.pose.position, &seed.pose.orientation);
        self.state = ArbitraryState::Running;
        info!(
            x = seed.pose.position.x,
            y = seed.pose.position.y,
            z = seed.pose.position.z,
            scale = seed.scale,
            "Arbitrary tracking started"
        );
    }

    /// Start from the image target `image` currently detects.
    ///
    /// Fails with [`TrackingError::TargetNotDetected`] when it detects none;
    /// the session is then left as it was.
    pub fn start_from_image_target<E: ImageTrackingEngine>(
        &mut self,
        image: &ImageTrackerSession<E>,
    ) -> Result<()> {
        let seed = ArbitrarySeed::from_image_session(image)?;
        self.start(seed);
        Ok(())
    }

    /// Start from the configured pose in front of the camera.
    pub fn start_from_default(&mut self) {
        self.start(self.default_seed);
    }

    pub fn stop(&mut self) {
        self.engine.stop();
        self.state = ArbitraryState::Stopped;
        info!("Arbitrary tracking stopped");
    }

    /// Hand the engine the current inertial orientation estimate.
    pub fn set_sensed_orientation(&mut self, sample: OrientationSample) {
        self.engine.set_sensed_orientation(&sample.to_quaternion());
        self.orientation_fresh = true;
    }

    /// Feed one single-channel frame, never flipped.
    ///
    /// - `Ok(None)`: the engine is not tracking.
    /// - `Ok(Some(PoseUnavailable))`: the engine claims tracking but its
    ///   position is still exactly zero.
    /// - `Ok(Some(Projected(_)))`: square outline of half-extent `scale`.
    pub fn process_frame(
        &mut self,
        pixels: &[u8],
        width: u32,
        height: u32,
        padding: u32,
    ) -> Result<Option<ProjectedFrame>> {
        let frame = FrameBuffer::grayscale(pixels, width, height, padding)?;

        if !self.orientation_fresh {
            warn!("Processing frame without a sensed orientation");
        }
        self.orientation_fresh = false;

        self.engine.process_frame(&frame);

        if !self.engine.is_tracking() {
            return Ok(None);
        }

        let position = self.engine.position();
        let pose = Pose::new(position, self.engine.orientation());
        if pose.has_zero_position() {
            debug!("Tracking reported before a pose is available");
            return Ok(Some(ProjectedFrame::PoseUnavailable));
        }

        let Some(scale) = self.scale else {
            warn!("Engine reports tracking but the session was never started");
            return Ok(None);
        };

        let overlay = encode_overlay(&self.intrinsics, &pose, &HalfExtents::square(scale))?;
        Ok(Some(ProjectedFrame::Projected(overlay)))
    }

    /// [`Self::set_sensed_orientation`] followed by [`Self::process_frame`].
    pub fn process_frame_with_orientation(
        &mut self,
        orientation: OrientationSample,
        pixels: &[u8],
        width: u32,
        height: u32,
        padding: u32,
    ) -> Result<Option<ProjectedFrame>> {
        self.set_sensed_orientation(orientation);
        self.process_frame(pixels, width, height, padding)
    }

    pub fn state(&self) -> ArbitraryState {
        self.state
    }

    pub fn is_tracking(&self) -> bool {
        self.engine.is_tracking()
    }

    pub fn scale(&self) -> Option<f64> {
        self.scale
    }

    pub fn camera(&self) -> &CameraParameters {
        &self.camera
    }

    pub fn intrinsics(&self) -> &Matrix3<f64> {
        &self.intrinsics
    }

    /// Overlay shape the host draws for this session's results.
    pub fn overlay_primitive(&self) -> OverlayPrimitive {
        OverlayPrimitive::Grid
    }

    pub fn engine(&self) -> &A {
        &self.engine
    }
}
