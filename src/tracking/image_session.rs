//! Image-target tracking session.
//!
//! Owns one image tracking engine configured with guessed intrinsics and an
//! API credential. Each frame is fed to the engine; when exactly one
//! registered image is detected its outline is projected into the frame.

use nalgebra::Matrix3;
use tracing::{debug, info, warn};

use crate::config::TrackingConfig;
use crate::error::Result;
use crate::tracking::camera::CameraParameters;
use crate::tracking::encoder::{HalfExtents, encode_overlay};
use crate::tracking::engine::{
    DetectedTrackable, FrameBuffer, ImageTrackingEngine, PixelSource, TARGET_CHANNELS,
    TargetImage,
};
use crate::tracking::result::{FrameOverlay, OverlayPrimitive};
use crate::tracking::state::DetectionState;

/// Only one target is tracked (and projected) at a time.
pub const MAX_SIMULTANEOUS_TRACKING: usize = 1;

pub struct ImageTrackerSession<E: ImageTrackingEngine> {
    engine: E,
    camera: CameraParameters,
    /// Intrinsics read back from the engine once, fixed for the session.
    intrinsics: Matrix3<f64>,
    /// Names of successfully registered targets, in registration order.
    targets: Vec<String>,
    last_detection: DetectionState,
}

impl<E: ImageTrackingEngine> ImageTrackerSession<E> {
    /// Configure `engine` for a `width` x `height` stream and bind `credential`.
    pub fn new(engine: E, credential: &str, width: u32, height: u32) -> Result<Self> {
        Self::with_camera(engine, credential, CameraParameters::guessed(width, height))
    }

    pub fn from_config(engine: E, config: &TrackingConfig) -> Result<Self> {
        Self::with_camera(engine, &config.api_key, config.camera_parameters())
    }

    fn with_camera(mut engine: E, credential: &str, camera: CameraParameters) -> Result<Self> {
        engine.set_maximum_simultaneous_tracking(MAX_SIMULTANEOUS_TRACKING);
        engine.set_camera_parameters(&camera);
        engine.set_api_key(credential)?;

        let intrinsics = engine.camera_matrix();
        info!(
            width = camera.width,
            height = camera.height,
            fx = camera.fx,
            "Image tracker initialised"
        );

        Ok(Self {
            engine,
            camera,
            intrinsics,
            targets: Vec::new(),
            last_detection: DetectionState::None,
        })
    }

    /// Register an RGBA bitmap as a trackable image.
    ///
    /// Returns `false` if the bitmap cannot be read or the engine rejects
    /// it; the set of registered targets is then left unchanged.
    pub fn add_target(&mut self, bitmap: &impl PixelSource, name: &str) -> bool {
        let bitmap_info = match bitmap.info() {
            Ok(bitmap_info) => bitmap_info,
            Err(e) => {
                warn!("Could not get trackable image info: {}", e);
                return false;
            }
        };

        let pixels = match bitmap.lock_pixels() {
            Ok(pixels) => pixels,
            Err(e) => {
                warn!("Could not lock trackable image pixels: {}", e);
                return false;
            }
        };

        let image = TargetImage {
            pixels,
            width: bitmap_info.width,
            height: bitmap_info.height,
            channels: TARGET_CHANNELS,
            padding: 0,
        };
        let trackable = self.engine.create_trackable(&image, name);

        if let Err(e) = bitmap.unlock_pixels() {
            warn!("Could not unlock trackable image pixels: {}", e);
        }

        let Some(trackable) = trackable else {
            warn!(name, "Engine could not create a trackable from the image");
            return false;
        };

        if !self.engine.add_trackable(trackable) {
            warn!(name, "Engine refused to add the trackable");
            return false;
        }

        info!(
            name,
            width = bitmap_info.width,
            height = bitmap_info.height,
            "Registered image target"
        );
        self.targets.push(name.to_string());
        true
    }

    /// Feed one frame and project the detected target, if exactly one is
    /// detected.
    ///
    /// `Ok(None)` is the normal outcome when nothing (or more than one
    /// target) is detected.
    pub fn process_frame(&mut self, frame: &FrameBuffer<'_>) -> Result<Option<FrameOverlay>> {
        self.engine.process_frame(frame);

        let detected = self.engine.detected_trackables();
        self.last_detection = DetectionState::from_count(detected.len());

        let [tracked] = detected.as_slice() else {
            if detected.len() > 1 {
                debug!(count = detected.len(), "Ignoring simultaneous detections");
            }
            return Ok(None);
        };

        let extents = HalfExtents::rectangle(tracked.width, tracked.height);
        let overlay = encode_overlay(&self.intrinsics, &tracked.pose, &extents)?;
        debug!(
            name = %tracked.name,
            x = overlay.center.x,
            y = overlay.center.y,
            "Projected image target"
        );
        Ok(Some(overlay))
    }

    /// Trackables the engine detected in the last processed frame.
    pub fn detected_trackables(&self) -> Vec<DetectedTrackable> {
        self.engine.detected_trackables()
    }

    pub fn target_names(&self) -> &[String] {
        &self.targets
    }

    pub fn last_detection(&self) -> DetectionState {
        self.last_detection
    }

    pub fn camera(&self) -> &CameraParameters {
        &self.camera
    }

    pub fn intrinsics(&self) -> &Matrix3<f64> {
        &self.intrinsics
    }

    /// Overlay shape the host draws for this session's results.
    pub fn overlay_primitive(&self) -> OverlayPrimitive {
        OverlayPrimitive::Rectangle
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TrackingError;
    use crate::geometry::{Pose, project};
    use crate::tracking::engine::BitmapInfo;
    use crate::tracking::fake::{FakeImageEngine, REJECTED_KEY};
    use approx::assert_relative_eq;
    use nalgebra::{UnitQuaternion, Vector3};
    use std::cell::Cell;

    struct TestBitmap {
        width: u32,
        height: u32,
        pixels: Vec<u8>,
        fail_info: bool,
        fail_lock: bool,
        fail_unlock: bool,
        locked: Cell<bool>,
    }

    impl TestBitmap {
        fn rgba(width: u32, height: u32) -> Self {
            Self {
                width,
                height,
                pixels: vec![128; (width * height * 4) as usize],
                fail_info: false,
                fail_lock: false,
                fail_unlock: false,
                locked: Cell::new(false),
            }
        }
    }

    impl PixelSource for TestBitmap {
        fn info(&self) -> Result<BitmapInfo> {
            if self.fail_info {
                return Err(TrackingError::PixelSource("no info".into()));
            }
            Ok(BitmapInfo {
                width: self.width,
                height: self.height,
            })
        }

        fn lock_pixels(&self) -> Result<&[u8]> {
            if self.fail_lock {
                return Err(TrackingError::PixelSource("lock failed".into()));
            }
            self.locked.set(true);
            Ok(&self.pixels)
        }

        fn unlock_pixels(&self) -> Result<()> {
            self.locked.set(false);
            if self.fail_unlock {
                return Err(TrackingError::PixelSource("unlock failed".into()));
            }
            Ok(())
        }
    }

    fn detection(name: &str, width: f64, height: f64, z: f64) -> DetectedTrackable {
        DetectedTrackable {
            name: name.to_string(),
            width,
            height,
            pose: Pose::new(Vector3::new(0.0, 0.0, z), UnitQuaternion::identity()),
        }
    }

    fn session() -> ImageTrackerSession<FakeImageEngine> {
        ImageTrackerSession::new(FakeImageEngine::default(), "key", 640, 480).unwrap()
    }

    #[test]
    fn test_initialise_configures_engine() {
        let s = session();
        let engine = s.engine();
        assert_eq!(engine.max_tracking, Some(1));
        assert_eq!(engine.api_key.as_deref(), Some("key"));
        assert_eq!(engine.camera, Some(CameraParameters::guessed(640, 480)));
        assert_relative_eq!(*s.intrinsics(), s.camera().camera_matrix());
        assert!(s.target_names().is_empty());
    }

    #[test]
    fn test_rejected_credential_is_propagated() {
        let result = ImageTrackerSession::new(FakeImageEngine::default(), REJECTED_KEY, 640, 480);
        assert!(matches!(result, Err(TrackingError::CredentialRejected(_))));
    }

    #[test]
    fn test_add_target_registers_and_unlocks() {
        let mut s = session();
        let bitmap = TestBitmap::rgba(8, 4);
        assert!(s.add_target(&bitmap, "poster"));
        assert_eq!(s.target_names(), ["poster".to_string()]);
        assert!(!bitmap.locked.get());
        assert_eq!(s.engine().trackables[0].width, 8);
    }

    #[test]
    fn test_unreadable_bitmap_leaves_targets_unchanged() {
        let mut s = session();

        let mut no_info = TestBitmap::rgba(4, 4);
        no_info.fail_info = true;
        assert!(!s.add_target(&no_info, "a"));

        let mut no_lock = TestBitmap::rgba(4, 4);
        no_lock.fail_lock = true;
        assert!(!s.add_target(&no_lock, "b"));

        assert!(s.target_names().is_empty());
        assert!(s.engine().trackables.is_empty());
    }

    #[test]
    fn test_engine_refusal_returns_false() {
        let mut s = session();
        s.engine.refuse_create = true;
        assert!(!s.add_target(&TestBitmap::rgba(4, 4), "plain"));
        assert!(s.target_names().is_empty());
    }

    #[test]
    fn test_duplicate_add_returns_false() {
        let mut s = session();
        assert!(s.add_target(&TestBitmap::rgba(4, 4), "same"));
        assert!(!s.add_target(&TestBitmap::rgba(4, 4), "same"));
        assert_eq!(s.target_names().len(), 1);
    }

    #[test]
    fn test_unlock_failure_is_not_fatal() {
        let mut s = session();
        let mut bitmap = TestBitmap::rgba(4, 4);
        bitmap.fail_unlock = true;
        assert!(s.add_target(&bitmap, "sticky"));
    }

    #[test]
    fn test_no_detection_returns_none() {
        let mut s = session();
        let data = vec![0u8; 640 * 480];
        let frame = FrameBuffer::new(&data, 640, 480, 1, 0, false).unwrap();
        assert_eq!(s.process_frame(&frame).unwrap(), None);
        assert_eq!(s.last_detection(), DetectionState::None);
    }

    #[test]
    fn test_multiple_detections_return_none() {
        let mut s = session();
        s.engine.scripted = vec![
            detection("a", 100.0, 100.0, 500.0),
            detection("b", 100.0, 100.0, 700.0),
        ];
        let data = vec![0u8; 640 * 480];
        let frame = FrameBuffer::new(&data, 640, 480, 1, 0, false).unwrap();
        assert_eq!(s.process_frame(&frame).unwrap(), None);
        assert_eq!(s.last_detection(), DetectionState::Multiple(2));
    }

    #[test]
    fn test_single_detection_is_projected() {
        let mut s = session();
        s.engine.scripted = vec![detection("poster", 300.0, 200.0, 600.0)];
        let data = vec![0u8; 640 * 480 * 3];
        let frame = FrameBuffer::new(&data, 640, 480, 3, 0, true).unwrap();

        let overlay = s.process_frame(&frame).unwrap().unwrap();
        assert_eq!(s.last_detection(), DetectionState::Single);

        let k = *s.intrinsics();
        let pose = &s.engine().scripted[0].pose;
        let centre = project(&Vector3::zeros(), &k, &pose.position, &pose.orientation).unwrap();
        let flat = overlay.to_flat();
        assert_relative_eq!(flat[0], centre.x as f32, epsilon = 1e-3);
        assert_relative_eq!(flat[1], centre.y as f32, epsilon = 1e-3);

        // Rectangle extents: 150 x 100 half-size
        let c00 = project(
            &Vector3::new(-150.0, -100.0, 0.0),
            &k,
            &pose.position,
            &pose.orientation,
        )
        .unwrap();
        assert_relative_eq!(flat[2], c00.x as f32, epsilon = 1e-3);
        assert_relative_eq!(flat[3], c00.y as f32, epsilon = 1e-3);
        assert!(flat[6] > flat[2] && flat[7] > flat[3]);

        // frame geometry passed through untouched
        assert_eq!(s.engine().frames, vec![(640, 480, 3, 0, true)]);
    }

    #[test]
    fn test_degenerate_pose_is_an_error() {
        let mut s = session();
        s.engine.scripted = vec![detection("flat", 100.0, 100.0, 0.0)];
        let data = vec![0u8; 16];
        let frame = FrameBuffer::grayscale(&data, 4, 4, 0).unwrap();
        assert!(matches!(
            s.process_frame(&frame),
            Err(TrackingError::InvalidProjection { .. })
        ));
    }

    #[test]
    fn test_from_config_uses_configured_fov() {
        let mut config = TrackingConfig::new("key", 1280, 720);
        config.camera.horizontal_fov_deg = 90.0;
        let s = ImageTrackerSession::from_config(FakeImageEngine::default(), &config).unwrap();
        assert_relative_eq!(s.camera().fx, 640.0, epsilon = 1e-9);
    }

    #[test]
    fn test_from_config_tracks_one_target_at_a_time() {
        let config = TrackingConfig::new("key", 640, 480);
        let s = ImageTrackerSession::from_config(FakeImageEngine::default(), &config).unwrap();
        assert_eq!(s.engine().max_tracking, Some(MAX_SIMULTANEOUS_TRACKING));
    }
}
