//! Scriptable in-memory engines for session tests.

use nalgebra::{Matrix3, UnitQuaternion, Vector3};

use crate::error::{Result, TrackingError};
use crate::tracking::camera::CameraParameters;
use crate::tracking::engine::{
    ArbitraryTrackingEngine, DetectedTrackable, FrameBuffer, ImageTrackingEngine, TargetImage,
};

pub const REJECTED_KEY: &str = "rejected-key";

#[derive(Debug, Clone, PartialEq)]
pub struct FakeTrackable {
    pub name: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Default)]
pub struct FakeImageEngine {
    pub api_key: Option<String>,
    pub camera: Option<CameraParameters>,
    pub max_tracking: Option<usize>,
    pub trackables: Vec<FakeTrackable>,
    /// Detections reported after the next processed frame.
    pub scripted: Vec<DetectedTrackable>,
    pub detected: Vec<DetectedTrackable>,
    pub frames: Vec<(u32, u32, u32, u32, bool)>,
    pub refuse_create: bool,
}

impl ImageTrackingEngine for FakeImageEngine {
    type Trackable = FakeTrackable;

    fn set_api_key(&mut self, key: &str) -> Result<()> {
        if key == REJECTED_KEY {
            return Err(TrackingError::CredentialRejected(key.to_string()));
        }
        self.api_key = Some(key.to_string());
        Ok(())
    }

    fn set_camera_parameters(&mut self, parameters: &CameraParameters) {
        self.camera = Some(*parameters);
    }

    fn set_maximum_simultaneous_tracking(&mut self, count: usize) {
        self.max_tracking = Some(count);
    }

    fn create_trackable(&self, image: &TargetImage<'_>, name: &str) -> Option<FakeTrackable> {
        if self.refuse_create || image.channels != 4 {
            return None;
        }
        Some(FakeTrackable {
            name: name.to_string(),
            width: image.width,
            height: image.height,
        })
    }

    fn add_trackable(&mut self, trackable: FakeTrackable) -> bool {
        if self.trackables.iter().any(|t| t.name == trackable.name) {
            return false;
        }
        self.trackables.push(trackable);
        true
    }

    fn process_frame(&mut self, frame: &FrameBuffer<'_>) {
        self.frames.push((
            frame.width,
            frame.height,
            frame.channels,
            frame.padding,
            frame.flip,
        ));
        self.detected = self.scripted.clone();
    }

    fn detected_trackables(&self) -> Vec<DetectedTrackable> {
        self.detected.clone()
    }

    fn camera_matrix(&self) -> Matrix3<f64> {
        self.camera
            .map(|c| c.camera_matrix())
            .unwrap_or_else(Matrix3::identity)
    }
}

pub struct FakeArbitraryEngine {
    pub api_key: Option<String>,
    pub camera: Option<CameraParameters>,
    pub running: bool,
    pub start_pose: Option<(Vector3<f64>, UnitQuaternion<f64>)>,
    pub sensed: Vec<UnitQuaternion<f64>>,
    pub frames: Vec<(u32, u32, u32, u32, bool)>,
    /// Forces `is_tracking` regardless of `running`.
    pub force_tracking: Option<bool>,
    pub position: Vector3<f64>,
    pub orientation: UnitQuaternion<f64>,
}

impl Default for FakeArbitraryEngine {
    fn default() -> Self {
        Self {
            api_key: None,
            camera: None,
            running: false,
            start_pose: None,
            sensed: Vec::new(),
            frames: Vec::new(),
            force_tracking: None,
            position: Vector3::zeros(),
            orientation: UnitQuaternion::identity(),
        }
    }
}

impl ArbitraryTrackingEngine for FakeArbitraryEngine {
    fn set_api_key(&mut self, key: &str) -> Result<()> {
        if key == REJECTED_KEY {
            return Err(TrackingError::CredentialRejected(key.to_string()));
        }
        self.api_key = Some(key.to_string());
        Ok(())
    }

    fn set_camera_parameters(&mut self, parameters: &CameraParameters) {
        self.camera = Some(*parameters);
    }

    fn start(&mut self, position: &Vector3<f64>, orientation: &UnitQuaternion<f64>) {
        self.running = true;
        self.start_pose = Some((*position, *orientation));
        self.position = *position;
        self.orientation = *orientation;
    }

    fn stop(&mut self) {
        self.running = false;
    }

    fn set_sensed_orientation(&mut self, orientation: &UnitQuaternion<f64>) {
        self.sensed.push(*orientation);
    }

    fn process_frame(&mut self, frame: &FrameBuffer<'_>) {
        self.frames.push((
            frame.width,
            frame.height,
            frame.channels,
            frame.padding,
            frame.flip,
        ));
    }

    fn is_tracking(&self) -> bool {
        self.force_tracking.unwrap_or(self.running)
    }

    fn position(&self) -> Vector3<f64> {
        self.position
    }

    fn orientation(&self) -> UnitQuaternion<f64> {
        self.orientation
    }

    fn camera_matrix(&self) -> Matrix3<f64> {
        self.camera
            .map(|c| c.camera_matrix())
            .unwrap_or_else(Matrix3::identity)
    }
}
