//! Recorded tracking sessions and engines that replay them.
//!
//! A recording directory contains:
//!
//! ```text
//! frames.csv           timestamp_ns, filename, qw, qx, qy, qz
//! frames/              grayscale frame images
//! targets.csv          name, filename            (optional)
//! image_poses.csv      timestamp_ns, name, width, height, px, py, pz, qw, qx, qy, qz
//! arbitrary_poses.csv  timestamp_ns, tracking, px, py, pz, qw, qx, qy, qz
//! ```
//!
//! Both pose logs are optional. `frames.csv` carries the inertial
//! orientation sample (w-first) for each frame. Lines starting with `#` are
//! comments.
//!
//! The replay engines implement the engine traits by returning the logged
//! poses in frame order, so the sessions can be driven end to end without
//! the proprietary engine.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord};
use nalgebra::{Matrix3, UnitQuaternion, Vector3};
use tracing::{debug, warn};

use crate::error::TrackingError;
use crate::geometry::Pose;
use crate::imu::OrientationSample;
use crate::tracking::camera::CameraParameters;
use crate::tracking::engine::{
    ArbitraryTrackingEngine, DetectedTrackable, FrameBuffer, ImageTrackingEngine, TargetImage,
};

#[derive(Debug, Clone, PartialEq)]
pub struct FrameEntry {
    pub timestamp_ns: u64,
    pub filename: String,
    pub orientation: OrientationSample,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TargetEntry {
    pub name: String,
    pub filename: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArbitraryPoseEntry {
    pub tracking: bool,
    pub pose: Pose,
}

#[derive(Debug)]
pub struct RecordedSession {
    root: PathBuf,
    pub frames: Vec<FrameEntry>,
    pub targets: Vec<TargetEntry>,
    pub image_poses: BTreeMap<u64, Vec<DetectedTrackable>>,
    pub arbitrary_poses: BTreeMap<u64, ArbitraryPoseEntry>,
}

impl RecordedSession {
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let frames = load_frame_list(&root.join("frames.csv"))?;

        let targets = load_optional(&root.join("targets.csv"), load_target_list)?;
        let image_poses = load_optional(&root.join("image_poses.csv"), load_image_poses)?;
        let arbitrary_poses =
            load_optional(&root.join("arbitrary_poses.csv"), load_arbitrary_poses)?;

        Ok(Self {
            root,
            frames,
            targets,
            image_poses,
            arbitrary_poses,
        })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frame_path(&self, idx: usize) -> Option<PathBuf> {
        self.frames
            .get(idx)
            .map(|f| self.root.join("frames").join(&f.filename))
    }

    pub fn target_path(&self, target: &TargetEntry) -> PathBuf {
        self.root.join(&target.filename)
    }

    pub fn timestamps(&self) -> Vec<u64> {
        self.frames.iter().map(|f| f.timestamp_ns).collect()
    }

    pub fn image_engine(&self) -> ReplayImageEngine {
        ReplayImageEngine::new(self.timestamps(), self.image_poses.clone())
    }

    pub fn arbitrary_engine(&self) -> ReplayArbitraryEngine {
        ReplayArbitraryEngine::new(self.timestamps(), self.arbitrary_poses.clone())
    }
}

fn load_optional<T: Default>(path: &Path, load: fn(&Path) -> Result<T>) -> Result<T> {
    if path.exists() {
        load(path)
    } else {
        debug!("{} not present, skipping", path.display());
        Ok(T::default())
    }
}

fn records(csv_path: &Path) -> Result<Vec<StringRecord>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .comment(Some(b'#'))
        .flexible(true)
        .from_path(csv_path)
        .with_context(|| format!("Failed to open {}", csv_path.display()))?;

    let mut out = Vec::new();
    for rec in rdr.records() {
        out.push(rec.with_context(|| format!("Malformed row in {}", csv_path.display()))?);
    }
    Ok(out)
}

fn field<T: std::str::FromStr>(rec: &StringRecord, idx: usize) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = rec
        .get(idx)
        .with_context(|| format!("Missing column {}", idx))?;
    raw.trim()
        .parse()
        .with_context(|| format!("Could not parse column {} ({:?})", idx, raw))
}

/// Pose from `px, py, pz, qw, qx, qy, qz` starting at column `start`.
fn pose_at(rec: &StringRecord, start: usize) -> Result<Pose> {
    let position = Vector3::new(
        field(rec, start)?,
        field(rec, start + 1)?,
        field(rec, start + 2)?,
    );
    Ok(Pose::from_quaternion(
        field(rec, start + 3)?,
        field(rec, start + 4)?,
        field(rec, start + 5)?,
        field(rec, start + 6)?,
        position,
    ))
}

fn load_frame_list(csv_path: &Path) -> Result<Vec<FrameEntry>> {
    let mut entries = Vec::new();
    for rec in records(csv_path)? {
        if rec.len() < 6 {
            warn!("Skipping short frame row in {}", csv_path.display());
            continue;
        }
        entries.push(FrameEntry {
            timestamp_ns: field(&rec, 0)?,
            filename: rec[1].trim().to_string(),
            orientation: OrientationSample::from_sensor([
                field(&rec, 2)?,
                field(&rec, 3)?,
                field(&rec, 4)?,
                field(&rec, 5)?,
            ]),
        });
    }
    Ok(entries)
}

fn load_target_list(csv_path: &Path) -> Result<Vec<TargetEntry>> {
    let mut entries = Vec::new();
    for rec in records(csv_path)? {
        if rec.len() < 2 {
            continue;
        }
        entries.push(TargetEntry {
            name: rec[0].trim().to_string(),
            filename: rec[1].trim().to_string(),
        });
    }
    Ok(entries)
}

fn load_image_poses(csv_path: &Path) -> Result<BTreeMap<u64, Vec<DetectedTrackable>>> {
    let mut poses: BTreeMap<u64, Vec<DetectedTrackable>> = BTreeMap::new();
    for rec in records(csv_path)? {
        if rec.len() < 11 {
            continue;
        }
        let ts: u64 = field(&rec, 0)?;
        poses.entry(ts).or_default().push(DetectedTrackable {
            name: rec[1].trim().to_string(),
            width: field(&rec, 2)?,
            height: field(&rec, 3)?,
            pose: pose_at(&rec, 4)?,
        });
    }
    Ok(poses)
}

fn load_arbitrary_poses(csv_path: &Path) -> Result<BTreeMap<u64, ArbitraryPoseEntry>> {
    let mut poses = BTreeMap::new();
    for rec in records(csv_path)? {
        if rec.len() < 9 {
            continue;
        }
        let ts: u64 = field(&rec, 0)?;
        let tracking: u8 = field(&rec, 1)?;
        poses.insert(
            ts,
            ArbitraryPoseEntry {
                tracking: tracking != 0,
                pose: pose_at(&rec, 2)?,
            },
        );
    }
    Ok(poses)
}

/// Engine-side handle for a registered replay target.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayTrackable {
    pub name: String,
}

/// Image engine returning the logged detections of registered targets.
pub struct ReplayImageEngine {
    timestamps: Vec<u64>,
    detections: BTreeMap<u64, Vec<DetectedTrackable>>,
    registered: HashSet<String>,
    camera: Option<CameraParameters>,
    max_tracking: usize,
    cursor: usize,
    current: Vec<DetectedTrackable>,
}

impl ReplayImageEngine {
    pub fn new(timestamps: Vec<u64>, detections: BTreeMap<u64, Vec<DetectedTrackable>>) -> Self {
        Self {
            timestamps,
            detections,
            registered: HashSet::new(),
            camera: None,
            max_tracking: 1,
            cursor: 0,
            current: Vec::new(),
        }
    }
}

impl ImageTrackingEngine for ReplayImageEngine {
    type Trackable = ReplayTrackable;

    fn set_api_key(&mut self, key: &str) -> crate::error::Result<()> {
        if key.trim().is_empty() {
            return Err(TrackingError::CredentialRejected("empty key".to_string()));
        }
        Ok(())
    }

    fn set_camera_parameters(&mut self, parameters: &CameraParameters) {
        self.camera = Some(*parameters);
    }

    fn set_maximum_simultaneous_tracking(&mut self, count: usize) {
        self.max_tracking = count;
    }

    fn create_trackable(&self, image: &TargetImage<'_>, name: &str) -> Option<ReplayTrackable> {
        let needed = image.width as usize * image.height as usize * image.channels as usize;
        if image.pixels.len() < needed || name.is_empty() {
            return None;
        }
        Some(ReplayTrackable {
            name: name.to_string(),
        })
    }

    fn add_trackable(&mut self, trackable: ReplayTrackable) -> bool {
        self.registered.insert(trackable.name)
    }

    fn process_frame(&mut self, _frame: &FrameBuffer<'_>) {
        let Some(ts) = self.timestamps.get(self.cursor).copied() else {
            self.current.clear();
            return;
        };
        self.cursor += 1;

        self.current = self
            .detections
            .get(&ts)
            .map(|list| {
                list.iter()
                    .filter(|d| self.registered.contains(&d.name))
                    .take(self.max_tracking)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
    }

    fn detected_trackables(&self) -> Vec<DetectedTrackable> {
        self.current.clone()
    }

    fn camera_matrix(&self) -> Matrix3<f64> {
        self.camera
            .map(|c| c.camera_matrix())
            .unwrap_or_else(Matrix3::identity)
    }
}

/// Markerless engine returning the logged pose while started.
pub struct ReplayArbitraryEngine {
    timestamps: Vec<u64>,
    poses: BTreeMap<u64, ArbitraryPoseEntry>,
    camera: Option<CameraParameters>,
    running: bool,
    sensed: Option<UnitQuaternion<f64>>,
    cursor: usize,
    current: Option<ArbitraryPoseEntry>,
}

impl ReplayArbitraryEngine {
    pub fn new(timestamps: Vec<u64>, poses: BTreeMap<u64, ArbitraryPoseEntry>) -> Self {
        Self {
            timestamps,
            poses,
            camera: None,
            running: false,
            sensed: None,
            cursor: 0,
            current: None,
        }
    }
}

impl ArbitraryTrackingEngine for ReplayArbitraryEngine {
    fn set_api_key(&mut self, key: &str) -> crate::error::Result<()> {
        if key.trim().is_empty() {
            return Err(TrackingError::CredentialRejected("empty key".to_string()));
        }
        Ok(())
    }

    fn set_camera_parameters(&mut self, parameters: &CameraParameters) {
        self.camera = Some(*parameters);
    }

    fn start(&mut self, position: &Vector3<f64>, orientation: &UnitQuaternion<f64>) {
        self.running = true;
        self.current = Some(ArbitraryPoseEntry {
            tracking: false,
            pose: Pose::new(*position, *orientation),
        });
    }

    fn stop(&mut self) {
        self.running = false;
        self.current = None;
    }

    fn set_sensed_orientation(&mut self, orientation: &UnitQuaternion<f64>) {
        self.sensed = Some(*orientation);
    }

    fn process_frame(&mut self, _frame: &FrameBuffer<'_>) {
        // The log advances with every frame, started or not
        let ts = self.timestamps.get(self.cursor).copied();
        self.cursor += 1;

        if !self.running {
            return;
        }
        if let Some(entry) = ts.and_then(|ts| self.poses.get(&ts)) {
            self.current = Some(*entry);
        }
    }

    fn is_tracking(&self) -> bool {
        self.running && self.current.is_some_and(|c| c.tracking)
    }

    fn position(&self) -> Vector3<f64> {
        self.current
            .map(|c| c.pose.position)
            .unwrap_or_else(Vector3::zeros)
    }

    fn orientation(&self) -> UnitQuaternion<f64> {
        // No sensed orientation, no orientation output
        match (self.sensed, self.current) {
            (Some(_), Some(c)) => c.pose.orientation,
            _ => UnitQuaternion::identity(),
        }
    }

    fn camera_matrix(&self) -> Matrix3<f64> {
        self.camera
            .map(|c| c.camera_matrix())
            .unwrap_or_else(Matrix3::identity)
    }
}
