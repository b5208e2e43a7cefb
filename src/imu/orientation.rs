use nalgebra::{Quaternion, UnitQuaternion, Vector4};

/// Orientation estimate from the device's inertial sensors.
///
/// Sensors deliver the components w-first `(w, x, y, z)`; the tracking
/// engine takes them scalar-last `(x, y, z, w)`. The sample is expected to
/// be a unit quaternion and is never renormalized here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientationSample {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl OrientationSample {
    pub fn new(w: f32, x: f32, y: f32, z: f32) -> Self {
        Self { w, x, y, z }
    }

    /// Build from a raw sensor array ordered `(w, x, y, z)`.
    pub fn from_sensor(sample: [f32; 4]) -> Self {
        Self::new(sample[0], sample[1], sample[2], sample[3])
    }

    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0)
    }

    /// Components in engine order `(x, y, z, w)`.
    pub fn engine_order(&self) -> [f32; 4] {
        [self.x, self.y, self.z, self.w]
    }

    pub fn to_quaternion(&self) -> UnitQuaternion<f64> {
        // nalgebra stores quaternion coordinates in engine order
        let coords = Vector4::from(self.engine_order()).cast::<f64>();
        UnitQuaternion::new_unchecked(Quaternion::from_vector(coords))
    }
}

impl From<[f32; 4]> for OrientationSample {
    fn from(sample: [f32; 4]) -> Self {
        Self::from_sensor(sample)
    }
}
