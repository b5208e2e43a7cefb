//! Per-frame results handed back to the host.
//!
//! Internally a result is a named overlay (centre + four corners). The flat
//! 10-float record the host expects is produced only at the boundary:
//!
//! ```text
//! [cx, cy, c00x, c00y, c01x, c01y, c11x, c11y, c10x, c10y]
//! ```

use nalgebra::Point2;

/// Number of floats in a flattened frame record.
pub const FRAME_RECORD_LEN: usize = 10;

/// Index of each corner in [`FrameOverlay::corners`].
///
/// Corners are listed cyclically around the object's local XY plane:
/// (-,-), (-,+), (+,+), (+,-).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    BottomLeft = 0,
    TopLeft = 1,
    TopRight = 2,
    BottomRight = 3,
}

/// Projected outline of a tracked object in screen space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameOverlay {
    pub center: Point2<f32>,
    pub corners: [Point2<f32>; 4],
}

impl FrameOverlay {
    pub fn corner(&self, corner: Corner) -> Point2<f32> {
        self.corners[corner as usize]
    }

    /// Flatten to the host's 10-float layout.
    pub fn to_flat(&self) -> [f32; FRAME_RECORD_LEN] {
        let mut out = [0.0; FRAME_RECORD_LEN];
        out[0] = self.center.x;
        out[1] = self.center.y;
        for (i, c) in self.corners.iter().enumerate() {
            out[2 + 2 * i] = c.x;
            out[3 + 2 * i] = c.y;
        }
        out
    }

    /// Where the host centres the overlay label: midway along the
    /// bottom-left/top-right diagonal.
    pub fn label_anchor(&self) -> Point2<f32> {
        midpoint(
            &self.corner(Corner::BottomLeft),
            &self.corner(Corner::TopRight),
        )
    }

    /// Two segments joining opposite edge midpoints, splitting the outline
    /// into a 2x2 grid.
    pub fn grid_lines(&self) -> [(Point2<f32>, Point2<f32>); 2] {
        let [c00, c01, c11, c10] = self.corners;
        [
            (midpoint(&c00, &c01), midpoint(&c11, &c10)),
            (midpoint(&c00, &c10), midpoint(&c01, &c11)),
        ]
    }
}

fn midpoint(a: &Point2<f32>, b: &Point2<f32>) -> Point2<f32> {
    Point2::new((a.x + b.x) * 0.5, (a.y + b.y) * 0.5)
}

/// Result of an arbitrary-tracking frame in which the engine reports tracking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProjectedFrame {
    Projected(FrameOverlay),
    /// Engine claims to track but has no pose yet (zero position).
    PoseUnavailable,
}

impl ProjectedFrame {
    /// Flatten to the host's 10-float layout; `PoseUnavailable` is all zeros.
    pub fn to_flat(&self) -> [f32; FRAME_RECORD_LEN] {
        match self {
            Self::Projected(overlay) => overlay.to_flat(),
            Self::PoseUnavailable => [0.0; FRAME_RECORD_LEN],
        }
    }

    pub fn overlay(&self) -> Option<&FrameOverlay> {
        match self {
            Self::Projected(overlay) => Some(overlay),
            Self::PoseUnavailable => None,
        }
    }
}

/// Overlay shape the host draws for a session kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayPrimitive {
    /// Outline of a detected image target.
    Rectangle,
    /// Outline with an interior grid for markerless tracking.
    Grid,
}
