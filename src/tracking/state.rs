//! Per-session state reported alongside frame results.

/// Outcome of the image engine's detection on the last processed frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionState {
    /// Nothing detected (or no frame processed yet).
    None,
    /// Exactly one target detected; only this case is projected.
    Single,
    /// Several targets at once, suppressed.
    Multiple(usize),
}

impl DetectionState {
    pub fn from_count(count: usize) -> Self {
        match count {
            0 => Self::None,
            1 => Self::Single,
            n => Self::Multiple(n),
        }
    }
}

impl Default for DetectionState {
    fn default() -> Self {
        Self::None
    }
}

/// Lifecycle of the markerless tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArbitraryState {
    /// Never started, or stopped; may be started again.
    Stopped,
    /// Started from a seed pose.
    Running,
}

impl Default for ArbitraryState {
    fn default() -> Self {
        Self::Stopped
    }
}
