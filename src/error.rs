//! Error type shared by the tracking sessions.
//!
//! Normal absence of a detection is never an error: sessions return
//! `Ok(None)` for that. Errors are reserved for rejected configuration,
//! violated preconditions and degenerate projections.

use thiserror::Error;

/// Errors raised by projection and the tracking sessions.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackingError {
    /// The engine refused the API credential.
    #[error("API credential rejected: {0}")]
    CredentialRejected(String),

    /// A frame buffer is too small for the declared geometry.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// Bitmap info could not be read or its pixels could not be locked.
    #[error("pixel source unavailable: {0}")]
    PixelSource(String),

    /// Seeding from an image target was requested but none is detected.
    #[error("image trackable not detected")]
    TargetNotDetected,

    /// The projected point lies on the camera plane (homogeneous z of zero).
    #[error("point cannot be projected: homogeneous depth is {depth}")]
    InvalidProjection { depth: f64 },
}

pub type Result<T> = std::result::Result<T, TrackingError>;
