//! Session ownership for hosts.
//!
//! Sessions are plain objects owned by the host. `TrackingContext` bundles
//! the image and arbitrary sessions for hosts that share them across
//! threads.

pub mod context;

pub use context::TrackingContext;
