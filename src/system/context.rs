//! Host-owned container for the two tracking sessions.
//!
//! Each session is mutated in place by every call, so hosts that call in
//! from several threads must serialize access per session. The context puts
//! each session behind its own lock; the two sessions stay independent
//! except for the one-off read of the image detection when markerless
//! tracking is seeded from it.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use tracing::debug;

use crate::config::TrackingConfig;
use crate::error::Result;
use crate::imu::OrientationSample;
use crate::tracking::{
    ArbitrarySeed, ArbitraryTrackerSession, ArbitraryTrackingEngine, FrameBuffer, FrameOverlay,
    ImageTrackerSession, ImageTrackingEngine, PixelSource, ProjectedFrame,
};

pub struct TrackingContext<E: ImageTrackingEngine, A: ArbitraryTrackingEngine> {
    image: Mutex<ImageTrackerSession<E>>,
    arbitrary: Mutex<ArbitraryTrackerSession<A>>,
}

impl<E: ImageTrackingEngine, A: ArbitraryTrackingEngine> TrackingContext<E, A> {
    pub fn new(image: ImageTrackerSession<E>, arbitrary: ArbitraryTrackerSession<A>) -> Arc<Self> {
        Arc::new(Self {
            image: Mutex::new(image),
            arbitrary: Mutex::new(arbitrary),
        })
    }

    /// Initialise both sessions from one configuration.
    pub fn from_config(
        image_engine: E,
        arbitrary_engine: A,
        config: &TrackingConfig,
    ) -> Result<Arc<Self>> {
        let image = ImageTrackerSession::from_config(image_engine, config)?;
        let arbitrary = ArbitraryTrackerSession::from_config(arbitrary_engine, config)?;
        Ok(Self::new(image, arbitrary))
    }

    pub fn add_target(&self, bitmap: &impl PixelSource, name: &str) -> bool {
        self.image.lock().add_target(bitmap, name)
    }

    pub fn process_image_frame(&self, frame: &FrameBuffer<'_>) -> Result<Option<FrameOverlay>> {
        self.image.lock().process_frame(frame)
    }

    /// Start markerless tracking, seeded from the currently detected image
    /// target or from the default pose.
    pub fn start_arbitrary(&self, seed_from_image_target: bool) -> Result<()> {
        if seed_from_image_target {
            let image = self.image.lock();
            let seed = ArbitrarySeed::from_image_session(&*image)?;
            // Never hold both locks at once
            drop(image);
            debug!(scale = seed.scale, "Seeding arbitrary tracker from image target");
            self.arbitrary.lock().start(seed);
        } else {
            self.arbitrary.lock().start_from_default();
        }
        Ok(())
    }

    pub fn stop_arbitrary(&self) {
        self.arbitrary.lock().stop();
    }

    pub fn process_arbitrary_frame(
        &self,
        orientation: OrientationSample,
        pixels: &[u8],
        width: u32,
        height: u32,
        padding: u32,
    ) -> Result<Option<ProjectedFrame>> {
        self.arbitrary
            .lock()
            .process_frame_with_orientation(orientation, pixels, width, height, padding)
    }

    /// Exclusive access to the image session.
    pub fn image(&self) -> MutexGuard<'_, ImageTrackerSession<E>> {
        self.image.lock()
    }

    /// Exclusive access to the arbitrary session.
    pub fn arbitrary(&self) -> MutexGuard<'_, ArbitraryTrackerSession<A>> {
        self.arbitrary.lock()
    }
}
