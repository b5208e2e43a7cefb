use std::path::PathBuf;
use std::thread;

use anyhow::{Context, Result};
use crossbeam_channel::bounded;
use tracing::{info, warn};

use rust_ar_tracking::config::TrackingConfig;
use rust_ar_tracking::error::TrackingError;
use rust_ar_tracking::imu::OrientationSample;
use rust_ar_tracking::io::RecordedSession;
use rust_ar_tracking::io::image::{GrayFrame, load_grayscale, load_rgba};
use rust_ar_tracking::system::TrackingContext;
use rust_ar_tracking::tracking::{FrameBuffer, ProjectedFrame};

const FRAME_QUEUE_DEPTH: usize = 4;

struct LoadedFrame {
    index: usize,
    timestamp_ns: u64,
    image: GrayFrame,
    orientation: OrientationSample,
}

fn format_record(record: &[f32]) -> String {
    record
        .iter()
        .map(|v| format!("{:.2}", v))
        .collect::<Vec<_>>()
        .join(",")
}

/// Drop a frame's overlay when it cannot be projected; other errors are fatal.
fn skip_degenerate<T>(
    result: rust_ar_tracking::error::Result<Option<T>>,
    session: &str,
    timestamp_ns: u64,
) -> Result<Option<T>> {
    match result {
        Err(TrackingError::InvalidProjection { depth }) => {
            warn!(timestamp_ns, depth, "Skipping {} overlay: degenerate projection", session);
            Ok(None)
        }
        other => Ok(other?),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("rust_ar_tracking=info")
        .init();

    let mut args = std::env::args().skip(1);
    let recording_path = PathBuf::from(args.next().unwrap_or_else(|| "data/session".to_string()));
    let config_path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| recording_path.join("config.yaml"));

    let config = TrackingConfig::load(&config_path)?;
    info!("Loaded configuration from {}", config_path.display());

    let recording = RecordedSession::open(&recording_path)?;
    info!(
        "Loaded {} frames, {} targets from {}",
        recording.len(),
        recording.targets.len(),
        recording_path.display()
    );

    let ctx = TrackingContext::from_config(
        recording.image_engine(),
        recording.arbitrary_engine(),
        &config,
    )?;

    for target in &recording.targets {
        let bitmap = load_rgba(&recording.target_path(target))?;
        if !ctx.add_target(&bitmap, &target.name) {
            warn!("Target {} was not registered", target.name);
        }
    }
    let has_targets = !recording.targets.is_empty();

    let frame_paths = (0..recording.len())
        .map(|i| recording.frame_path(i).context("Frame index out of range"))
        .collect::<Result<Vec<_>>>()?;
    let frames = recording.frames.clone();

    let (tx, rx) = bounded::<Result<LoadedFrame>>(FRAME_QUEUE_DEPTH);
    let loader = thread::spawn(move || {
        for (index, (path, entry)) in frame_paths.iter().zip(frames).enumerate() {
            let loaded = load_grayscale(path).map(|image| LoadedFrame {
                index,
                timestamp_ns: entry.timestamp_ns,
                image,
                orientation: entry.orientation,
            });
            if tx.send(loaded).is_err() {
                break;
            }
        }
    });

    let mut arbitrary_started = false;
    for loaded in rx {
        let frame = loaded?;
        let image = &frame.image;
        let buffer = FrameBuffer::grayscale(&image.data, image.width, image.height, 0)?;

        let image_record =
            skip_degenerate(ctx.process_image_frame(&buffer), "image", frame.timestamp_ns)?;

        // Markerless tracking starts on the first detection, or right away
        // when the recording has no targets
        if !arbitrary_started && (image_record.is_some() || !has_targets) {
            ctx.start_arbitrary(has_targets)?;
            arbitrary_started = true;
            info!("Arbitrary tracking started at frame {}", frame.index);
        }

        let arbitrary_record = skip_degenerate(
            ctx.process_arbitrary_frame(frame.orientation, &image.data, image.width, image.height, 0),
            "arbitrary",
            frame.timestamp_ns,
        )?;

        if let Some(overlay) = image_record {
            let anchor = overlay.label_anchor();
            println!(
                "{} image {:?} [{}] label=({:.1},{:.1})",
                frame.timestamp_ns,
                ctx.image().overlay_primitive(),
                format_record(&overlay.to_flat()),
                anchor.x,
                anchor.y
            );
        }

        match arbitrary_record {
            Some(ProjectedFrame::Projected(overlay)) => println!(
                "{} arbitrary {:?} [{}]",
                frame.timestamp_ns,
                ctx.arbitrary().overlay_primitive(),
                format_record(&overlay.to_flat())
            ),
            Some(projected @ ProjectedFrame::PoseUnavailable) => println!(
                "{} arbitrary pose unavailable [{}]",
                frame.timestamp_ns,
                format_record(&projected.to_flat())
            ),
            None => {}
        }
    }

    if loader.join().is_err() {
        warn!("Frame loader thread panicked");
    }
    ctx.stop_arbitrary();

    info!("Done, processed {} frames", recording.len());
    Ok(())
}
