use std::path::Path;

use anyhow::{Context, Result, bail};
use opencv::core::Mat;
use opencv::prelude::*;
use opencv::{imgcodecs, imgproc};

use crate::tracking::RgbaBitmap;

/// Tightly packed 8-bit grayscale frame.
#[derive(Debug, Clone, PartialEq)]
pub struct GrayFrame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

fn read(path: &Path, flags: i32) -> Result<Mat> {
    let path_str = path
        .to_str()
        .with_context(|| format!("Non UTF-8 image path {:?}", path))?;
    let mat = imgcodecs::imread(path_str, flags)
        .with_context(|| format!("Failed to read image {:?}", path))?;
    if mat.empty() {
        bail!("Image {:?} is empty or unreadable", path);
    }
    Ok(mat)
}

fn packed_bytes(mat: &Mat) -> Result<Vec<u8>> {
    let bytes = if mat.is_continuous() {
        mat.data_bytes()?.to_vec()
    } else {
        mat.try_clone()?.data_bytes()?.to_vec()
    };
    Ok(bytes)
}

/// Load a camera frame as single-channel bytes.
pub fn load_grayscale(path: &Path) -> Result<GrayFrame> {
    let mat = read(path, imgcodecs::IMREAD_GRAYSCALE)?;
    Ok(GrayFrame {
        data: packed_bytes(&mat)?,
        width: mat.cols() as u32,
        height: mat.rows() as u32,
    })
}

/// Load an image target as an RGBA bitmap.
pub fn load_rgba(path: &Path) -> Result<RgbaBitmap> {
    let bgr = read(path, imgcodecs::IMREAD_COLOR)?;
    let mut rgba = Mat::default();
    imgproc::cvt_color(&bgr, &mut rgba, imgproc::COLOR_BGR2RGBA, 0)
        .with_context(|| format!("Failed to convert {:?} to RGBA", path))?;

    let bitmap = RgbaBitmap::new(rgba.cols() as u32, rgba.rows() as u32, packed_bytes(&rgba)?)?;
    Ok(bitmap)
}
