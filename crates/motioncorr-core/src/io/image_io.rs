use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage, ImageBuffer, ImageFormat, Luma};
use ndarray::{Array2, ArrayView2};
use tracing::debug;

use crate::error::{MotionError, Result};
use crate::frame::{Frame, FrameStack};

const SEQUENCE_EXTENSIONS: [&str; 6] = ["tif", "tiff", "png", "bmp", "jpg", "jpeg"];

/// Save an image as 16-bit grayscale TIFF.
///
/// Sample values are written as-is, rounded and clamped to `0..=65535`;
/// NaN becomes 0.
pub fn save_tiff(image: ArrayView2<f32>, path: &Path) -> Result<()> {
    let (h, w) = image.dim();
    let pixels: Vec<u16> = image
        .iter()
        .map(|&v| if v.is_nan() { 0 } else { v.round().clamp(0.0, 65535.0) as u16 })
        .collect();

    let img = ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(w as u32, h as u32, pixels)
        .ok_or(MotionError::InvalidDimensions {
            width: w as u32,
            height: h as u32,
        })?;
    img.save_with_format(path, ImageFormat::Tiff)?;
    Ok(())
}

/// Save an image as 8-bit grayscale PNG, stretched from its finite minimum
/// to its finite maximum.
pub fn save_png(image: ArrayView2<f32>, path: &Path) -> Result<()> {
    let (h, w) = image.dim();
    let (lo, hi) = image
        .iter()
        .filter(|v| v.is_finite())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let span = if hi > lo { hi - lo } else { 1.0 };

    let mut img = GrayImage::new(w as u32, h as u32);
    for ((row, col), &v) in image.indexed_iter() {
        let level = if v.is_finite() {
            ((v - lo) / span * 255.0).round().clamp(0.0, 255.0) as u8
        } else {
            0
        };
        img.put_pixel(col as u32, row as u32, Luma([level]));
    }

    img.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

/// Save an image, choosing format from file extension.
pub fn save_image(image: ArrayView2<f32>, path: &Path) -> Result<()> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("png") => save_png(image, path),
        _ => save_tiff(image, path),
    }
}

/// Load a grayscale image file into a Frame, keeping its sample values.
///
/// 8- and 16-bit grayscale images keep their integer levels; anything else is
/// converted to floating-point luminance.
pub fn load_image(path: &Path) -> Result<Frame> {
    let img = image::open(path)?;
    let frame = match img {
        DynamicImage::ImageLuma8(gray) => Frame::new(to_array(&gray), 8),
        DynamicImage::ImageLuma16(gray) => Frame::new(to_array(&gray), 16),
        other => Frame::new(to_array(&other.to_luma32f()), 32),
    };
    Ok(frame)
}

fn to_array<P>(gray: &ImageBuffer<Luma<P>, Vec<P>>) -> Array2<f32>
where
    P: image::Primitive + Into<f64>,
    Luma<P>: image::Pixel<Subpixel = P>,
{
    let (w, h) = gray.dimensions();
    Array2::from_shape_fn((h as usize, w as usize), |(row, col)| {
        let value: f64 = gray.get_pixel(col as u32, row as u32).0[0].into();
        value as f32
    })
}

/// Image files in `dir` that form a sequence, ordered by file name.
pub fn list_sequence(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| SEQUENCE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        })
        .collect();
    paths.sort();
    Ok(paths)
}

/// Load every image of a directory, in file-name order, as one stack.
pub fn load_image_sequence(dir: &Path) -> Result<FrameStack> {
    let paths = list_sequence(dir)?;
    debug!(files = paths.len(), dir = %dir.display(), "Loading image sequence");
    let frames = paths
        .iter()
        .map(|path| load_image(path))
        .collect::<Result<Vec<_>>>()?;
    FrameStack::from_frames(&frames)
}
