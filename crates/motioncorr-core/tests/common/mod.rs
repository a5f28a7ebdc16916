#![allow(dead_code)]

use ndarray::Array2;

use motioncorr_core::frame::FrameStack;
use motioncorr_core::io::ser::SER_HEADER_SIZE;

/// Smooth, non-repeating test scene: a gentle ramp plus two blobs of
/// different width, so no translation maps it onto itself.
pub fn pattern(rows: usize, cols: usize) -> Array2<f32> {
    let blob = |r: f64, c: f64, cr: f64, cc: f64, sigma: f64| {
        (-((r - cr).powi(2) + (c - cc).powi(2)) / (2.0 * sigma * sigma)).exp()
    };
    let (h, w) = (rows as f64, cols as f64);
    Array2::from_shape_fn((rows, cols), |(r, c)| {
        let (r, c) = (r as f64, c as f64);
        let value = 20.0
            + 0.5 * r
            + 0.3 * c
            + 50.0 * blob(r, c, 0.3 * h, 0.6 * w, 3.0)
            + 30.0 * blob(r, c, 0.7 * h, 0.35 * w, 2.0);
        value as f32
    })
}

/// Gaussian spot centred at (`cx`, `cy`) on a zero background.
pub fn gaussian_blob(rows: usize, cols: usize, cx: f64, cy: f64, sigma: f64) -> Array2<f32> {
    Array2::from_shape_fn((rows, cols), |(r, c)| {
        let d2 = (c as f64 - cx).powi(2) + (r as f64 - cy).powi(2);
        (100.0 * (-d2 / (2.0 * sigma * sigma)).exp()) as f32
    })
}

/// Move the content of `base` by whole pixels: `out(x, y) = base(x - dx, y - dy)`.
pub fn translate(base: &Array2<f32>, dx: isize, dy: isize, fill: f32) -> Array2<f32> {
    let (h, w) = base.dim();
    Array2::from_shape_fn((h, w), |(r, c)| {
        let sr = r as isize - dy;
        let sc = c as isize - dx;
        if sr >= 0 && sr < h as isize && sc >= 0 && sc < w as isize {
            base[[sr as usize, sc as usize]]
        } else {
            fill
        }
    })
}

pub fn stack_of(frames: &[Array2<f32>]) -> FrameStack {
    let (h, w) = frames[0].dim();
    let samples: Vec<f32> = frames.iter().flat_map(|f| f.iter().copied()).collect();
    FrameStack::from_raw(&samples, frames.len(), h, w).expect("valid stack")
}

/// Build a SER file header with configurable bit depth and color mode.
pub fn build_ser_header_full(
    width: u32,
    height: u32,
    bit_depth: u32,
    num_frames: usize,
    color_id: i32,
) -> Vec<u8> {
    let mut buf = Vec::with_capacity(SER_HEADER_SIZE);

    buf.extend_from_slice(b"LUCAM-RECORDER");
    // LuID
    buf.extend_from_slice(&0i32.to_le_bytes());
    buf.extend_from_slice(&color_id.to_le_bytes());
    // LittleEndian = 0 (little-endian)
    buf.extend_from_slice(&0i32.to_le_bytes());
    buf.extend_from_slice(&(width as i32).to_le_bytes());
    buf.extend_from_slice(&(height as i32).to_le_bytes());
    buf.extend_from_slice(&(bit_depth as i32).to_le_bytes());
    buf.extend_from_slice(&(num_frames as i32).to_le_bytes());
    // Observer, Instrument, Telescope
    buf.extend_from_slice(&[0u8; 120]);
    // DateTime, DateTimeUTC
    buf.extend_from_slice(&[0u8; 16]);

    assert_eq!(buf.len(), SER_HEADER_SIZE);
    buf
}

/// Write a SER buffer to a temporary file and return the temp file handle.
///
/// The file stays alive as long as the returned `NamedTempFile` is not dropped.
pub fn write_test_ser(data: &[u8]) -> tempfile::NamedTempFile {
    use std::io::Write;
    let mut f = tempfile::NamedTempFile::new().expect("create temp file");
    f.write_all(data).expect("write SER data");
    f.flush().expect("flush");
    f
}
