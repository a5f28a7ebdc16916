use ndarray::{Array2, ArrayView2};
use rayon::prelude::*;

use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::error::{MotionError, Result};

/// Per-pixel median over a set of images, ignoring NaN samples.
///
/// A pixel whose samples are all NaN stays NaN. With an even number of valid
/// samples the two middle values are averaged. Uses `select_nth_unstable` for
/// O(n) selection and parallelizes over rows for images >= 256x256.
pub fn nan_median_stack(images: &[ArrayView2<f32>]) -> Result<Array2<f32>> {
    let first = images.first().ok_or(MotionError::EmptySequence)?;
    let (h, w) = first.dim();
    for image in images {
        if image.dim() != (h, w) {
            return Err(MotionError::DimensionMismatch {
                expected_rows: h,
                expected_cols: w,
                rows: image.nrows(),
                cols: image.ncols(),
            });
        }
    }
    let n = images.len();

    let median_row = |row: usize, pixel_values: &mut Vec<f32>, out: &mut [f32]| {
        for (col, result) in out.iter_mut().enumerate() {
            pixel_values.clear();
            pixel_values.extend(
                images
                    .iter()
                    .map(|image| image[[row, col]])
                    .filter(|v| !v.is_nan()),
            );
            *result = nan_median(pixel_values);
        }
    };

    let mut result = Array2::<f32>::zeros((h, w));
    if h * w >= PARALLEL_PIXEL_THRESHOLD && n > 1 {
        let rows: Vec<Vec<f32>> = (0..h)
            .into_par_iter()
            .map(|row| {
                let mut pixel_values = Vec::with_capacity(n);
                let mut row_result = vec![0.0f32; w];
                median_row(row, &mut pixel_values, &mut row_result[..]);
                row_result
            })
            .collect();

        for (row, row_data) in rows.into_iter().enumerate() {
            for (col, val) in row_data.into_iter().enumerate() {
                result[[row, col]] = val;
            }
        }
    } else {
        let mut pixel_values = Vec::with_capacity(n);
        let mut row_result = vec![0.0f32; w];
        for row in 0..h {
            median_row(row, &mut pixel_values, &mut row_result[..]);
            for (col, &val) in row_result.iter().enumerate() {
                result[[row, col]] = val;
            }
        }
    }

    Ok(result)
}

/// Median of NaN-free samples; NaN when there are none.
pub fn nan_median(pixel_values: &mut [f32]) -> f32 {
    let n = pixel_values.len();
    if n == 0 {
        f32::NAN
    } else if n == 1 {
        pixel_values[0]
    } else if n % 2 == 1 {
        let mid = n / 2;
        *pixel_values
            .select_nth_unstable_by(mid, |a, b| a.total_cmp(b))
            .1
    } else {
        let mid = n / 2;
        pixel_values.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
        pixel_values[..mid].select_nth_unstable_by(mid - 1, |a, b| a.total_cmp(b));
        (pixel_values[mid - 1] + pixel_values[mid]) / 2.0
    }
}
