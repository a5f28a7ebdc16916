use ndarray::{Array2, ArrayView2, Zip};

use crate::consts::{CUBIC_KEYS_A, LANCZOS_TAPS, PARALLEL_PIXEL_THRESHOLD};
use crate::frame::Shift;
use crate::pipeline::config::Interpolation;

/// Move a frame by `shift`, with whole pixels or the configured kernel.
///
/// The output has the input's size; pixels without a source counterpart take
/// `fill`.
pub fn warp_frame(
    src: ArrayView2<f32>,
    shift: Shift,
    interpolation: Interpolation,
    fill: f32,
) -> Array2<f32> {
    if interpolation.is_subpixel() {
        shift_subpixel(src, shift, interpolation, fill)
    } else {
        shift_integer(src, shift, fill)
    }
}

/// `dst(r, c) = src(r - round(dy), c - round(dx))`, or `fill` out of range.
pub fn shift_integer(src: ArrayView2<f32>, shift: Shift, fill: f32) -> Array2<f32> {
    let (h, w) = src.dim();
    let d_row = shift.dy.round() as isize;
    let d_col = shift.dx.round() as isize;

    Array2::from_shape_fn((h, w), |(row, col)| {
        let src_row = row as isize - d_row;
        let src_col = col as isize - d_col;
        if src_row >= 0 && src_row < h as isize && src_col >= 0 && src_col < w as isize {
            src[[src_row as usize, src_col as usize]]
        } else {
            fill
        }
    })
}

/// Resample under a pure translation: `dst(x, y) = src(x - dx, y - dy)`.
///
/// Kernel taps that fall outside the source read `fill` (constant border).
/// The fractional part of the shift is the same for every pixel, so the 1-D
/// weights are computed once per axis and applied separably.
pub fn shift_subpixel(
    src: ArrayView2<f32>,
    shift: Shift,
    interpolation: Interpolation,
    fill: f32,
) -> Array2<f32> {
    let (h, w) = src.dim();
    let col_taps = AxisTaps::new(-shift.dx, interpolation);
    let row_taps = AxisTaps::new(-shift.dy, interpolation);
    let fill = fill as f64;

    // Horizontal pass over every source row.
    let mut horizontal = Array2::<f64>::zeros((h, w));
    let row_pass = |(row, col): (usize, usize), out: &mut f64| {
        *out = col_taps.apply(col, w, fill, |c| src[[row, c]] as f64);
    };
    // Vertical pass; rows outside the source are entirely `fill`.
    let mut result = Array2::<f32>::zeros((h, w));

    if h * w >= PARALLEL_PIXEL_THRESHOLD {
        Zip::indexed(&mut horizontal).par_for_each(row_pass);
        Zip::indexed(&mut result).par_for_each(|(row, col), out| {
            *out = row_taps.apply(row, h, fill, |r| horizontal[[r, col]]) as f32;
        });
    } else {
        Zip::indexed(&mut horizontal).for_each(row_pass);
        Zip::indexed(&mut result).for_each(|(row, col), out| {
            *out = row_taps.apply(row, h, fill, |r| horizontal[[r, col]]) as f32;
        });
    }

    result
}

/// Source offsets and weights for a uniform 1-D translation.
struct AxisTaps {
    /// Source index offset of the first tap relative to the destination index.
    first: isize,
    weights: Vec<f64>,
}

impl AxisTaps {
    /// Taps sampling the source at `dst + t`.
    fn new(t: f64, interpolation: Interpolation) -> Self {
        let base = t.floor();
        let frac = t - base;
        let base = base as isize;

        match interpolation {
            Interpolation::Disabled | Interpolation::Nearest => Self {
                first: base + if frac >= 0.5 { 1 } else { 0 },
                weights: vec![1.0],
            },
            // A unit box average over piecewise-constant pixels reduces to
            // linear weights under translation.
            Interpolation::Linear | Interpolation::Area => Self {
                first: base,
                weights: vec![1.0 - frac, frac],
            },
            Interpolation::Cubic => Self {
                first: base - 1,
                weights: (-1..=2).map(|k| keys_cubic(k as f64 - frac)).collect(),
            },
            Interpolation::Lanczos4 => {
                let a = LANCZOS_TAPS as isize;
                let raw: Vec<f64> = (1 - a..=a)
                    .map(|k| lanczos(k as f64 - frac, LANCZOS_TAPS as f64))
                    .collect();
                let total: f64 = raw.iter().sum();
                Self {
                    first: base + 1 - a,
                    weights: raw.into_iter().map(|v| v / total).collect(),
                }
            }
        }
    }

    fn apply<F>(&self, dst: usize, len: usize, fill: f64, sample: F) -> f64
    where
        F: Fn(usize) -> f64,
    {
        let start = dst as isize + self.first;
        self.weights
            .iter()
            .enumerate()
            .map(|(k, &weight)| {
                let idx = start + k as isize;
                let value = if idx >= 0 && idx < len as isize {
                    sample(idx as usize)
                } else {
                    fill
                };
                weight * value
            })
            .sum()
    }
}

fn keys_cubic(x: f64) -> f64 {
    let a = CUBIC_KEYS_A;
    let x = x.abs();
    if x <= 1.0 {
        ((a + 2.0) * x - (a + 3.0)) * x * x + 1.0
    } else if x < 2.0 {
        ((a * x - 5.0 * a) * x + 8.0 * a) * x - 4.0 * a
    } else {
        0.0
    }
}

fn lanczos(x: f64, a: f64) -> f64 {
    if x.abs() < 1e-12 {
        return 1.0;
    }
    if x.abs() >= a {
        return 0.0;
    }
    let px = std::f64::consts::PI * x;
    a * px.sin() * (px / a).sin() / (px * px)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_cubic_interpolates_samples() {
        assert!((keys_cubic(0.0) - 1.0).abs() < 1e-12);
        assert!(keys_cubic(1.0).abs() < 1e-12);
        assert!(keys_cubic(2.0).abs() < 1e-12);
    }

    #[test]
    fn test_kernel_weights_sum_to_one() {
        for interpolation in [
            Interpolation::Linear,
            Interpolation::Cubic,
            Interpolation::Lanczos4,
        ] {
            for frac in [0.0, 0.25, 0.5, 0.9] {
                let taps = AxisTaps::new(3.0 + frac, interpolation);
                let total: f64 = taps.weights.iter().sum();
                assert!((total - 1.0).abs() < 1e-9, "{interpolation:?} at {frac}");
            }
        }
    }

    #[test]
    fn test_nearest_rounds_half_up() {
        assert_eq!(AxisTaps::new(0.5, Interpolation::Nearest).first, 1);
        assert_eq!(AxisTaps::new(-0.6, Interpolation::Nearest).first, -1);
        assert_eq!(AxisTaps::new(-0.4, Interpolation::Nearest).first, 0);
    }
}
