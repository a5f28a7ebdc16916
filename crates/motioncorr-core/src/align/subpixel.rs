use ndarray::Array2;

use crate::frame::Shift;

use super::metric::SearchRadius;
use super::optimum::SurfaceOptimum;

/// Fractional peak position from three samples of a Gaussian-shaped peak.
///
/// Fits a parabola through the logarithms of the samples at -1, 0 and +1 and
/// returns the vertex position. Returns 0 when the fit is undefined: a missing
/// neighbour (pass NaN), non-positive samples, or a flat fit.
pub fn gaussian_peak_offset(minus: f64, center: f64, plus: f64) -> f64 {
    let ln_minus = minus.ln();
    let ln_center = center.ln();
    let ln_plus = plus.ln();

    let peak = (ln_minus - ln_plus) / (2.0 * ln_minus - 4.0 * ln_center + 2.0 * ln_plus);
    if peak.is_finite() {
        peak
    } else {
        0.0
    }
}

/// Convert the selected surface cell into the shift that corrects the frame.
///
/// With `subpixel` the integer offset is refined independently per axis by
/// [`gaussian_peak_offset`]; neighbours outside the surface count as missing.
pub fn refine_shift(
    surface: &Array2<f64>,
    optimum: &SurfaceOptimum,
    radius: SearchRadius,
    subpixel: bool,
) -> Shift {
    let (ox, oy) = optimum.offset(radius);
    if !subpixel {
        return Shift::new(-(ox as f64), -(oy as f64));
    }

    let (h, w) = surface.dim();
    let (row, col) = (optimum.row, optimum.col);
    let at = |r: Option<usize>, c: Option<usize>| match (r, c) {
        (Some(r), Some(c)) if r < h && c < w => surface[[r, c]],
        _ => f64::NAN,
    };

    let center = surface[[row, col]];
    let x_peak = gaussian_peak_offset(
        at(Some(row), col.checked_sub(1)),
        center,
        at(Some(row), Some(col + 1)),
    );
    let y_peak = gaussian_peak_offset(
        at(row.checked_sub(1), Some(col)),
        center,
        at(Some(row + 1), Some(col)),
    );

    Shift::new(-(ox as f64 + x_peak), -(oy as f64 + y_peak))
}
