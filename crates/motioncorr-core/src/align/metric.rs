use ndarray::{s, Array2, ArrayView2, Zip};

use crate::consts::{EPSILON, PARALLEL_PIXEL_THRESHOLD};
use crate::error::{MotionError, Result};
use crate::pipeline::config::CorrelationMode;

/// Half-size of the offset window searched on each axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchRadius {
    pub rows: usize,
    pub cols: usize,
}

impl SearchRadius {
    /// Clamp the requested radius so the template keeps at least one pixel.
    pub fn clamped(max_shift: usize, frame_dim: (usize, usize)) -> Self {
        let (h, w) = frame_dim;
        Self {
            rows: max_shift.min(h.saturating_sub(1) / 2),
            cols: max_shift.min(w.saturating_sub(1) / 2),
        }
    }

    /// Metric surface shape: one cell per integer offset.
    pub fn surface_dim(&self) -> (usize, usize) {
        (2 * self.rows + 1, 2 * self.cols + 1)
    }
}

/// Reference interior prepared for repeated matching against frames.
///
/// The template is the reference inset by the search radius on every side;
/// the border is excluded because frames may shift far enough to vacate it.
#[derive(Clone, Debug)]
pub struct TemplatePlan {
    template: Array2<f64>,
    zero_mean: Array2<f64>,
    energy: f64,
    zero_mean_energy: f64,
    radius: SearchRadius,
    frame_dim: (usize, usize),
}

impl TemplatePlan {
    pub fn new(reference: ArrayView2<f32>, radius: SearchRadius) -> Result<Self> {
        let (h, w) = reference.dim();
        if 2 * radius.rows >= h || 2 * radius.cols >= w {
            return Err(MotionError::InvalidConfig(format!(
                "search radius {}x{} leaves no template inside a {}x{} reference",
                radius.rows, radius.cols, h, w
            )));
        }

        let template = reference
            .slice(s![radius.rows..h - radius.rows, radius.cols..w - radius.cols])
            .mapv(|v| v as f64);
        let mean = template.mean().unwrap_or(0.0);
        let zero_mean = template.mapv(|v| v - mean);
        let energy = template.iter().map(|v| v * v).sum();
        let zero_mean_energy = zero_mean.iter().map(|v| v * v).sum();

        Ok(Self {
            template,
            zero_mean,
            energy,
            zero_mean_energy,
            radius,
            frame_dim: (h, w),
        })
    }

    pub fn radius(&self) -> SearchRadius {
        self.radius
    }

    pub fn template_dim(&self) -> (usize, usize) {
        self.template.dim()
    }

    pub fn frame_dim(&self) -> (usize, usize) {
        self.frame_dim
    }
}

/// Summed-area tables of a frame and its square, for O(1) patch statistics.
struct IntegralImages {
    sum: Array2<f64>,
    sum_sq: Array2<f64>,
}

impl IntegralImages {
    fn new(frame: ArrayView2<f32>) -> Self {
        let (h, w) = frame.dim();
        let mut sum = Array2::<f64>::zeros((h + 1, w + 1));
        let mut sum_sq = Array2::<f64>::zeros((h + 1, w + 1));
        for row in 0..h {
            let mut row_sum = 0.0;
            let mut row_sum_sq = 0.0;
            for col in 0..w {
                let v = frame[[row, col]] as f64;
                row_sum += v;
                row_sum_sq += v * v;
                sum[[row + 1, col + 1]] = sum[[row, col + 1]] + row_sum;
                sum_sq[[row + 1, col + 1]] = sum_sq[[row, col + 1]] + row_sum_sq;
            }
        }
        Self { sum, sum_sq }
    }

    fn rect(table: &Array2<f64>, row: usize, col: usize, h: usize, w: usize) -> f64 {
        table[[row + h, col + w]] - table[[row, col + w]] - table[[row + h, col]]
            + table[[row, col]]
    }

    /// (sum, sum of squares) of the `h x w` patch at (row, col).
    fn patch(&self, row: usize, col: usize, h: usize, w: usize) -> (f64, f64) {
        (
            Self::rect(&self.sum, row, col, h, w),
            Self::rect(&self.sum_sq, row, col, h, w),
        )
    }
}

/// Evaluate `mode` between the template and the frame at every offset.
///
/// Cell (i, j) compares the template with the frame patch whose top-left
/// corner is (i, j); the centre cell is zero displacement. Normalised modes
/// with a vanishing denominator score 1 (squared difference) or 0.
pub fn compute_surface(
    frame: ArrayView2<f32>,
    plan: &TemplatePlan,
    mode: CorrelationMode,
) -> Result<Array2<f64>> {
    if frame.dim() != plan.frame_dim {
        return Err(MotionError::DimensionMismatch {
            expected_rows: plan.frame_dim.0,
            expected_cols: plan.frame_dim.1,
            rows: frame.nrows(),
            cols: frame.ncols(),
        });
    }

    let (th, tw) = plan.template_dim();
    let pixel_count = (th * tw) as f64;
    let integrals = IntegralImages::new(frame);
    let kernel = match mode {
        CorrelationMode::CorrelationCoefficient | CorrelationMode::CorrelationCoefficientNormed => {
            &plan.zero_mean
        }
        _ => &plan.template,
    };

    let evaluate = |(i, j): (usize, usize), cell: &mut f64| {
        let patch = frame.slice(s![i..i + th, j..j + tw]);
        let cross = Zip::from(kernel)
            .and(&patch)
            .fold(0.0f64, |acc, &t, &v| acc + t * v as f64);
        let (patch_sum, patch_sum_sq) = integrals.patch(i, j, th, tw);

        *cell = match mode {
            CorrelationMode::SquaredDifference => {
                (plan.energy - 2.0 * cross + patch_sum_sq).max(0.0)
            }
            CorrelationMode::SquaredDifferenceNormed => {
                let denom = (plan.energy * patch_sum_sq).sqrt();
                if denom <= EPSILON {
                    1.0
                } else {
                    ((plan.energy - 2.0 * cross + patch_sum_sq).max(0.0)) / denom
                }
            }
            CorrelationMode::CrossCorrelation | CorrelationMode::CorrelationCoefficient => cross,
            CorrelationMode::CrossCorrelationNormed => {
                normalised(cross, (plan.energy * patch_sum_sq).sqrt())
            }
            CorrelationMode::CorrelationCoefficientNormed => {
                let patch_var = (patch_sum_sq - patch_sum * patch_sum / pixel_count).max(0.0);
                normalised(cross, (plan.zero_mean_energy * patch_var).sqrt())
            }
        };
    };

    let mut surface = Array2::<f64>::zeros(plan.radius.surface_dim());
    if plan.frame_dim.0 * plan.frame_dim.1 >= PARALLEL_PIXEL_THRESHOLD {
        Zip::indexed(&mut surface).par_for_each(evaluate);
    } else {
        Zip::indexed(&mut surface).for_each(evaluate);
    }

    Ok(surface)
}

fn normalised(numerator: f64, denom: f64) -> f64 {
    if denom <= EPSILON {
        0.0
    } else {
        (numerator / denom).clamp(-1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radius_clamps_to_frame() {
        let radius = SearchRadius::clamped(100, (7, 10));
        assert_eq!(radius, SearchRadius { rows: 3, cols: 4 });
        assert_eq!(radius.surface_dim(), (7, 9));
    }

    #[test]
    fn test_radius_keeps_small_request() {
        let radius = SearchRadius::clamped(2, (64, 64));
        assert_eq!(radius.surface_dim(), (5, 5));
    }

    #[test]
    fn test_integral_patch_sums() {
        let frame = Array2::from_shape_fn((4, 5), |(r, c)| (r * 5 + c) as f32);
        let integrals = IntegralImages::new(frame.view());
        let (sum, sum_sq) = integrals.patch(1, 2, 2, 3);
        let patch = frame.slice(s![1..3, 2..5]);
        let expected: f64 = patch.iter().map(|&v| v as f64).sum();
        let expected_sq: f64 = patch.iter().map(|&v| (v as f64) * (v as f64)).sum();
        assert!((sum - expected).abs() < 1e-9);
        assert!((sum_sq - expected_sq).abs() < 1e-9);
    }
}
