use ndarray::{s, Array2, Array3, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::frame::Shift;

use super::config::{CorrelationMode, MotionConfig};

/// Per-iteration, per-frame shift table.
///
/// Rows are preallocated up to the iteration cap and trimmed by
/// [`ShiftHistory::finish`].
#[derive(Clone, Debug)]
pub struct ShiftHistory {
    x: Array2<f64>,
    y: Array2<f64>,
    len: usize,
}

impl ShiftHistory {
    pub fn with_capacity(iterations: usize, frames: usize) -> Self {
        Self {
            x: Array2::zeros((iterations, frames)),
            y: Array2::zeros((iterations, frames)),
            len: 0,
        }
    }

    /// Append one iteration's shifts, growing past the preallocated rows if
    /// needed.
    pub fn push(&mut self, shifts: &[Shift]) {
        debug_assert_eq!(shifts.len(), self.frames());
        let xs: Vec<f64> = shifts.iter().map(|s| s.dx).collect();
        let ys: Vec<f64> = shifts.iter().map(|s| s.dy).collect();

        if self.len == self.x.nrows() {
            let frames = self.frames();
            let mut x = Array2::zeros((self.len + 1, frames));
            let mut y = Array2::zeros((self.len + 1, frames));
            x.slice_mut(s![..self.len, ..]).assign(&self.x);
            y.slice_mut(s![..self.len, ..]).assign(&self.y);
            self.x = x;
            self.y = y;
        }
        self.x.row_mut(self.len).assign(&ArrayView1::from(&xs[..]));
        self.y.row_mut(self.len).assign(&ArrayView1::from(&ys[..]));
        self.len += 1;
    }

    /// Drop the unused preallocated rows.
    pub fn finish(self) -> Self {
        let len = self.len;
        Self {
            x: self.x.slice(s![..len, ..]).to_owned(),
            y: self.y.slice(s![..len, ..]).to_owned(),
            len,
        }
    }

    pub fn iterations(&self) -> usize {
        self.len
    }

    pub fn frames(&self) -> usize {
        self.x.ncols()
    }

    pub fn get(&self, iteration: usize, frame: usize) -> Shift {
        Shift::new(self.x[[iteration, frame]], self.y[[iteration, frame]])
    }

    pub fn row(&self, iteration: usize) -> Vec<Shift> {
        (0..self.frames())
            .map(|frame| self.get(iteration, frame))
            .collect()
    }

    pub fn last_row(&self) -> Option<Vec<Shift>> {
        self.len.checked_sub(1).map(|last| self.row(last))
    }

    /// X shifts, shape (iterations, frames).
    pub fn x_shifts(&self) -> ArrayView2<'_, f64> {
        self.x.slice(s![..self.len, ..])
    }

    /// Y shifts, shape (iterations, frames).
    pub fn y_shifts(&self) -> ArrayView2<'_, f64> {
        self.y.slice(s![..self.len, ..])
    }
}

/// Metric diagnostics of the final registration pass.
#[derive(Clone, Debug)]
pub struct MetricReport {
    pub mode: CorrelationMode,
    /// Metric surfaces, shape (frames, surface rows, surface cols). Slices of
    /// empty frames are NaN.
    pub values: Array3<f64>,
    /// Metric value at the selected optimum per frame (NaN for empty frames).
    pub optimum: Vec<f64>,
}

impl MetricReport {
    pub fn surface(&self, frame: usize) -> ArrayView2<'_, f64> {
        self.values.index_axis(Axis(0), frame)
    }
}

/// Configuration as run, with every defaulted value resolved.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EchoedParams {
    pub config: MotionConfig,
    /// Clamped search radius (rows, cols).
    pub search_radius: (usize, usize),
    pub fill_value: f64,
    pub black_level: f64,
    pub center_shifts: bool,
    pub subpixel: bool,
    pub interpolation: String,
    pub external_reference: bool,
}

/// Everything produced by one motion correction run.
#[derive(Clone, Debug)]
pub struct MotionCorrection {
    pub shifts: ShiftHistory,
    /// (rows, cols, frames) after frame skipping.
    pub input_size: (usize, usize, usize),
    pub reference: Array2<f32>,
    pub metric: MetricReport,
    pub params: EchoedParams,
    pub empty_frames: Vec<bool>,
    pub converged: bool,
    /// Final corrected frames averaged per rebin group, when requested.
    pub corrected: Option<Vec<Array2<f32>>>,
}

impl MotionCorrection {
    pub fn iterations(&self) -> usize {
        self.shifts.iterations()
    }

    /// Shifts of the last completed iteration (all zero if none ran).
    pub fn final_shifts(&self) -> Vec<Shift> {
        self.shifts
            .last_row()
            .unwrap_or_else(|| vec![Shift::default(); self.input_size.2])
    }

    pub fn report(&self) -> MotionReport {
        let rows = |table: ArrayView2<f64>| -> Vec<Vec<f64>> {
            table.outer_iter().map(|row| row.to_vec()).collect()
        };
        MotionReport {
            method: "motioncorr".into(),
            input_size: [self.input_size.0, self.input_size.1, self.input_size.2],
            iterations: self.iterations(),
            converged: self.converged,
            x_shifts: rows(self.shifts.x_shifts()),
            y_shifts: rows(self.shifts.y_shifts()),
            empty_frames: self.empty_frames.clone(),
            metric: MetricSummary {
                name: self.metric.mode.name().into(),
                optimum: self.metric.optimum.clone(),
            },
            params: self.params.clone(),
        }
    }
}

/// Serialisable summary of a run (shift tables, metric optima, parameters).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MotionReport {
    pub method: String,
    pub input_size: [usize; 3],
    pub iterations: usize,
    pub converged: bool,
    /// One entry per iteration, each holding one x shift per frame.
    pub x_shifts: Vec<Vec<f64>>,
    pub y_shifts: Vec<Vec<f64>>,
    pub empty_frames: Vec<bool>,
    pub metric: MetricSummary,
    pub params: EchoedParams,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MetricSummary {
    pub name: String,
    pub optimum: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_trims_to_completed_rows() {
        let mut history = ShiftHistory::with_capacity(5, 2);
        history.push(&[Shift::new(1.0, 2.0), Shift::new(3.0, 4.0)]);
        history.push(&[Shift::new(0.5, 0.0), Shift::new(0.0, -1.0)]);
        let history = history.finish();
        assert_eq!(history.iterations(), 2);
        assert_eq!(history.x_shifts().dim(), (2, 2));
        assert_eq!(history.get(1, 1), Shift::new(0.0, -1.0));
    }

    #[test]
    fn test_history_grows_past_capacity() {
        let mut history = ShiftHistory::with_capacity(0, 1);
        history.push(&[Shift::new(1.0, 1.0)]);
        history.push(&[Shift::new(2.0, 2.0)]);
        assert_eq!(history.iterations(), 2);
        assert_eq!(history.last_row(), Some(vec![Shift::new(2.0, 2.0)]));
    }
}
