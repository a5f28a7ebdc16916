use ndarray::Array2;

use crate::pipeline::config::CorrelationMode;

use super::metric::SearchRadius;

/// Whether the best offset has the largest or the smallest metric value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Objective {
    Maximize,
    Minimize,
}

impl Objective {
    pub fn for_mode(mode: CorrelationMode) -> Self {
        if mode.is_difference() {
            Self::Minimize
        } else {
            Self::Maximize
        }
    }

    /// `a` is strictly better than `b`.
    pub fn is_better(self, a: f64, b: f64) -> bool {
        match self {
            Self::Maximize => a > b,
            Self::Minimize => a < b,
        }
    }
}

/// How to pick among several optima of a metric surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TieBreak {
    /// Take the global optimum.
    #[default]
    GlobalOnly,
    /// Replace the global optimum by the local optimum nearest zero shift.
    PreferSmallest,
}

/// Selected cell of a metric surface.
///
/// `value` is always the global optimum of the surface; a tie-break only
/// moves the location.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceOptimum {
    pub row: usize,
    pub col: usize,
    pub value: f64,
}

impl SurfaceOptimum {
    /// Integer displacement (x, y) of this cell from the surface centre.
    pub fn offset(&self, radius: SearchRadius) -> (isize, isize) {
        (
            self.col as isize - radius.cols as isize,
            self.row as isize - radius.rows as isize,
        )
    }
}

/// Optimum search strategy over a metric surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OptimumSearch {
    pub objective: Objective,
    pub tie_break: TieBreak,
}

impl OptimumSearch {
    pub fn new(objective: Objective, tie_break: TieBreak) -> Self {
        Self {
            objective,
            tie_break,
        }
    }

    pub fn for_mode(mode: CorrelationMode, prefer_smallest: bool) -> Self {
        let tie_break = if prefer_smallest {
            TieBreak::PreferSmallest
        } else {
            TieBreak::GlobalOnly
        };
        Self::new(Objective::for_mode(mode), tie_break)
    }

    pub fn locate(&self, surface: &Array2<f64>) -> SurfaceOptimum {
        let global = self.global(surface);
        match self.tie_break {
            TieBreak::GlobalOnly => global,
            TieBreak::PreferSmallest => self.nearest_local(surface, global),
        }
    }

    /// First strictly-best non-NaN cell in row-major order; the centre cell
    /// when the surface holds no usable value.
    fn global(&self, surface: &Array2<f64>) -> SurfaceOptimum {
        let mut best: Option<SurfaceOptimum> = None;
        for ((row, col), &value) in surface.indexed_iter() {
            if value.is_nan() {
                continue;
            }
            if best.map_or(true, |b| self.objective.is_better(value, b.value)) {
                best = Some(SurfaceOptimum { row, col, value });
            }
        }

        best.unwrap_or_else(|| {
            let (h, w) = surface.dim();
            SurfaceOptimum {
                row: h / 2,
                col: w / 2,
                value: f64::NAN,
            }
        })
    }

    /// Among interior cells that are no worse than any of their 8 neighbours,
    /// pick the one closest to the surface centre, if it is strictly closer
    /// than `best`. The value of `best` is kept.
    fn nearest_local(&self, surface: &Array2<f64>, best: SurfaceOptimum) -> SurfaceOptimum {
        let (h, w) = surface.dim();
        if h < 3 || w < 3 {
            return best;
        }
        let (center_row, center_col) = ((h / 2) as isize, (w / 2) as isize);
        let radius2 = |row: usize, col: usize| {
            let dr = row as isize - center_row;
            let dc = col as isize - center_col;
            dr * dr + dc * dc
        };

        let mut selected = best;
        let mut best_radius2 = radius2(best.row, best.col);
        for row in 1..h - 1 {
            for col in 1..w - 1 {
                let value = surface[[row, col]];
                if value.is_nan() || radius2(row, col) >= best_radius2 {
                    continue;
                }
                let dominated = NEIGHBOURS.iter().any(|&(dr, dc)| {
                    let neighbour = surface[[
                        (row as isize + dr) as usize,
                        (col as isize + dc) as usize,
                    ]];
                    self.objective.is_better(neighbour, value)
                });
                if dominated {
                    continue;
                }
                best_radius2 = radius2(row, col);
                selected = SurfaceOptimum {
                    row,
                    col,
                    value: best.value,
                };
            }
        }
        selected
    }
}

const NEIGHBOURS: [(isize, isize); 8] = [
    (-1, 0),
    (1, 0),
    (0, 1),
    (0, -1),
    (-1, 1),
    (-1, -1),
    (1, 1),
    (1, -1),
];
