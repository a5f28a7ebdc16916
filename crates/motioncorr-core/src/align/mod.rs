pub mod metric;
pub mod optimum;
pub mod subpixel;
pub mod warp;

pub use metric::{compute_surface, SearchRadius, TemplatePlan};
pub use optimum::{Objective, OptimumSearch, SurfaceOptimum, TieBreak};
pub use subpixel::{gaussian_peak_offset, refine_shift};
pub use warp::{shift_integer, shift_subpixel, warp_frame};
