mod common;

use approx::assert_abs_diff_eq;
use ndarray::{array, Array2};

use common::{pattern, translate};
use motioncorr_core::align::subpixel::{gaussian_peak_offset, refine_shift};
use motioncorr_core::align::metric::SearchRadius;
use motioncorr_core::align::optimum::SurfaceOptimum;
use motioncorr_core::align::warp::{shift_integer, shift_subpixel, warp_frame};
use motioncorr_core::frame::Shift;
use motioncorr_core::pipeline::config::Interpolation;

#[test]
fn test_integer_shift_moves_content() {
    let src = Array2::from_shape_fn((3, 4), |(r, c)| (r * 4 + c) as f32);
    let out = shift_integer(src.view(), Shift::new(1.0, 0.0), -1.0);
    assert_eq!(
        out,
        array![
            [-1.0, 0.0, 1.0, 2.0],
            [-1.0, 4.0, 5.0, 6.0],
            [-1.0, 8.0, 9.0, 10.0]
        ]
    );
}

#[test]
fn test_integer_shift_rounds() {
    let src = pattern(10, 10);
    let rounded = shift_integer(src.view(), Shift::new(1.6, -2.4), 0.0);
    assert_eq!(rounded, translate(&src, 2, -2, 0.0));
}

#[test]
fn test_disabled_interpolation_uses_integer_shift() {
    let src = pattern(12, 12);
    let out = warp_frame(src.view(), Shift::new(-1.0, 2.0), Interpolation::Disabled, 5.0);
    assert_eq!(out, translate(&src, -1, 2, 5.0));
}

#[test]
fn test_linear_half_pixel() {
    let src = array![[0.0f32, 2.0, 4.0, 6.0]];
    let out = shift_subpixel(src.view(), Shift::new(0.5, 0.0), Interpolation::Linear, 10.0);
    // dst(x) = src(x - 0.5); column 0 blends the fill value.
    assert_abs_diff_eq!(out[[0, 0]], 5.0, epsilon = 1e-6);
    assert_abs_diff_eq!(out[[0, 1]], 1.0, epsilon = 1e-6);
    assert_abs_diff_eq!(out[[0, 3]], 5.0, epsilon = 1e-6);
}

#[test]
fn test_whole_pixel_shift_is_exact_for_every_kernel() {
    let src = pattern(16, 16);
    let expected = translate(&src, 2, -1, 7.0);
    for interpolation in [
        Interpolation::Nearest,
        Interpolation::Linear,
        Interpolation::Cubic,
        Interpolation::Area,
        Interpolation::Lanczos4,
    ] {
        let out = warp_frame(src.view(), Shift::new(2.0, -1.0), interpolation, 7.0);
        for (a, b) in out.iter().zip(expected.iter()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-3);
        }
    }
}

#[test]
fn test_area_matches_linear_for_translation() {
    let src = pattern(12, 12);
    let shift = Shift::new(0.3, -0.7);
    let area = shift_subpixel(src.view(), shift, Interpolation::Area, 0.0);
    let linear = shift_subpixel(src.view(), shift, Interpolation::Linear, 0.0);
    assert_eq!(area, linear);
}

#[test]
fn test_constant_image_stays_constant_inside() {
    let src = Array2::from_elem((20, 20), 4.0f32);
    for interpolation in [Interpolation::Cubic, Interpolation::Lanczos4] {
        let out = shift_subpixel(src.view(), Shift::new(0.4, 0.25), interpolation, 4.0);
        for v in out.iter() {
            assert_abs_diff_eq!(*v, 4.0, epsilon = 1e-4);
        }
    }
}

#[test]
fn test_output_size_matches_input() {
    let src = pattern(9, 13);
    let out = warp_frame(src.view(), Shift::new(3.5, 1.25), Interpolation::Cubic, 0.0);
    assert_eq!(out.dim(), (9, 13));
}

#[test]
fn test_peak_offset_of_sampled_gaussian() {
    let sample = |x: f64| (-(x - 0.3f64).powi(2) / 4.0).exp();
    let offset = gaussian_peak_offset(sample(-1.0), sample(0.0), sample(1.0));
    assert_abs_diff_eq!(offset, 0.3, epsilon = 1e-9);
}

#[test]
fn test_refine_shift_negates_offset() {
    let mut surface = Array2::<f64>::from_elem((5, 5), 0.5);
    surface[[1, 3]] = 1.0;
    let optimum = SurfaceOptimum {
        row: 1,
        col: 3,
        value: 1.0,
    };
    let radius = SearchRadius { rows: 2, cols: 2 };

    assert_eq!(
        refine_shift(&surface, &optimum, radius, false),
        Shift::new(-1.0, 1.0)
    );
    // Symmetric neighbours leave the integer estimate unchanged.
    assert_eq!(
        refine_shift(&surface, &optimum, radius, true),
        Shift::new(-1.0, 1.0)
    );
}

#[test]
fn test_refine_shift_at_surface_edge() {
    let surface = array![[1.0, 0.5, 0.2], [0.5, 0.3, 0.1], [0.2, 0.1, 0.05]];
    let optimum = SurfaceOptimum {
        row: 0,
        col: 0,
        value: 1.0,
    };
    let shift = refine_shift(&surface, &optimum, SearchRadius { rows: 1, cols: 1 }, true);
    assert_eq!(shift, Shift::new(1.0, 1.0));
}
