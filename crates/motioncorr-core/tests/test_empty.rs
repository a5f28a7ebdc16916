mod common;

use ndarray::{Array2, ArrayView2};

use common::stack_of;
use motioncorr_core::empty::{detect_empty_frames, EmptyFrameDetector, MeanNoiseDetector};

/// Deterministic noise in [-amplitude, amplitude] around `level`.
fn noisy_frame(level: f32, amplitude: f32, seed: usize) -> Array2<f32> {
    Array2::from_shape_fn((16, 16), |(r, c)| {
        let k = (r * 31 + c * 17 + seed * 13) % 11;
        level + amplitude * (k as f32 / 5.0 - 1.0)
    })
}

#[test]
fn test_dark_frame_is_empty() {
    let detector = MeanNoiseDetector::new(0.99);
    let dark = noisy_frame(10.0, 2.0, 1);
    let probability = detector.black_probability(dark.view(), 10.5);
    assert!(probability > 0.99, "p = {probability}");
    assert!(detector.is_empty(dark.view(), 10.5));
}

#[test]
fn test_bright_frame_is_not_empty() {
    let detector = MeanNoiseDetector::new(0.99);
    let bright = noisy_frame(60.0, 2.0, 2);
    assert!(detector.black_probability(bright.view(), 10.0) < 1e-6);
    assert!(!detector.is_empty(bright.view(), 10.0));
}

#[test]
fn test_noiseless_frame_compares_mean() {
    let detector = MeanNoiseDetector::new(0.5);
    let flat = Array2::from_elem((4, 4), 3.0f32);
    assert_eq!(detector.black_probability(flat.view(), 3.0), 1.0);
    assert_eq!(detector.black_probability(flat.view(), 2.0), 0.0);
}

#[test]
fn test_nan_only_frame_is_empty() {
    let detector = MeanNoiseDetector::new(0.99);
    let frame = Array2::from_elem((4, 4), f32::NAN);
    assert!(detector.is_empty(frame.view(), 0.0));
}

#[test]
fn test_detect_flags_per_frame() {
    let frames = vec![
        noisy_frame(50.0, 3.0, 0),
        noisy_frame(0.0, 3.0, 1),
        noisy_frame(48.0, 3.0, 2),
        noisy_frame(0.5, 3.0, 3),
    ];
    let stack = stack_of(&frames);
    let flags = detect_empty_frames(&stack, &MeanNoiseDetector::new(0.99), 1.0);
    assert_eq!(flags, vec![false, true, false, true]);
}

#[test]
fn test_closure_detector() {
    let frames: Vec<Array2<f32>> = (0..5)
        .map(|k| Array2::from_elem((3, 3), k as f32))
        .collect();
    let stack = stack_of(&frames);
    let below = |frame: ArrayView2<f32>, black: f64| frame[[0, 0]] as f64 <= black;
    assert_eq!(
        detect_empty_frames(&stack, &below, 2.0),
        vec![true, true, true, false, false]
    );
}

#[test]
fn test_parallel_detection_matches_order() {
    // Enough frames to take the parallel path.
    let frames: Vec<Array2<f32>> = (0..40)
        .map(|k| Array2::from_elem((2, 2), if k % 3 == 0 { 0.0 } else { 9.0 }))
        .collect();
    let stack = stack_of(&frames);
    let dark = |frame: ArrayView2<f32>, _black: f64| frame[[1, 1]] == 0.0;
    let flags = detect_empty_frames(&stack, &dark, 0.0);
    let expected: Vec<bool> = (0..40).map(|k| k % 3 == 0).collect();
    assert_eq!(flags, expected);
}

#[test]
fn test_mean_at_black_level_is_even_odds() {
    let detector = MeanNoiseDetector::new(0.5);
    let frame = Array2::from_shape_fn((4, 4), |(r, c)| if (r + c) % 2 == 0 { 1.0f32 } else { 3.0 });
    let probability = detector.black_probability(frame.view(), 2.0);
    assert!((probability - 0.5).abs() < 1e-12, "p = {probability}");
    assert!(detector.is_empty(frame.view(), 2.0));
}

#[test]
fn test_probability_follows_normal_tail() {
    let detector = MeanNoiseDetector::new(0.99);
    // Mean 2, sigma 1, 16 samples: standard error 0.25, z = 2 for black 1.5.
    let frame = Array2::from_shape_fn((4, 4), |(r, c)| if (r + c) % 2 == 0 { 1.0f32 } else { 3.0 });
    let probability = detector.black_probability(frame.view(), 1.5);
    assert!((probability - 0.022_750_13).abs() < 1e-6, "p = {probability}");
}
