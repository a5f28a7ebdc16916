use ndarray::ArrayView2;
use rayon::prelude::*;
use statrs::distribution::{ContinuousCDF, Normal};
use tracing::debug;

use crate::consts::PARALLEL_FRAME_THRESHOLD;
use crate::frame::FrameStack;
use crate::stats::SampleStatistics;

/// Policy deciding whether a frame is "black" (carries no usable signal).
///
/// Empty frames keep a zero shift and are left out of reference construction.
/// Any `Fn(ArrayView2<f32>, f64) -> bool` closure is a detector.
pub trait EmptyFrameDetector: Send + Sync {
    fn is_empty(&self, frame: ArrayView2<f32>, black_level: f64) -> bool;
}

impl<F> EmptyFrameDetector for F
where
    F: Fn(ArrayView2<f32>, f64) -> bool + Send + Sync,
{
    fn is_empty(&self, frame: ArrayView2<f32>, black_level: f64) -> bool {
        self(frame, black_level)
    }
}

/// Flags a frame whose mean intensity is statistically indistinguishable
/// from the black level.
///
/// The frame mean is tested against `black_level` with a one-sided z-test
/// using the frame's own pixel noise. The frame is empty when the tail
/// probability is at least `probability`.
#[derive(Clone, Copy, Debug)]
pub struct MeanNoiseDetector {
    pub probability: f64,
}

impl MeanNoiseDetector {
    pub fn new(probability: f64) -> Self {
        Self { probability }
    }

    /// Probability of a mean at least this bright if the frame were black.
    pub fn black_probability(&self, frame: ArrayView2<f32>, black_level: f64) -> f64 {
        let stats = SampleStatistics::of_frame(frame);
        if stats.count() == 0 {
            return 1.0;
        }
        let mean = stats.mean();
        let sigma = stats.rms();
        if sigma <= 0.0 {
            return if mean <= black_level { 1.0 } else { 0.0 };
        }
        let standard_error = sigma / (stats.count() as f64).sqrt();
        let z = (mean - black_level) / standard_error;
        Normal::standard().sf(z)
    }
}

impl EmptyFrameDetector for MeanNoiseDetector {
    fn is_empty(&self, frame: ArrayView2<f32>, black_level: f64) -> bool {
        self.black_probability(frame, black_level) >= self.probability
    }
}

/// Evaluate `detector` once for every frame of the stack.
pub fn detect_empty_frames(
    stack: &FrameStack,
    detector: &dyn EmptyFrameDetector,
    black_level: f64,
) -> Vec<bool> {
    let flags: Vec<bool> = if stack.len() >= PARALLEL_FRAME_THRESHOLD {
        (0..stack.len())
            .into_par_iter()
            .map(|i| detector.is_empty(stack.frame(i), black_level))
            .collect()
    } else {
        stack
            .frames()
            .map(|frame| detector.is_empty(frame, black_level))
            .collect()
    };

    debug!(
        empty = flags.iter().filter(|&&e| e).count(),
        total = flags.len(),
        black_level,
        "Empty frame detection"
    );
    flags
}
