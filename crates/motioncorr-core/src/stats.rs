use ndarray::ArrayView2;
use rayon::prelude::*;

use crate::frame::FrameStack;

/// Running min/max/mean/variance over pixel samples.
///
/// Non-finite samples are ignored.
#[derive(Clone, Copy, Debug)]
pub struct SampleStatistics {
    count: u64,
    sum: f64,
    sum_sq: f64,
    min: f64,
    max: f64,
}

impl Default for SampleStatistics {
    fn default() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            sum_sq: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

impl SampleStatistics {
    pub fn add(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }
        self.count += 1;
        self.sum += value;
        self.sum_sq += value * value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    pub fn merge(mut self, other: SampleStatistics) -> Self {
        self.count += other.count;
        self.sum += other.sum;
        self.sum_sq += other.sum_sq;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self
    }

    pub fn of_frame(frame: ArrayView2<f32>) -> Self {
        let mut stats = Self::default();
        for &v in frame.iter() {
            stats.add(v as f64);
        }
        stats
    }

    /// Statistics over every pixel of every frame in the stack.
    pub fn of_stack(stack: &FrameStack) -> Self {
        (0..stack.len())
            .into_par_iter()
            .map(|i| Self::of_frame(stack.frame(i)))
            .reduce(Self::default, Self::merge)
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn minimum(&self) -> f64 {
        self.min
    }

    pub fn maximum(&self) -> f64 {
        self.max
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            f64::NAN
        } else {
            self.sum / self.count as f64
        }
    }

    /// Population standard deviation about the mean.
    pub fn rms(&self) -> f64 {
        if self.count == 0 {
            return f64::NAN;
        }
        let mean = self.mean();
        (self.sum_sq / self.count as f64 - mean * mean).max(0.0).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_frame_statistics() {
        let data = array![[1.0f32, 2.0], [3.0, 4.0]];
        let stats = SampleStatistics::of_frame(data.view());
        assert_eq!(stats.count(), 4);
        assert_eq!(stats.minimum(), 1.0);
        assert_eq!(stats.maximum(), 4.0);
        assert!((stats.mean() - 2.5).abs() < 1e-12);
        assert!((stats.rms() - 1.25f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_non_finite_ignored() {
        let data = array![[f32::NAN, 2.0], [f32::INFINITY, 4.0]];
        let stats = SampleStatistics::of_frame(data.view());
        assert_eq!(stats.count(), 2);
        assert!((stats.mean() - 3.0).abs() < 1e-12);
    }
}
