use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_MAX_ITER, DEFAULT_MAX_SHIFT};
use crate::error::{MotionError, Result};
use crate::frame::FrameSkip;

/// Correlation/difference metric evaluated at every candidate offset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CorrelationMode {
    /// Sum of squared differences.
    SquaredDifference,
    /// Squared differences normalised by template and patch energy.
    SquaredDifferenceNormed,
    /// Raw cross-correlation.
    CrossCorrelation,
    /// Cross-correlation normalised by template and patch energy.
    CrossCorrelationNormed,
    /// Cross-correlation of mean-subtracted template and patch.
    CorrelationCoefficient,
    /// Pearson correlation coefficient.
    #[default]
    CorrelationCoefficientNormed,
}

impl CorrelationMode {
    pub const ALL: [CorrelationMode; 6] = [
        Self::SquaredDifference,
        Self::SquaredDifferenceNormed,
        Self::CrossCorrelation,
        Self::CrossCorrelationNormed,
        Self::CorrelationCoefficient,
        Self::CorrelationCoefficientNormed,
    ];

    /// Squared-difference metrics are minimised, all others maximised.
    pub fn is_difference(self) -> bool {
        matches!(
            self,
            Self::SquaredDifference | Self::SquaredDifferenceNormed
        )
    }

    pub fn is_normed(self) -> bool {
        matches!(
            self,
            Self::SquaredDifferenceNormed
                | Self::CrossCorrelationNormed
                | Self::CorrelationCoefficientNormed
        )
    }

    /// Short identifier used in reports.
    pub fn name(self) -> &'static str {
        match self {
            Self::SquaredDifference => "squaredDifference",
            Self::SquaredDifferenceNormed => "sqDiffNormed",
            Self::CrossCorrelation => "crossCorrelation",
            Self::CrossCorrelationNormed => "crossCorrNormed",
            Self::CorrelationCoefficient => "correlationCoeff",
            Self::CorrelationCoefficientNormed => "corrCoeffNormed",
        }
    }
}

impl std::fmt::Display for CorrelationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SquaredDifference => write!(f, "Squared Difference"),
            Self::SquaredDifferenceNormed => write!(f, "Squared Difference (normed)"),
            Self::CrossCorrelation => write!(f, "Cross-Correlation"),
            Self::CrossCorrelationNormed => write!(f, "Cross-Correlation (normed)"),
            Self::CorrelationCoefficient => write!(f, "Correlation Coefficient"),
            Self::CorrelationCoefficientNormed => write!(f, "Correlation Coefficient (normed)"),
        }
    }
}

/// Resampling kernel used for sub-pixel shifts.
///
/// `Disabled` turns sub-pixel registration off: shifts stay integer and frames
/// are moved by whole pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interpolation {
    Disabled,
    Nearest,
    #[default]
    Linear,
    Cubic,
    Area,
    Lanczos4,
}

impl Interpolation {
    pub fn is_subpixel(self) -> bool {
        !matches!(self, Self::Disabled)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Disabled => "none",
            Self::Nearest => "nearestNeighbor",
            Self::Linear => "linear",
            Self::Cubic => "cubic",
            Self::Area => "area",
            Self::Lanczos4 => "lanczos4",
        }
    }
}

impl std::fmt::Display for Interpolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disabled => write!(f, "Disabled (integer shifts)"),
            Self::Nearest => write!(f, "Nearest"),
            Self::Linear => write!(f, "Linear"),
            Self::Cubic => write!(f, "Cubic"),
            Self::Area => write!(f, "Area"),
            Self::Lanczos4 => write!(f, "Lanczos-4"),
        }
    }
}

/// Parameters of one motion correction run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Search radius per axis, clamped to `(dim - 1) / 2`.
    pub max_shift: usize,
    /// Maximum number of registration passes.
    pub max_iter: usize,
    /// Stop once no frame moves by this much relative to the previous pass.
    pub stop_below_shift: f64,
    /// Significance for empty-frame detection; disabled when <= 0.
    pub empty_frame_probability: f64,
    /// Black intensity used by empty-frame detection (default 0).
    pub black_level: Option<f64>,
    /// Number of consecutive frames averaged into one median sample.
    pub median_rebin: usize,
    /// Subsample the input before processing.
    pub frame_skip: Option<FrameSkip>,
    /// Remove the mid-range shift after each pass. Defaults to on unless
    /// empty-frame detection is enabled.
    pub center_shifts: Option<bool>,
    /// Prefer the local optimum closest to zero shift.
    pub prefer_smallest_shift: bool,
    pub interpolation: Interpolation,
    pub correlation: CorrelationMode,
    /// Value for pixels shifted in from outside the frame (default: stack mean).
    pub fill_value: Option<f64>,
    /// Keep the final corrected, rebinned frames in the result.
    pub keep_corrected: bool,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            max_shift: DEFAULT_MAX_SHIFT,
            max_iter: DEFAULT_MAX_ITER,
            stop_below_shift: 0.0,
            empty_frame_probability: 0.0,
            black_level: None,
            median_rebin: 1,
            frame_skip: None,
            center_shifts: None,
            prefer_smallest_shift: false,
            interpolation: Interpolation::default(),
            correlation: CorrelationMode::default(),
            fill_value: None,
            keep_corrected: false,
        }
    }
}

impl MotionConfig {
    pub fn detects_empty_frames(&self) -> bool {
        self.empty_frame_probability > 0.0
    }

    pub fn effective_center_shifts(&self) -> bool {
        self.center_shifts
            .unwrap_or(!self.detects_empty_frames())
    }

    pub fn effective_black_level(&self) -> f64 {
        self.black_level.unwrap_or(0.0)
    }

    pub fn validate(&self) -> Result<()> {
        if self.median_rebin == 0 {
            return Err(MotionError::InvalidConfig(
                "median_rebin must be at least 1".into(),
            ));
        }
        if self.stop_below_shift.is_nan() {
            return Err(MotionError::InvalidConfig(
                "stop_below_shift must be a number".into(),
            ));
        }
        if let Some(fill) = self.fill_value {
            if !fill.is_finite() {
                return Err(MotionError::InvalidConfig(format!(
                    "fill_value must be finite, got {fill}"
                )));
            }
        }
        Ok(())
    }
}
