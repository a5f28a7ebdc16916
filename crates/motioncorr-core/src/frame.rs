use ndarray::{Array2, Array3, ArrayView2, Axis};
use num_traits::AsPrimitive;
use serde::{Deserialize, Serialize};

use crate::error::{MotionError, Result};

/// A single grayscale image frame.
#[derive(Clone, Debug)]
pub struct Frame {
    /// Pixel data, row-major, shape = (height, width)
    pub data: Array2<f32>,
    /// Original bit depth before conversion (8, 16 or 32)
    pub original_bit_depth: u8,
}

impl Frame {
    pub fn new(data: Array2<f32>, bit_depth: u8) -> Self {
        Self {
            data,
            original_bit_depth: bit_depth,
        }
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }
}

/// Translation that moves a frame onto the reference.
///
/// A corrected frame satisfies `corrected(x, y) = frame(x - dx, y - dy)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Shift {
    pub dx: f64,
    pub dy: f64,
}

impl Shift {
    pub fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }

    /// Largest absolute per-axis difference to another shift.
    pub fn max_abs_delta(&self, other: &Shift) -> f64 {
        (self.dx - other.dx).abs().max((self.dy - other.dy).abs())
    }
}

/// Frame subsampling applied before processing.
///
/// Starting at `offset`, one frame is kept and the next `skip` frames are
/// dropped, repeatedly. `{ offset: 1, skip: 1 }` keeps frames 1, 3, 5, ...
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSkip {
    pub offset: usize,
    pub skip: usize,
}

impl FrameSkip {
    pub fn new(offset: usize, skip: usize) -> Self {
        Self { offset, skip }
    }

    /// Source indices kept out of `total` frames, in order.
    pub fn indices(&self, total: usize) -> impl Iterator<Item = usize> {
        (self.offset..total).step_by(self.skip + 1)
    }

    pub fn selected_count(&self, total: usize) -> usize {
        if self.offset >= total {
            0
        } else {
            (total - self.offset).div_ceil(self.skip + 1)
        }
    }
}

/// Ordered, same-sized frames stored in one contiguous buffer.
///
/// Shape is (frames, rows, cols); frames are addressed by index and handed out
/// as read-only views, so the stack can be shared across worker threads.
#[derive(Clone, Debug)]
pub struct FrameStack {
    data: Array3<f32>,
    original_bit_depth: u8,
}

impl FrameStack {
    pub fn from_array(data: Array3<f32>, bit_depth: u8) -> Result<Self> {
        if data.len_of(Axis(0)) == 0 {
            return Err(MotionError::EmptySequence);
        }
        Ok(Self {
            data,
            original_bit_depth: bit_depth,
        })
    }

    /// Copy individual frames into a contiguous stack.
    pub fn from_frames(frames: &[Frame]) -> Result<Self> {
        let first = frames.first().ok_or(MotionError::EmptySequence)?;
        let (h, w) = first.data.dim();
        let mut data = Array3::<f32>::zeros((frames.len(), h, w));

        for (i, frame) in frames.iter().enumerate() {
            if frame.data.dim() != (h, w) {
                return Err(MotionError::DimensionMismatch {
                    expected_rows: h,
                    expected_cols: w,
                    rows: frame.height(),
                    cols: frame.width(),
                });
            }
            data.index_axis_mut(Axis(0), i).assign(&frame.data);
        }

        Self::from_array(data, first.original_bit_depth)
    }

    /// Build a stack from frame-major, row-major samples of any numeric type.
    ///
    /// Samples are converted to `f32` without rescaling.
    pub fn from_raw<T>(samples: &[T], frames: usize, rows: usize, cols: usize) -> Result<Self>
    where
        T: AsPrimitive<f32>,
    {
        let expected = frames * rows * cols;
        if samples.len() != expected {
            return Err(MotionError::SampleCountMismatch {
                expected,
                actual: samples.len(),
            });
        }
        let converted: Vec<f32> = samples.iter().map(|v| v.as_()).collect();
        let data = Array3::from_shape_vec((frames, rows, cols), converted)
            .map_err(|e| MotionError::InvalidConfig(e.to_string()))?;
        let bit_depth = (std::mem::size_of::<T>() * 8).min(u8::MAX as usize) as u8;
        Self::from_array(data, bit_depth)
    }

    pub fn len(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn rows(&self) -> usize {
        self.data.len_of(Axis(1))
    }

    pub fn cols(&self) -> usize {
        self.data.len_of(Axis(2))
    }

    /// Frame dimensions as (rows, cols).
    pub fn frame_dim(&self) -> (usize, usize) {
        (self.rows(), self.cols())
    }

    pub fn original_bit_depth(&self) -> u8 {
        self.original_bit_depth
    }

    pub fn frame(&self, index: usize) -> ArrayView2<'_, f32> {
        self.data.index_axis(Axis(0), index)
    }

    pub fn frames(&self) -> impl Iterator<Item = ArrayView2<'_, f32>> + '_ {
        self.data.axis_iter(Axis(0))
    }

    pub fn as_array(&self) -> &Array3<f32> {
        &self.data
    }

    /// Keep only the frames selected by `skip`.
    pub fn subsample(&self, skip: &FrameSkip) -> Result<Self> {
        let indices: Vec<usize> = skip.indices(self.len()).collect();
        if indices.is_empty() {
            return Err(MotionError::EmptySequence);
        }
        let selected = self.data.select(Axis(0), &indices);
        Self::from_array(selected, self.original_bit_depth)
    }
}
