use thiserror::Error;

#[derive(Error, Debug)]
pub enum MotionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid SER file: {0}")]
    InvalidSer(String),

    #[error("Invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Frame index {index} out of range (total: {total})")]
    FrameIndexOutOfRange { index: usize, total: usize },

    #[error("Image format error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Empty frame sequence")]
    EmptySequence,

    #[error("Frame size mismatch: expected {expected_rows}x{expected_cols}, got {rows}x{cols}")]
    DimensionMismatch {
        expected_rows: usize,
        expected_cols: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Expected {expected} samples for the stack, got {actual}")]
    SampleCountMismatch { expected: usize, actual: usize },

    #[error("Input image too small ({pixels} pixels), must have at least 3 pixels")]
    TooFewPixels { pixels: usize },

    #[error(
        "Invalid range [{min:.3}, {max:.3}] of pixel values in image stack; \
         the image cannot be completely uniform for motion correction"
    )]
    DegenerateInput { min: f64, max: f64 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid median bin {index} >= {count}, should not be possible")]
    RebinOverflow { index: usize, count: usize },
}

pub type Result<T> = std::result::Result<T, MotionError>;
