/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Minimum frame count to use frame-level Rayon parallelism.
pub const PARALLEL_FRAME_THRESHOLD: usize = 4;

/// Small epsilon below which a normalisation denominator is treated as zero.
pub const EPSILON: f64 = f64::EPSILON;

/// Default search radius (pixels per axis) before clamping to the frame size.
pub const DEFAULT_MAX_SHIFT: usize = 15;

/// Default iteration cap for the registration loop.
pub const DEFAULT_MAX_ITER: usize = 5;

/// Keys cubic convolution parameter (matches the common image-library choice).
pub const CUBIC_KEYS_A: f64 = -0.75;

/// Half-width of the Lanczos window, in pixels.
pub const LANCZOS_TAPS: usize = 4;

/// A decoded mono frame is treated as signed data when its signed range is
/// below this fraction of its unsigned range.
pub const SIGNED_RANGE_RATIO: f64 = 0.5;
