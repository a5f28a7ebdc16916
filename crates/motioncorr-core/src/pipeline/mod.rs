pub mod config;
mod controller;
pub mod result;
mod types;

pub use controller::{correct_motion, correct_motion_reported, correct_motion_with_template};
pub use result::{EchoedParams, MetricReport, MotionCorrection, MotionReport, ShiftHistory};
pub use types::{MotionStage, NoOpReporter, ProgressReporter};
