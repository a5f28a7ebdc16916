/// Processing stage, used for progress reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MotionStage {
    EmptyFrameDetection,
    Registration { iteration: usize },
}

impl std::fmt::Display for MotionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyFrameDetection => write!(f, "Detecting empty frames"),
            Self::Registration { iteration } => write!(f, "Registration pass {iteration}"),
        }
    }
}

/// Thread-safe progress reporting for a motion correction run.
///
/// Implementors can use this to drive progress bars, logging, or any other
/// UI feedback. All methods have default no-op implementations. Reporting
/// never influences the numeric result.
pub trait ProgressReporter: Send + Sync {
    /// A new stage has started. `total_items` is the number of work items in
    /// this stage (e.g., non-empty frame count), if known.
    fn begin_stage(&self, _stage: MotionStage, _total_items: Option<usize>) {}

    /// One work item within the current stage has completed.
    fn advance(&self, _items_done: usize) {}

    /// The current stage is finished. `max_relative_shift` is reported for
    /// registration passes.
    fn finish_stage(&self, _max_relative_shift: Option<f64>) {}
}

/// No-op progress reporter, used when the caller does not ask for progress.
pub struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}
