use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ndarray::{Array2, Array3, ArrayView2, Axis};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::align::metric::{compute_surface, SearchRadius, TemplatePlan};
use crate::align::optimum::OptimumSearch;
use crate::align::subpixel::refine_shift;
use crate::align::warp::warp_frame;
use crate::consts::PARALLEL_FRAME_THRESHOLD;
use crate::empty::{detect_empty_frames, EmptyFrameDetector, MeanNoiseDetector};
use crate::error::{MotionError, Result};
use crate::frame::{FrameStack, Shift};
use crate::stack::rebin::{RebinGroups, RebinLayout};
use crate::stack::reference::build_reference;
use crate::stats::SampleStatistics;

use super::config::{Interpolation, MotionConfig};
use super::result::{EchoedParams, MetricReport, MotionCorrection, ShiftHistory};
use super::types::{MotionStage, NoOpReporter, ProgressReporter};

/// Estimate and remove frame-to-frame translation, using a reference built
/// from the stack itself.
pub fn correct_motion(stack: &FrameStack, config: &MotionConfig) -> Result<MotionCorrection> {
    correct_motion_reported(stack, None, config, None, Arc::new(NoOpReporter))
}

/// Like [`correct_motion`], but the first registration pass matches against
/// `template` instead of the stack median. Shift centering is disabled.
pub fn correct_motion_with_template(
    stack: &FrameStack,
    template: ArrayView2<f32>,
    config: &MotionConfig,
) -> Result<MotionCorrection> {
    correct_motion_reported(stack, Some(template), config, None, Arc::new(NoOpReporter))
}

/// Full entry point with an optional external template, a custom empty-frame
/// policy and progress reporting.
///
/// When `detector` is given it replaces the default [`MeanNoiseDetector`]
/// and is applied regardless of `empty_frame_probability`.
pub fn correct_motion_reported(
    stack: &FrameStack,
    template: Option<ArrayView2<f32>>,
    config: &MotionConfig,
    detector: Option<&dyn EmptyFrameDetector>,
    reporter: Arc<dyn ProgressReporter>,
) -> Result<MotionCorrection> {
    config.validate()?;

    let skipped;
    let stack = match &config.frame_skip {
        Some(skip) => {
            skipped = stack.subsample(skip)?;
            &skipped
        }
        None => stack,
    };
    let frame_count = stack.len();
    let dim = stack.frame_dim();

    let pixels = dim.0 * dim.1;
    if pixels < 3 {
        return Err(MotionError::TooFewPixels { pixels });
    }
    if let Some(template) = &template {
        if template.dim() != dim {
            return Err(MotionError::DimensionMismatch {
                expected_rows: dim.0,
                expected_cols: dim.1,
                rows: template.nrows(),
                cols: template.ncols(),
            });
        }
    }

    let stats = SampleStatistics::of_stack(stack);
    if !(stats.minimum() < stats.maximum()) {
        return Err(MotionError::DegenerateInput {
            min: stats.minimum(),
            max: stats.maximum(),
        });
    }

    let fill_value = config.fill_value.unwrap_or_else(|| stats.mean());
    let fill = fill_value as f32;
    let black_level = config.effective_black_level();
    let radius = SearchRadius::clamped(config.max_shift, dim);
    let center_shifts = config.effective_center_shifts() && template.is_none();

    info!(
        frames = frame_count,
        rows = dim.0,
        cols = dim.1,
        radius_rows = radius.rows,
        radius_cols = radius.cols,
        metric = config.correlation.name(),
        interpolation = config.interpolation.name(),
        "Starting motion correction"
    );

    reporter.begin_stage(MotionStage::EmptyFrameDetection, Some(frame_count));
    let empty = match detector {
        Some(detector) => detect_empty_frames(stack, detector, black_level),
        None if config.detects_empty_frames() => detect_empty_frames(
            stack,
            &MeanNoiseDetector::new(config.empty_frame_probability),
            black_level,
        ),
        None => vec![false; frame_count],
    };
    reporter.finish_stage(None);

    let active = empty.iter().filter(|&&e| !e).count();
    if active == 0 {
        warn!(frames = frame_count, "Every frame is empty, shifts stay at zero");
    }

    let layout = RebinLayout::new(frame_count, config.median_rebin, &empty)?;
    let mut groups = RebinGroups::fold(
        &layout,
        dim,
        (0..frame_count)
            .filter(|&i| !empty[i])
            .map(|i| (i, stack.frame(i))),
    )?;

    let pass = RegistrationPass {
        radius,
        search: OptimumSearch::for_mode(config.correlation, config.prefer_smallest_shift),
        config,
        fill,
    };
    let (surface_rows, surface_cols) = radius.surface_dim();
    let mut surfaces = Array3::<f64>::from_elem((frame_count, surface_rows, surface_cols), f64::NAN);
    let mut optimum_values = vec![f64::NAN; frame_count];
    let mut history = ShiftHistory::with_capacity(config.max_iter, frame_count);
    let mut state = IterationState::default();

    let reference = loop {
        let reference = match template {
            Some(template) if state.iteration == 0 => template.to_owned(),
            _ => build_reference(&groups, state.mid, config.interpolation, fill)?,
        };

        if state.max_rel_shift < config.stop_below_shift {
            state.converged = true;
            break reference;
        }
        if state.iteration >= config.max_iter {
            break reference;
        }
        state.iteration += 1;

        reporter.begin_stage(
            MotionStage::Registration {
                iteration: state.iteration,
            },
            Some(active),
        );
        let plan = TemplatePlan::new(reference.view(), radius)?;
        let outcomes = pass.run(stack, &plan, &empty, reporter.as_ref())?;

        let previous = history.last_row();
        let mut shifts = vec![Shift::default(); frame_count];
        let mut max_rel_shift = f64::NEG_INFINITY;
        let mut bounds: Option<(Shift, Shift)> = None;
        for (i, outcome) in outcomes.iter().enumerate() {
            let Some(outcome) = outcome else {
                continue;
            };
            let shift = outcome.shift;
            let prior = previous.as_ref().map_or(Shift::default(), |row| row[i]);
            max_rel_shift = max_rel_shift.max(shift.max_abs_delta(&prior));
            shifts[i] = shift;

            bounds = Some(match bounds {
                None => (shift, shift),
                Some((lo, hi)) => (
                    Shift::new(lo.dx.min(shift.dx), lo.dy.min(shift.dy)),
                    Shift::new(hi.dx.max(shift.dx), hi.dy.max(shift.dy)),
                ),
            });
        }

        if center_shifts {
            state.mid = bounds.map_or(Shift::default(), |(lo, hi)| {
                Shift::new((lo.dx + hi.dx) / 2.0, (lo.dy + hi.dy) / 2.0)
            });
            for (shift, &is_empty) in shifts.iter_mut().zip(&empty) {
                if !is_empty {
                    shift.dx -= state.mid.dx;
                    shift.dy -= state.mid.dy;
                }
            }
        }
        state.max_rel_shift = max_rel_shift;
        history.push(&shifts);

        surfaces.fill(f64::NAN);
        optimum_values.fill(f64::NAN);
        for (i, outcome) in outcomes.iter().enumerate() {
            if let Some(outcome) = outcome {
                surfaces.index_axis_mut(Axis(0), i).assign(&outcome.surface);
                optimum_values[i] = outcome.value;
            }
        }
        groups = RebinGroups::fold(
            &layout,
            dim,
            outcomes
                .iter()
                .enumerate()
                .filter_map(|(i, o)| o.as_ref().map(|o| (i, o.corrected.view()))),
        )?;

        info!(
            iteration = state.iteration,
            max_relative_shift = state.max_rel_shift,
            mid_x = state.mid.dx,
            mid_y = state.mid.dy,
            "Registration pass complete"
        );
        reporter.finish_stage(Some(state.max_rel_shift));
    };

    info!(
        iterations = state.iteration,
        converged = state.converged,
        "Motion correction finished"
    );

    let params = EchoedParams {
        config: config.clone(),
        search_radius: (radius.rows, radius.cols),
        fill_value,
        black_level,
        center_shifts,
        subpixel: config.interpolation.is_subpixel(),
        interpolation: config.interpolation.name().into(),
        external_reference: template.is_some(),
    };

    Ok(MotionCorrection {
        shifts: history.finish(),
        input_size: (dim.0, dim.1, frame_count),
        reference,
        metric: MetricReport {
            mode: config.correlation,
            values: surfaces,
            optimum: optimum_values,
        },
        params,
        empty_frames: empty,
        converged: state.converged,
        corrected: config.keep_corrected.then(|| groups.into_images()),
    })
}

/// Loop bookkeeping carried between registration passes.
#[derive(Clone, Copy, Debug)]
struct IterationState {
    iteration: usize,
    /// Centering offset removed from the last pass's shifts.
    mid: Shift,
    max_rel_shift: f64,
    converged: bool,
}

impl Default for IterationState {
    fn default() -> Self {
        Self {
            iteration: 0,
            mid: Shift::default(),
            max_rel_shift: f64::INFINITY,
            converged: false,
        }
    }
}

/// Result of registering one frame against the reference.
struct FrameOutcome {
    shift: Shift,
    corrected: Array2<f32>,
    surface: Array2<f64>,
    value: f64,
}

/// Settings shared by every frame of a registration pass.
struct RegistrationPass<'a> {
    radius: SearchRadius,
    search: OptimumSearch,
    config: &'a MotionConfig,
    fill: f32,
}

impl RegistrationPass<'_> {
    fn interpolation(&self) -> Interpolation {
        self.config.interpolation
    }

    /// Register every non-empty frame; empty frames yield `None`.
    fn run(
        &self,
        stack: &FrameStack,
        plan: &TemplatePlan,
        empty: &[bool],
        reporter: &dyn ProgressReporter,
    ) -> Result<Vec<Option<FrameOutcome>>> {
        let counter = AtomicUsize::new(0);
        let register = |i: usize| -> Result<Option<FrameOutcome>> {
            if empty[i] {
                return Ok(None);
            }
            let outcome = self.estimate_frame(stack.frame(i), plan)?;
            let done = counter.fetch_add(1, Ordering::Relaxed) + 1;
            reporter.advance(done);
            Ok(Some(outcome))
        };

        if stack.len() >= PARALLEL_FRAME_THRESHOLD {
            (0..stack.len()).into_par_iter().map(&register).collect()
        } else {
            (0..stack.len()).map(&register).collect()
        }
    }

    fn estimate_frame(&self, frame: ArrayView2<f32>, plan: &TemplatePlan) -> Result<FrameOutcome> {
        let surface = compute_surface(frame, plan, self.config.correlation)?;
        let optimum = self.search.locate(&surface);
        let shift = refine_shift(
            &surface,
            &optimum,
            self.radius,
            self.interpolation().is_subpixel(),
        );
        debug!(
            row = optimum.row,
            col = optimum.col,
            value = optimum.value,
            dx = shift.dx,
            dy = shift.dy,
            "Frame registered"
        );
        let corrected = warp_frame(frame, shift, self.interpolation(), self.fill);

        Ok(FrameOutcome {
            shift,
            corrected,
            surface,
            value: optimum.value,
        })
    }
}
