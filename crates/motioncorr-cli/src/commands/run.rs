use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use motioncorr_core::frame::{FrameSkip, FrameStack};
use motioncorr_core::io::image_io::{load_image, load_image_sequence, save_image};
use motioncorr_core::io::ser::{SerHeader, SerReader};
use motioncorr_core::io::ser_writer::SerWriter;
use motioncorr_core::pipeline::config::{CorrelationMode, Interpolation, MotionConfig};
use motioncorr_core::pipeline::{
    correct_motion_reported, MotionCorrection, MotionStage, ProgressReporter,
};

use tracing::info;

use crate::summary::{print_config_summary, print_result_summary};

#[derive(Clone, Copy, ValueEnum)]
pub enum InterpolationArg {
    None,
    Nearest,
    Linear,
    Cubic,
    Area,
    Lanczos4,
}

impl From<InterpolationArg> for Interpolation {
    fn from(arg: InterpolationArg) -> Self {
        match arg {
            InterpolationArg::None => Interpolation::Disabled,
            InterpolationArg::Nearest => Interpolation::Nearest,
            InterpolationArg::Linear => Interpolation::Linear,
            InterpolationArg::Cubic => Interpolation::Cubic,
            InterpolationArg::Area => Interpolation::Area,
            InterpolationArg::Lanczos4 => Interpolation::Lanczos4,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum MetricArg {
    SqDiff,
    SqDiffNormed,
    CrossCorr,
    CrossCorrNormed,
    CorrCoeff,
    CorrCoeffNormed,
}

impl From<MetricArg> for CorrelationMode {
    fn from(arg: MetricArg) -> Self {
        match arg {
            MetricArg::SqDiff => CorrelationMode::SquaredDifference,
            MetricArg::SqDiffNormed => CorrelationMode::SquaredDifferenceNormed,
            MetricArg::CrossCorr => CorrelationMode::CrossCorrelation,
            MetricArg::CrossCorrNormed => CorrelationMode::CrossCorrelationNormed,
            MetricArg::CorrCoeff => CorrelationMode::CorrelationCoefficient,
            MetricArg::CorrCoeffNormed => CorrelationMode::CorrelationCoefficientNormed,
        }
    }
}

#[derive(Args)]
pub struct RunArgs {
    /// Input SER file or directory of images
    pub input: PathBuf,

    /// External reference image used for the first registration pass
    #[arg(long)]
    pub template: Option<PathBuf>,

    /// Motion config file (TOML); command-line options override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Maximum shift searched per axis, in pixels
    #[arg(long)]
    pub max_shift: Option<usize>,

    /// Maximum number of registration passes
    #[arg(long)]
    pub max_iter: Option<usize>,

    /// Stop once no frame moves by this many pixels between passes
    #[arg(long)]
    pub stop_below: Option<f64>,

    /// Significance for empty-frame detection (0 disables)
    #[arg(long)]
    pub empty_probability: Option<f64>,

    /// Black level used by empty-frame detection
    #[arg(long)]
    pub black_level: Option<f64>,

    /// Consecutive frames averaged into one median sample
    #[arg(long)]
    pub rebin: Option<usize>,

    /// First frame to use
    #[arg(long)]
    pub skip_offset: Option<usize>,

    /// Frames dropped after every kept frame
    #[arg(long)]
    pub skip: Option<usize>,

    /// Center shifts after each pass (true/false)
    #[arg(long)]
    pub center: Option<bool>,

    /// Prefer the local optimum closest to zero shift
    #[arg(long)]
    pub prefer_smallest: bool,

    /// Interpolation kernel ("none" keeps shifts integer)
    #[arg(long, value_enum)]
    pub interpolation: Option<InterpolationArg>,

    /// Correlation metric
    #[arg(long, value_enum)]
    pub metric: Option<MetricArg>,

    /// Value for pixels shifted in from outside the frame (default: stack mean)
    #[arg(long)]
    pub fill_value: Option<f64>,

    /// Also write the corrected, rebinned frames as corrected.ser
    #[arg(long)]
    pub keep_corrected: bool,

    /// Output directory
    #[arg(short, long, default_value = "motioncorr-out")]
    pub output: PathBuf,
}

pub fn run(args: &RunArgs) -> Result<()> {
    let config = build_config(args)?;
    let stack = load_stack(&args.input)?;
    let template = args
        .template
        .as_ref()
        .map(|path| {
            load_image(path).with_context(|| format!("Failed to load template {}", path.display()))
        })
        .transpose()?;

    print_config_summary(&config, &args.input, &args.output, &stack);

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{msg:28} [{bar:40}] {pos}/{len}")?
            .progress_chars("=> "),
    );
    let reporter = Arc::new(BarReporter { bar: bar.clone() });

    let result = correct_motion_reported(
        &stack,
        template.as_ref().map(|t| t.data.view()),
        &config,
        None,
        reporter,
    )
    .context("Motion correction failed")?;
    bar.finish_and_clear();

    write_outputs(&result, &args.output, stack.original_bit_depth())?;
    print_result_summary(&result, &args.output);

    Ok(())
}

fn build_config(args: &RunArgs) -> Result<MotionConfig> {
    let mut config: MotionConfig = if let Some(ref config_path) = args.config {
        let contents = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config {}", config_path.display()))?;
        toml::from_str(&contents).context("Invalid motion config")?
    } else {
        MotionConfig::default()
    };

    if let Some(max_shift) = args.max_shift {
        config.max_shift = max_shift;
    }
    if let Some(max_iter) = args.max_iter {
        config.max_iter = max_iter;
    }
    if let Some(stop) = args.stop_below {
        config.stop_below_shift = stop;
    }
    if let Some(probability) = args.empty_probability {
        config.empty_frame_probability = probability;
    }
    if args.black_level.is_some() {
        config.black_level = args.black_level;
    }
    if let Some(rebin) = args.rebin {
        config.median_rebin = rebin;
    }
    if args.skip_offset.is_some() || args.skip.is_some() {
        let current = config.frame_skip.unwrap_or_default();
        config.frame_skip = Some(FrameSkip::new(
            args.skip_offset.unwrap_or(current.offset),
            args.skip.unwrap_or(current.skip),
        ));
    }
    if args.center.is_some() {
        config.center_shifts = args.center;
    }
    if args.prefer_smallest {
        config.prefer_smallest_shift = true;
    }
    if let Some(interpolation) = args.interpolation {
        config.interpolation = interpolation.into();
    }
    if let Some(metric) = args.metric {
        config.correlation = metric.into();
    }
    if args.fill_value.is_some() {
        config.fill_value = args.fill_value;
    }
    if args.keep_corrected {
        config.keep_corrected = true;
    }

    config.validate()?;
    Ok(config)
}

fn load_stack(input: &Path) -> Result<FrameStack> {
    if input.is_dir() {
        return load_image_sequence(input)
            .with_context(|| format!("Failed to load image sequence {}", input.display()));
    }
    match input.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("ser") => {
            let reader = SerReader::open(input)
                .with_context(|| format!("Failed to open {}", input.display()))?;
            Ok(reader.read_stack(None)?)
        }
        _ => bail!(
            "Unsupported input {}: expected a SER file or an image directory",
            input.display()
        ),
    }
}

fn write_outputs(result: &MotionCorrection, dir: &Path, bit_depth: u8) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let reference_path = dir.join("reference.tiff");
    save_image(result.reference.view(), &reference_path)
        .with_context(|| format!("Failed to write {}", reference_path.display()))?;
    info!(path = %reference_path.display(), "Wrote reference image");

    let report_path = dir.join("motion.toml");
    let report = toml::to_string_pretty(&result.report())?;
    std::fs::write(&report_path, report)
        .with_context(|| format!("Failed to write {}", report_path.display()))?;
    info!(path = %report_path.display(), "Wrote motion report");

    if let Some(ref corrected) = result.corrected {
        let corrected_path = dir.join("corrected.ser");
        let (rows, cols, _) = result.input_size;
        let header = SerHeader::mono(
            cols as u32,
            rows as u32,
            bit_depth.clamp(8, 16) as u32,
            corrected.len() as u32,
        );
        let mut writer = SerWriter::create(&corrected_path, &header)?;
        for image in corrected {
            writer.write_frame(image.view())?;
        }
        writer
            .finalize()
            .with_context(|| format!("Failed to write {}", corrected_path.display()))?;
        info!(path = %corrected_path.display(), frames = corrected.len(), "Wrote corrected frames");
    }

    Ok(())
}

/// Drives a terminal progress bar from the registration loop.
struct BarReporter {
    bar: ProgressBar,
}

impl ProgressReporter for BarReporter {
    fn begin_stage(&self, stage: MotionStage, total_items: Option<usize>) {
        self.bar.reset();
        self.bar.set_length(total_items.unwrap_or(0) as u64);
        self.bar.set_message(stage.to_string());
    }

    fn advance(&self, items_done: usize) {
        self.bar.set_position(items_done as u64);
    }

    fn finish_stage(&self, max_relative_shift: Option<f64>) {
        if let Some(shift) = max_relative_shift {
            self.bar
                .println(format!("{}: max relative shift {:.3} px", self.bar.message(), shift));
        }
    }
}
