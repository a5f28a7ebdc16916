use std::path::Path;

use console::Style;
use motioncorr_core::frame::FrameStack;
use motioncorr_core::pipeline::config::MotionConfig;
use motioncorr_core::pipeline::MotionCorrection;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    disabled: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
        }
    }
}

pub fn print_config_summary(config: &MotionConfig, input: &Path, output: &Path, stack: &FrameStack) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("Motion Correction"));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(17)));
    println!();

    println!("  {:<14}{}", s.label.apply_to("Input"), s.path.apply_to(input.display()));
    println!("  {:<14}{}", s.label.apply_to("Output"), s.path.apply_to(output.display()));
    println!(
        "  {:<14}{}",
        s.label.apply_to("Frames"),
        s.value.apply_to(format!(
            "{} x {}x{}",
            stack.len(),
            stack.cols(),
            stack.rows()
        ))
    );
    if let Some(skip) = config.frame_skip {
        println!(
            "  {:<14}{}",
            s.label.apply_to("Frame skip"),
            s.value.apply_to(format!("offset {}, skip {}", skip.offset, skip.skip))
        );
    }
    println!();

    println!("  {}", s.header.apply_to("Registration"));
    println!("    {:<14}{}", s.label.apply_to("Metric"), s.method.apply_to(config.correlation));
    println!(
        "    {:<14}{}",
        s.label.apply_to("Interpolation"),
        s.method.apply_to(config.interpolation)
    );
    println!("    {:<14}{}", s.label.apply_to("Max shift"), s.value.apply_to(config.max_shift));
    println!("    {:<14}{}", s.label.apply_to("Max passes"), s.value.apply_to(config.max_iter));
    if config.stop_below_shift > 0.0 {
        println!(
            "    {:<14}{}",
            s.label.apply_to("Stop below"),
            s.value.apply_to(format!("{} px", config.stop_below_shift))
        );
    }
    if config.prefer_smallest_shift {
        println!(
            "    {:<14}{}",
            s.label.apply_to("Optimum"),
            s.value.apply_to("nearest local")
        );
    }
    println!();

    println!("  {}", s.header.apply_to("Reference"));
    println!("    {:<14}{}", s.label.apply_to("Median rebin"), s.value.apply_to(config.median_rebin));
    if config.effective_center_shifts() {
        println!("    {:<14}{}", s.label.apply_to("Centering"), s.value.apply_to("on"));
    } else {
        println!("    {:<14}{}", s.label.apply_to("Centering"), s.disabled.apply_to("off"));
    }
    if config.detects_empty_frames() {
        println!(
            "    {:<14}{}",
            s.label.apply_to("Empty frames"),
            s.value.apply_to(format!(
                "p >= {} above black {}",
                config.empty_frame_probability,
                config.effective_black_level()
            ))
        );
    } else {
        println!(
            "    {:<14}{}",
            s.label.apply_to("Empty frames"),
            s.disabled.apply_to("not detected")
        );
    }
    println!();
}

pub fn print_result_summary(result: &MotionCorrection, output: &Path) {
    let s = Styles::new();

    let status = if result.converged {
        s.method.apply_to("converged")
    } else {
        s.disabled.apply_to("stopped at pass limit")
    };
    println!(
        "  {:<14}{} ({})",
        s.label.apply_to("Passes"),
        s.value.apply_to(result.iterations()),
        status
    );

    let empty = result.empty_frames.iter().filter(|&&e| e).count();
    if empty > 0 {
        println!("  {:<14}{}", s.label.apply_to("Empty frames"), s.value.apply_to(empty));
    }

    let shifts = result.final_shifts();
    let (max_x, max_y) = shifts.iter().fold((0.0f64, 0.0f64), |(mx, my), shift| {
        (mx.max(shift.dx.abs()), my.max(shift.dy.abs()))
    });
    println!(
        "  {:<14}{}",
        s.label.apply_to("Largest shift"),
        s.value.apply_to(format!("x {:.2} px, y {:.2} px", max_x, max_y))
    );
    println!("  {:<14}{}", s.label.apply_to("Saved to"), s.path.apply_to(output.display()));
    println!();
}
