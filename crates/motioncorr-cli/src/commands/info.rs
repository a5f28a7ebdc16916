use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use motioncorr_core::io::ser::{SampleFormat, SerReader};

#[derive(Args)]
pub struct InfoArgs {
    /// Input SER file
    pub file: PathBuf,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let reader = SerReader::open(&args.file)
        .with_context(|| format!("Failed to open {}", args.file.display()))?;
    let header = &reader.header;

    println!("File:        {}", args.file.display());
    println!("Frames:      {}", reader.frame_count());
    println!("Dimensions:  {}x{}", header.width, header.height);
    println!("Bit depth:   {}", header.pixel_depth);
    println!("Color mode:  {}", header.color_name());

    if reader.frame_count() > 0 {
        let samples = match reader.detect_sample_format(0)? {
            SampleFormat::Unsigned => "unsigned",
            SampleFormat::Signed => "signed (guessed)",
        };
        println!("Samples:     {}", samples);
    }

    for (label, value) in [
        ("Observer:  ", &header.observer),
        ("Telescope: ", &header.telescope),
        ("Instrument:", &header.instrument),
    ] {
        if !value.is_empty() {
            println!("{}  {}", label, value);
        }
    }

    let total_mb =
        (header.frame_byte_size() * reader.frame_count()) as f64 / (1024.0 * 1024.0);
    println!("Data size:   {:.1} MB", total_mb);

    Ok(())
}
