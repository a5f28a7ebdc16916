use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use ndarray::ArrayView2;

use crate::error::{MotionError, Result};
use crate::io::ser::{SerHeader, SER_HEADER_SIZE, SER_MAGIC};

/// Writes a valid SER file at the raw byte level.
pub struct SerWriter {
    writer: BufWriter<File>,
    header: SerHeader,
    frames_written: u32,
}

impl SerWriter {
    /// Create a new SER file and write the header.
    pub fn create(path: &Path, header: &SerHeader) -> Result<Self> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        write_header(&mut writer, header)?;
        Ok(Self {
            writer,
            header: header.clone(),
            frames_written: 0,
        })
    }

    /// Write a single raw frame (bytes must match the header's frame_byte_size).
    pub fn write_raw_frame(&mut self, data: &[u8]) -> Result<()> {
        if data.len() != self.header.frame_byte_size() {
            return Err(MotionError::InvalidSer(format!(
                "Frame holds {} bytes, header expects {}",
                data.len(),
                self.header.frame_byte_size()
            )));
        }
        self.writer.write_all(data)?;
        self.frames_written += 1;
        Ok(())
    }

    /// Quantise a mono frame to the header's sample width and write it.
    ///
    /// Values are rounded and clamped to the representable range; NaN
    /// becomes 0.
    pub fn write_frame(&mut self, frame: ArrayView2<f32>) -> Result<()> {
        let (h, w) = frame.dim();
        if (w, h) != (self.header.width as usize, self.header.height as usize) {
            return Err(MotionError::DimensionMismatch {
                expected_rows: self.header.height as usize,
                expected_cols: self.header.width as usize,
                rows: h,
                cols: w,
            });
        }

        let max_value = ((1u32 << self.header.pixel_depth) - 1) as f32;
        let quantise = |v: f32| {
            if v.is_nan() {
                0
            } else {
                v.round().clamp(0.0, max_value) as u16
            }
        };

        let mut bytes = Vec::with_capacity(self.header.frame_byte_size());
        for &v in frame.iter() {
            let sample = quantise(v);
            if self.header.bytes_per_pixel_plane() == 1 {
                bytes.push(sample as u8);
            } else if self.header.little_endian {
                bytes.extend_from_slice(&sample.to_le_bytes());
            } else {
                bytes.extend_from_slice(&sample.to_be_bytes());
            }
        }
        self.write_raw_frame(&bytes)
    }

    pub fn frames_written(&self) -> u32 {
        self.frames_written
    }

    /// Flush and finalize the file.
    pub fn finalize(mut self) -> Result<()> {
        if self.frames_written != self.header.frame_count {
            return Err(MotionError::InvalidSer(format!(
                "Wrote {} frames, header declares {}",
                self.frames_written, self.header.frame_count
            )));
        }
        self.writer.flush()?;
        Ok(())
    }
}

fn write_header(w: &mut impl Write, header: &SerHeader) -> Result<()> {
    w.write_all(SER_MAGIC)?;
    // LuID
    w.write_all(&0i32.to_le_bytes())?;
    w.write_all(&header.color_id.to_le_bytes())?;
    // 0 = little-endian
    let le_flag: i32 = if header.little_endian { 0 } else { 1 };
    w.write_all(&le_flag.to_le_bytes())?;
    w.write_all(&(header.width as i32).to_le_bytes())?;
    w.write_all(&(header.height as i32).to_le_bytes())?;
    w.write_all(&(header.pixel_depth as i32).to_le_bytes())?;
    w.write_all(&(header.frame_count as i32).to_le_bytes())?;
    write_fixed_string(w, &header.observer, 40)?;
    write_fixed_string(w, &header.instrument, 40)?;
    write_fixed_string(w, &header.telescope, 40)?;
    w.write_all(&header.date_time.to_le_bytes())?;
    w.write_all(&header.date_time_utc.to_le_bytes())?;

    debug_assert_eq!(
        14 + 4 + 4 + 4 + 4 + 4 + 4 + 4 + 40 + 40 + 40 + 8 + 8,
        SER_HEADER_SIZE
    );
    Ok(())
}

fn write_fixed_string(w: &mut impl Write, s: &str, len: usize) -> Result<()> {
    let mut field = vec![0u8; len];
    let bytes = s.as_bytes();
    let n = bytes.len().min(len);
    field[..n].copy_from_slice(&bytes[..n]);
    w.write_all(&field)?;
    Ok(())
}
