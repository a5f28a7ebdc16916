use std::fs::File;
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};
use memmap2::Mmap;
use ndarray::{Array2, Array3, Axis};
use tracing::{debug, warn};

use crate::consts::SIGNED_RANGE_RATIO;
use crate::error::{MotionError, Result};
use crate::frame::{Frame, FrameSkip, FrameStack};

pub const SER_HEADER_SIZE: usize = 178;
pub const SER_MAGIC: &[u8; 14] = b"LUCAM-RECORDER";

/// SER file header (178 bytes).
#[derive(Clone, Debug)]
pub struct SerHeader {
    pub color_id: i32,
    pub little_endian: bool,
    pub width: u32,
    pub height: u32,
    pub pixel_depth: u32,
    pub frame_count: u32,
    pub observer: String,
    pub instrument: String,
    pub telescope: String,
    pub date_time: u64,
    pub date_time_utc: u64,
}

impl SerHeader {
    /// Header for a mono recording.
    pub fn mono(width: u32, height: u32, pixel_depth: u32, frame_count: u32) -> Self {
        Self {
            color_id: 0,
            little_endian: true,
            width,
            height,
            pixel_depth,
            frame_count,
            observer: String::new(),
            instrument: String::new(),
            telescope: String::new(),
            date_time: 0,
            date_time_utc: 0,
        }
    }

    /// Bytes per pixel plane (1 for 8-bit, 2 for 9-16 bit).
    pub fn bytes_per_pixel_plane(&self) -> usize {
        if self.pixel_depth <= 8 { 1 } else { 2 }
    }

    /// Number of planes per pixel (1 for mono/bayer, 3 for RGB/BGR).
    pub fn planes_per_pixel(&self) -> usize {
        match self.color_id {
            100 | 101 => 3,
            _ => 1,
        }
    }

    /// Total bytes per frame.
    pub fn frame_byte_size(&self) -> usize {
        self.width as usize
            * self.height as usize
            * self.bytes_per_pixel_plane()
            * self.planes_per_pixel()
    }

    /// Human readable colour layout.
    pub fn color_name(&self) -> &'static str {
        match self.color_id {
            0 => "Mono",
            8 => "Bayer RGGB",
            9 => "Bayer GRBG",
            10 => "Bayer GBRG",
            11 => "Bayer BGGR",
            100 => "RGB",
            101 => "BGR",
            _ => "Unknown",
        }
    }
}

/// How raw integer samples are interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleFormat {
    Unsigned,
    /// Two's complement data stored in an unsigned container.
    Signed,
}

/// Memory-mapped SER file reader.
///
/// Frames are decoded to raw sample values (no rescaling). RGB/BGR recordings
/// are reduced to their green plane.
pub struct SerReader {
    mmap: Mmap,
    pub header: SerHeader,
}

impl SerReader {
    /// Open a SER file and parse its header.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };

        if mmap.len() < SER_HEADER_SIZE {
            return Err(MotionError::InvalidSer(
                "File too small for SER header".into(),
            ));
        }

        if &mmap[0..14] != SER_MAGIC {
            return Err(MotionError::InvalidSer(
                "Missing LUCAM-RECORDER magic".into(),
            ));
        }

        let header = parse_header(&mmap[..SER_HEADER_SIZE])?;

        let expected_data_size = header
            .frame_byte_size()
            .checked_mul(header.frame_count as usize)
            .and_then(|size| size.checked_add(SER_HEADER_SIZE))
            .ok_or_else(|| MotionError::InvalidSer("Frame data size overflows".into()))?;
        if mmap.len() < expected_data_size {
            return Err(MotionError::InvalidSer(format!(
                "File truncated: expected at least {} bytes, got {}",
                expected_data_size,
                mmap.len()
            )));
        }

        Ok(Self { mmap, header })
    }

    pub fn frame_count(&self) -> usize {
        self.header.frame_count as usize
    }

    /// Get the raw bytes for a single frame (zero-copy from mmap).
    pub fn frame_raw(&self, index: usize) -> Result<&[u8]> {
        let count = self.frame_count();
        if index >= count {
            return Err(MotionError::FrameIndexOutOfRange {
                index,
                total: count,
            });
        }
        let offset = SER_HEADER_SIZE + index * self.header.frame_byte_size();
        let end = offset + self.header.frame_byte_size();
        Ok(&self.mmap[offset..end])
    }

    /// Read a single frame as raw unsigned sample values.
    pub fn read_frame(&self, index: usize) -> Result<Frame> {
        self.read_frame_as(index, SampleFormat::Unsigned)
    }

    pub fn read_frame_as(&self, index: usize, format: SampleFormat) -> Result<Frame> {
        let raw = self.frame_raw(index)?;
        let data = decode_plane(raw, &self.header, format);
        Ok(Frame::new(data, self.header.bytes_per_pixel_plane() as u8 * 8))
    }

    /// Guess whether the recording holds signed samples.
    ///
    /// Samples of `index` are read both ways; signed data stored as unsigned
    /// spans a much narrower range once reinterpreted.
    pub fn detect_sample_format(&self, index: usize) -> Result<SampleFormat> {
        let unsigned = self.read_frame_as(index, SampleFormat::Unsigned)?;
        let signed = self.read_frame_as(index, SampleFormat::Signed)?;
        let unsigned_range = value_range(&unsigned.data);
        let signed_range = value_range(&signed.data);
        debug!(signed_range, unsigned_range, "Sample range check");

        if signed_range < SIGNED_RANGE_RATIO * unsigned_range {
            warn!(
                signed_range,
                unsigned_range,
                bits = self.header.bytes_per_pixel_plane() * 8,
                "Guessed that data is signed based on its sample range, reinterpreting"
            );
            Ok(SampleFormat::Signed)
        } else {
            Ok(SampleFormat::Unsigned)
        }
    }

    /// Decode the frames selected by `skip` (all frames if `None`) into a
    /// contiguous stack, reinterpreting signed data when detected.
    pub fn read_stack(&self, skip: Option<FrameSkip>) -> Result<FrameStack> {
        let skip = skip.unwrap_or_default();
        let indices: Vec<usize> = skip.indices(self.frame_count()).collect();
        let first = *indices.first().ok_or(MotionError::EmptySequence)?;
        let format = self.detect_sample_format(first)?;

        let (h, w) = (self.header.height as usize, self.header.width as usize);
        let mut data = Array3::<f32>::zeros((indices.len(), h, w));
        for (slot, &index) in indices.iter().enumerate() {
            let raw = self.frame_raw(index)?;
            data.index_axis_mut(Axis(0), slot)
                .assign(&decode_plane(raw, &self.header, format));
        }

        FrameStack::from_array(data, self.header.bytes_per_pixel_plane() as u8 * 8)
    }

    /// Iterator over all frames.
    pub fn frames(&self) -> impl Iterator<Item = Result<Frame>> + '_ {
        (0..self.frame_count()).map(move |i| self.read_frame(i))
    }
}

fn parse_header(buf: &[u8]) -> Result<SerHeader> {
    let mut cursor = std::io::Cursor::new(&buf[14..]); // skip magic

    let _lu_id = cursor.read_i32::<LittleEndian>()?;
    let color_id = cursor.read_i32::<LittleEndian>()?;
    let le_flag = cursor.read_i32::<LittleEndian>()?;
    let width = cursor.read_i32::<LittleEndian>()? as u32;
    let height = cursor.read_i32::<LittleEndian>()? as u32;
    let pixel_depth = cursor.read_i32::<LittleEndian>()? as u32;
    let frame_count = cursor.read_i32::<LittleEndian>()? as u32;

    let observer = read_fixed_string(&buf[42..82]);
    let instrument = read_fixed_string(&buf[82..122]);
    let telescope = read_fixed_string(&buf[122..162]);

    let mut cursor = std::io::Cursor::new(&buf[162..]);
    let date_time = cursor.read_u64::<LittleEndian>()?;
    let date_time_utc = cursor.read_u64::<LittleEndian>()?;

    if width == 0 || height == 0 {
        return Err(MotionError::InvalidDimensions { width, height });
    }
    if pixel_depth == 0 || pixel_depth > 16 {
        return Err(MotionError::InvalidSer(format!(
            "Unsupported pixel depth {pixel_depth}"
        )));
    }

    // 0 is treated as little-endian, as most capture software writes it.
    let little_endian = le_flag != 1;

    Ok(SerHeader {
        color_id,
        little_endian,
        width,
        height,
        pixel_depth,
        frame_count,
        observer,
        instrument,
        telescope,
        date_time,
        date_time_utc,
    })
}

fn read_fixed_string(buf: &[u8]) -> String {
    String::from_utf8_lossy(buf)
        .trim_end_matches('\0')
        .trim()
        .to_string()
}

/// Decode one plane (green for RGB/BGR) of an interleaved frame.
fn decode_plane(raw: &[u8], header: &SerHeader, format: SampleFormat) -> Array2<f32> {
    let h = header.height as usize;
    let w = header.width as usize;
    let bytes_per_sample = header.bytes_per_pixel_plane();
    let planes = header.planes_per_pixel();
    let plane_index = if planes == 1 { 0 } else { 1 };

    Array2::from_shape_fn((h, w), |(row, col)| {
        let idx = ((row * w + col) * planes + plane_index) * bytes_per_sample;
        if bytes_per_sample == 1 {
            match format {
                SampleFormat::Unsigned => raw[idx] as f32,
                SampleFormat::Signed => raw[idx] as i8 as f32,
            }
        } else {
            let pair = [raw[idx], raw[idx + 1]];
            let value = if header.little_endian {
                u16::from_le_bytes(pair)
            } else {
                u16::from_be_bytes(pair)
            };
            match format {
                SampleFormat::Unsigned => value as f32,
                SampleFormat::Signed => value as i16 as f32,
            }
        }
    })
}

fn value_range(data: &Array2<f32>) -> f64 {
    let (min, max) = data
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    (max - min) as f64
}
