//! Binary format definitions for flush cassettes.
//!
//! Everything here works on the logical (uncompressed) stream; the recorder
//! and reader wrap it in an LZ4 frame stream.

use std::io::{self, Read, Write};

use crate::error::{FlushError, Result};

/// Magic bytes identifying a flush cassette.
pub const CASSETTE_MAGIC: &[u8; 4] = b"FLSH";

/// Current format version.
pub const CASSETTE_VERSION: u16 = 1;

/// Largest canvas side a reader will accept.
pub const MAX_CASSETTE_SIZE: u32 = 16384;

/// Longest title or sound reference a reader will accept.
const MAX_STRING_LEN: u32 = 1 << 20;

/// One animation frame: a full canvas and how long to show it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Row-major ARGB pixels, `size * size` of them.
    pub pixels: Vec<u32>,
    /// Display time in milliseconds.
    pub show_millis: u32,
}

impl Frame {
    pub fn new(pixels: Vec<u32>, show_millis: u32) -> Self {
        Self {
            pixels,
            show_millis,
        }
    }
}

/// Cassette header.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CassetteHeader {
    /// Display title.
    pub title: Option<String>,
    /// Reference to a sound clip played alongside the animation.
    pub sound_ref: Option<String>,
    /// Canvas side in pixels.
    pub size: u32,
}

impl CassetteHeader {
    pub fn new(size: u32) -> Self {
        Self {
            title: None,
            sound_ref: None,
            size,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_sound_ref(mut self, sound_ref: impl Into<String>) -> Self {
        self.sound_ref = Some(sound_ref.into());
        self
    }

    /// Pixels per frame.
    #[inline]
    pub fn frame_len(&self) -> usize {
        self.size as usize * self.size as usize
    }

    /// Bytes per frame record (pixels plus duration).
    #[inline]
    pub fn record_size(&self) -> usize {
        self.frame_len() * 4 + 4
    }

    /// Write header to output.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let size = i32::try_from(self.size).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, "Cassette size exceeds i32")
        })?;
        w.write_all(CASSETTE_MAGIC)?;
        w.write_all(&CASSETTE_VERSION.to_le_bytes())?;
        write_opt_string(w, self.title.as_deref())?;
        write_opt_string(w, self.sound_ref.as_deref())?;
        w.write_all(&size.to_le_bytes())?;
        Ok(())
    }

    /// Read header from input.
    pub fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        let mut magic = [0u8; 4];
        read_exact(r, &mut magic, "magic")?;
        if &magic != CASSETTE_MAGIC {
            return Err(FlushError::Corruption("Invalid cassette magic bytes".into()));
        }

        let mut buf2 = [0u8; 2];
        read_exact(r, &mut buf2, "version")?;
        let version = u16::from_le_bytes(buf2);
        if version != CASSETTE_VERSION {
            return Err(FlushError::Corruption(format!(
                "Unsupported cassette version: {}",
                version
            )));
        }

        let title = read_opt_string(r, "title")?;
        let sound_ref = read_opt_string(r, "sound reference")?;

        let mut buf4 = [0u8; 4];
        read_exact(r, &mut buf4, "size")?;
        let size = i32::from_le_bytes(buf4);
        if size <= 0 || size as u32 > MAX_CASSETTE_SIZE {
            return Err(FlushError::Corruption(format!(
                "Invalid cassette size: {}",
                size
            )));
        }

        Ok(Self {
            title,
            sound_ref,
            size: size as u32,
        })
    }
}

fn write_opt_string<W: Write>(w: &mut W, value: Option<&str>) -> io::Result<()> {
    match value {
        None => w.write_all(&[0]),
        Some(s) => {
            let len = u32::try_from(s.len())
                .ok()
                .filter(|&len| len <= MAX_STRING_LEN)
                .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "String too long"))?;
            w.write_all(&[1])?;
            w.write_all(&len.to_le_bytes())?;
            w.write_all(s.as_bytes())
        }
    }
}

fn read_opt_string<R: Read>(r: &mut R, field: &str) -> Result<Option<String>> {
    let mut present = [0u8; 1];
    read_exact(r, &mut present, field)?;
    match present[0] {
        0 => Ok(None),
        1 => {
            let mut buf4 = [0u8; 4];
            read_exact(r, &mut buf4, field)?;
            let len = u32::from_le_bytes(buf4);
            if len > MAX_STRING_LEN {
                return Err(FlushError::Corruption(format!(
                    "{} length {} exceeds limit",
                    field, len
                )));
            }
            let mut bytes = vec![0u8; len as usize];
            read_exact(r, &mut bytes, field)?;
            String::from_utf8(bytes)
                .map(Some)
                .map_err(|_| FlushError::Corruption(format!("{} is not valid UTF-8", field)))
        }
        other => Err(FlushError::Corruption(format!(
            "Invalid presence flag {} for {}",
            other, field
        ))),
    }
}

fn read_exact<R: Read>(r: &mut R, buf: &mut [u8], field: &str) -> Result<()> {
    r.read_exact(buf)
        .map_err(|e| FlushError::from_read(e, &format!("reading {}", field)))
}

/// Write one frame record.
pub fn write_record<W: Write>(w: &mut W, frame: &Frame, buffer: &mut Vec<u8>) -> io::Result<()> {
    let show = i32::try_from(frame.show_millis).map_err(|_| {
        io::Error::new(io::ErrorKind::InvalidInput, "Frame duration exceeds i32")
    })?;
    buffer.clear();
    encode_pixels(&frame.pixels, buffer);
    buffer.extend_from_slice(&show.to_le_bytes());
    w.write_all(buffer)
}

/// Read one frame record of `frame_len` pixels.
///
/// Returns `Ok(None)` when the stream ends exactly on a record boundary;
/// a stream ending inside a record is corruption.
///
/// `buffer` grows with the bytes actually read, so a header claiming a huge
/// size cannot force a huge allocation on a short stream.
pub fn read_record<R: Read>(
    r: &mut R,
    frame_len: usize,
    buffer: &mut Vec<u8>,
) -> Result<Option<Frame>> {
    let record_size = frame_len * 4 + 4;
    buffer.clear();

    let n = r
        .by_ref()
        .take(record_size as u64)
        .read_to_end(buffer)
        .map_err(|e| FlushError::from_read(e, "reading frame"))?;
    if n == 0 {
        return Ok(None);
    }
    if n < record_size {
        return Err(FlushError::Corruption(format!(
            "Frame record ends after {} of {} bytes",
            n, record_size
        )));
    }

    let mut pixels = vec![0u32; frame_len];
    decode_pixels(&buffer[..frame_len * 4], &mut pixels)?;

    let tail = &buffer[frame_len * 4..];
    let show = i32::from_le_bytes([tail[0], tail[1], tail[2], tail[3]]);
    if show < 0 {
        return Err(FlushError::Corruption(format!(
            "Negative frame duration: {}",
            show
        )));
    }

    Ok(Some(Frame::new(pixels, show as u32)))
}

/// Encode pixels as little-endian bytes, appending to `out`.
pub fn encode_pixels(pixels: &[u32], out: &mut Vec<u8>) {
    out.reserve(pixels.len() * 4);
    for &p in pixels {
        out.extend_from_slice(&p.to_le_bytes());
    }
}

/// Decode little-endian bytes into pixels.
pub fn decode_pixels(bytes: &[u8], output: &mut [u32]) -> Result<()> {
    if bytes.len() != output.len() * 4 {
        return Err(FlushError::Corruption(format!(
            "Frame size mismatch: {} bytes vs {} pixels",
            bytes.len(),
            output.len()
        )));
    }
    for (v, b) in output.iter_mut().zip(bytes.chunks_exact(4)) {
        *v = u32::from_le_bytes([b[0], b[1], b[2], b[3]]);
    }
    Ok(())
}
