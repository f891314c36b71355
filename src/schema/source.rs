//! Source images and their placement on the square canvas.

use std::path::Path;

use image::RgbaImage;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::compute::{Canvas, OPAQUE_BLACK, OPAQUE_WHITE};
use crate::error::{FlushError, Result};

/// How a source image is fitted to the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Placement {
    /// Centered at native resolution; whatever overflows is cut off.
    #[default]
    Clip,
    /// Scaled so the longer side spans the canvas, centered on the other axis.
    Scale,
}

/// A decoded source image in ARGB.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
}

impl SourceImage {
    /// Wrap row-major ARGB pixels. `None` when the length does not match.
    pub fn new(width: u32, height: u32, pixels: Vec<u32>) -> Option<Self> {
        (pixels.len() == width as usize * height as usize).then_some(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn from_rgba(image: &RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        let pixels = image
            .pixels()
            .map(|p| {
                let [r, g, b, a] = p.0;
                (a as u32) << 24 | (r as u32) << 16 | (g as u32) << 8 | b as u32
            })
            .collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Decode an image file (PNG or JPEG).
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let decoded = image::open(path)
            .map_err(|e| FlushError::Resource(format!("{}: {}", path.display(), e)))?;
        let source = Self::from_rgba(&decoded.into_rgba8());
        debug!(
            "Loaded {} ({}x{})",
            path.display(),
            source.width,
            source.height
        );
        Ok(source)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Side of the largest square that fits, the default canvas size.
    pub fn fit_size(&self) -> u32 {
        self.width.min(self.height)
    }

    #[inline]
    fn pixel(&self, x: u32, y: u32) -> u32 {
        self.pixels[(y * self.width + x) as usize]
    }

    /// Render onto a `size` x `size` opaque canvas.
    ///
    /// Outside the image the canvas is black. Inside it the image is
    /// composited over white.
    pub fn render_canvas(&self, size: u32, placement: Placement) -> Canvas {
        let mut canvas = Canvas::new(size, OPAQUE_BLACK);
        if self.width == 0 || self.height == 0 {
            return canvas;
        }

        let (left, top, dest_w, dest_h) = self.destination(size, placement);
        for dy in 0..dest_h {
            let sy = (dy as u64 * self.height as u64 / dest_h as u64) as u32;
            for dx in 0..dest_w {
                let sx = (dx as u64 * self.width as u64 / dest_w as u64) as u32;
                canvas.set(
                    left + dx,
                    top + dy,
                    over_white(self.pixel(sx, sy)),
                );
            }
        }
        canvas
    }

    /// Destination rectangle as `(left, top, width, height)`.
    fn destination(&self, size: u32, placement: Placement) -> (i32, i32, i32, i32) {
        let size = size as i32;
        let (w, h) = (self.width as i32, self.height as i32);
        match placement {
            Placement::Clip => {
                let radius = size / 2;
                (radius - w / 2, radius - h / 2, w, h)
            }
            Placement::Scale if w > h => {
                let half = ((h / 2) as f64 * (size as f64 / w as f64)) as i32;
                (0, size / 2 - half, size, (2 * half).max(1))
            }
            Placement::Scale => {
                let half = ((w / 2) as f64 * (size as f64 / h as f64)) as i32;
                (size / 2 - half, 0, (2 * half).max(1), size)
            }
        }
    }
}

/// Alpha-blend an ARGB pixel over opaque white.
fn over_white(argb: u32) -> u32 {
    let alpha = argb >> 24;
    if alpha == 0xFF {
        return argb;
    }
    if alpha == 0 {
        return OPAQUE_WHITE;
    }
    let blend = |shift: u32| {
        let c = (argb >> shift) & 0xFF;
        (c * alpha + 0xFF * (0xFF - alpha) + 127) / 0xFF
    };
    OPAQUE_BLACK | blend(16) << 16 | blend(8) << 8 | blend(0)
}
