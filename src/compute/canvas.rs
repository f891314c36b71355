//! Square ARGB pixel canvas and the compositing primitives a flush needs.

use super::geometry::{Bowl, Point};

/// Opaque black, used outside the rim and for the drain.
pub const OPAQUE_BLACK: u32 = 0xFF00_0000;
/// Opaque white, the bowl background.
pub const OPAQUE_WHITE: u32 = 0xFFFF_FFFF;

/// A disc in continuous canvas coordinates.
///
/// A pixel belongs to the disc when its center does.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Disc {
    pub cx: f64,
    pub cy: f64,
    pub radius: f64,
}

impl Disc {
    pub fn new(cx: f64, cy: f64, radius: f64) -> Self {
        Self { cx, cy, radius }
    }

    /// Disc inscribed in the square of side `side` with top-left `corner`.
    pub fn inscribed(corner: Point, side: u32) -> Self {
        let r = side as f64 / 2.0;
        Self::new(corner.x as f64 + r, corner.y as f64 + r, r)
    }

    /// Rim of the bowl.
    pub fn rim(bowl: &Bowl) -> Self {
        Self::new(bowl.center.x as f64, bowl.center.y as f64, bowl.radius as f64)
    }

    /// Drain of the bowl.
    pub fn hole(bowl: &Bowl) -> Self {
        Self::new(
            bowl.center.x as f64,
            bowl.center.y as f64,
            bowl.hole_radius as f64,
        )
    }

    /// Whether pixel `(px, py)` is covered.
    #[inline]
    pub fn covers(&self, px: i32, py: i32) -> bool {
        let dx = px as f64 + 0.5 - self.cx;
        let dy = py as f64 + 0.5 - self.cy;
        dx * dx + dy * dy < self.radius * self.radius
    }

    /// Pixel rows/columns that can be covered, clamped to `[0, size)`.
    fn span(&self, size: i32) -> (i32, i32, i32, i32) {
        let x0 = ((self.cx - self.radius).floor() as i32).max(0);
        let y0 = ((self.cy - self.radius).floor() as i32).max(0);
        let x1 = ((self.cx + self.radius).ceil() as i32).min(size);
        let y1 = ((self.cy + self.radius).ceil() as i32).min(size);
        (x0, y0, x1, y1)
    }
}

/// Square pixel buffer, row-major ARGB.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    size: u32,
    pixels: Vec<u32>,
}

impl Canvas {
    /// Canvas filled with a single color.
    pub fn new(size: u32, fill: u32) -> Self {
        Self {
            size,
            pixels: vec![fill; size as usize * size as usize],
        }
    }

    /// Wrap an existing buffer. Returns `None` when the length is not `size * size`.
    pub fn from_pixels(size: u32, pixels: Vec<u32>) -> Option<Self> {
        (pixels.len() == size as usize * size as usize).then_some(Self { size, pixels })
    }

    /// Empty bowl: black outside the rim, white inside.
    pub fn bowl(size: u32, rim: &Disc) -> Self {
        let mut canvas = Self::new(size, OPAQUE_BLACK);
        canvas.fill_disc(rim, OPAQUE_WHITE);
        canvas
    }

    #[inline]
    pub fn size(&self) -> u32 {
        self.size
    }

    #[inline]
    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<u32> {
        self.pixels
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        let size = self.size as i32;
        (x >= 0 && x < size && y >= 0 && y < size).then(|| y as usize * self.size as usize + x as usize)
    }

    /// Pixel at `(x, y)`, or `None` off canvas.
    #[inline]
    pub fn get(&self, x: i32, y: i32) -> Option<u32> {
        self.index(x, y).map(|i| self.pixels[i])
    }

    /// Set pixel at `(x, y)`; off-canvas writes are dropped.
    #[inline]
    pub fn set(&mut self, x: i32, y: i32, color: u32) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = color;
        }
    }

    /// Fill every pixel covered by `disc`.
    pub fn fill_disc(&mut self, disc: &Disc, color: u32) {
        let (x0, y0, x1, y1) = disc.span(self.size as i32);
        for y in y0..y1 {
            for x in x0..x1 {
                if disc.covers(x, y) {
                    self.set(x, y, color);
                }
            }
        }
    }

    /// Copy the `side` x `side` square whose top-left is `corner`.
    ///
    /// Off-canvas pixels read as opaque black.
    pub fn region(&self, corner: Point, side: u32) -> Vec<u32> {
        let side = side as i32;
        let mut out = Vec::with_capacity((side * side) as usize);
        for dy in 0..side {
            for dx in 0..side {
                out.push(
                    self.get(corner.x + dx, corner.y + dy)
                        .unwrap_or(OPAQUE_BLACK),
                );
            }
        }
        out
    }

    /// Draw a square tile with top-left `corner`, masked to its inscribed
    /// circle and to `clip`.
    pub fn draw_round_tile(&mut self, tile: &[u32], side: u32, corner: Point, clip: &Disc) {
        let mask = Disc::inscribed(corner, side);
        let side = side as i32;
        for dy in 0..side {
            let y = corner.y + dy;
            for dx in 0..side {
                let x = corner.x + dx;
                if mask.covers(x, y) && clip.covers(x, y) {
                    self.set(x, y, tile[(dy * side + dx) as usize]);
                }
            }
        }
    }
}
