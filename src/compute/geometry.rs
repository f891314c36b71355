//! Integer plane geometry for the bowl.
//!
//! Positions are whole pixels. Transforms run in `f64` and convert back by
//! truncation toward zero, so a given seed always reproduces the same path.

use crate::schema::FlushConfig;

/// A pixel position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    #[inline]
    pub fn distance(self, other: Point) -> f64 {
        let dx = self.x as f64 - other.x as f64;
        let dy = self.y as f64 - other.y as f64;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Sine and cosine with quarter turns snapped to exact values.
fn sin_cos(degrees: f64) -> (f64, f64) {
    let (mut sin, mut cos) = degrees.to_radians().sin_cos();
    if sin == 1.0 || sin == -1.0 {
        cos = 0.0;
    } else if cos == 1.0 || cos == -1.0 {
        sin = 0.0;
    }
    (sin, cos)
}

/// Rotate `point` about `center` by `degrees` and scale its offset by `scale`.
pub fn rotate_scale(point: Point, center: Point, degrees: f64, scale: f64) -> Point {
    let (sin, cos) = sin_cos(degrees);
    let dx = (point.x - center.x) as f64;
    let dy = (point.y - center.y) as f64;
    let x = scale * (dx * cos - dy * sin);
    let y = scale * (dx * sin + dy * cos);
    Point::new(x as i32 + center.x, y as i32 + center.y)
}

/// Move `from` toward `to` by fraction `t`, per axis.
pub fn converge(from: Point, to: Point, t: f64) -> Point {
    let x = from.x as f64 + (to.x - from.x) as f64 * t;
    let y = from.y as f64 + (to.y - from.y) as f64 * t;
    Point::new(x as i32, y as i32)
}

/// Fixed geometry of one flush: canvas bounds, rim and drain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bowl {
    /// Canvas side in pixels.
    pub size: i32,
    /// Canvas center.
    pub center: Point,
    /// Rim radius; fragments at or beyond it escape.
    pub radius: i32,
    /// Drain radius; fragments at or inside it are absorbed.
    pub hole_radius: i32,
}

impl Bowl {
    pub fn from_config(config: &FlushConfig) -> Self {
        let half = config.radius();
        Self {
            size: config.size as i32,
            center: Point::new(half, half),
            radius: half,
            hole_radius: config.hole_radius(),
        }
    }

    /// Whether `p` lies on the canvas.
    #[inline]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= 0 && p.x < self.size && p.y >= 0 && p.y < self.size
    }

    /// Distance from the canvas center.
    #[inline]
    pub fn distance_from_center(&self, p: Point) -> f64 {
        p.distance(self.center)
    }

    /// Whether `p` is on the canvas and strictly between drain and rim.
    #[inline]
    pub fn in_play(&self, p: Point) -> bool {
        if !self.contains(p) {
            return false;
        }
        let d = self.distance_from_center(p);
        d > self.hole_radius as f64 && d < self.radius as f64
    }
}
