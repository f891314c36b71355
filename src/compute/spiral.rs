//! Spiral paths that steer fragments toward the drain.
//!
//! Each spiral starts on the rim at a random angle and repeatedly rotates
//! and contracts about the center. Its own scale factor sets how tightly it
//! winds, so a set of spirals with different scales reads as turbulence.

use log::debug;

use super::geometry::{Bowl, Point, rotate_scale};
use super::rng::FlushRng;
use crate::schema::FlushConfig;

/// Upper bound on traced points per spiral, in multiples of the canvas size.
///
/// Contracting spirals stop long before this; it only bounds scales at or
/// above 1.0 supplied through [`SpiralPath::trace`].
const MAX_PATH_FACTOR: usize = 64;

/// One traced spiral.
#[derive(Debug, Clone, PartialEq)]
pub struct SpiralPath {
    points: Vec<Point>,
    scale: f64,
}

impl SpiralPath {
    /// Build a path from precomputed points.
    pub fn new(points: Vec<Point>, scale: f64) -> Self {
        Self { points, scale }
    }

    /// Trace a spiral starting on the rim at `start_degrees`.
    ///
    /// The start point is always kept. Tracing stops before the first point
    /// that leaves the canvas, reaches the drain, or reaches the rim.
    pub fn trace(bowl: &Bowl, start_degrees: f64, rotation: f64, scale: f64) -> Self {
        let rim_point = Point::new(bowl.center.x, bowl.center.y + bowl.radius);
        let mut current = rotate_scale(rim_point, bowl.center, start_degrees, 1.0);
        let limit = bowl.size.max(1) as usize * MAX_PATH_FACTOR;

        let mut points = Vec::new();
        loop {
            points.push(current);
            if points.len() >= limit {
                break;
            }
            let next = rotate_scale(current, bowl.center, rotation, scale);
            if !bowl.in_play(next) {
                break;
            }
            current = next;
        }

        Self { points, scale }
    }

    #[inline]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    #[inline]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Point at `index`, if the path is that long.
    #[inline]
    pub fn point(&self, index: usize) -> Option<Point> {
        self.points.get(index).copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// The full set of spirals for one flush, in generation order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpiralSet {
    spirals: Vec<SpiralPath>,
}

impl SpiralSet {
    /// Generate `config.num_spiral` spirals.
    ///
    /// Per spiral, the scale is drawn before the start angle; changing that
    /// order changes every seeded run.
    pub fn build(config: &FlushConfig, rng: &mut FlushRng) -> Self {
        let bowl = Bowl::from_config(config);
        let rotation = config.rotation_increment as f64;

        let spirals: Vec<SpiralPath> = (0..config.num_spiral)
            .map(|_| {
                let scale = rng.spiral_scale(config.min_spiral, config.max_spiral);
                let start = rng.start_angle() as f64;
                SpiralPath::trace(&bowl, start, rotation, scale)
            })
            .collect();

        debug!(
            "Traced {} spirals, {} points total",
            spirals.len(),
            spirals.iter().map(SpiralPath::len).sum::<usize>()
        );

        Self { spirals }
    }

    /// Wrap precomputed spirals.
    pub fn from_paths(spirals: Vec<SpiralPath>) -> Self {
        Self { spirals }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.spirals.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.spirals.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&SpiralPath> {
        self.spirals.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SpiralPath> {
        self.spirals.iter()
    }

    /// Nearest spiral point to `location` as `(spiral, path_index)`.
    ///
    /// Scans spirals in order, then points in path order; ties keep the
    /// first found. `None` only when every path is empty.
    pub fn nearest(&self, location: Point) -> Option<(usize, usize)> {
        let mut best: Option<(usize, usize, f64)> = None;
        for (s, spiral) in self.spirals.iter().enumerate() {
            for (i, &p) in spiral.points.iter().enumerate() {
                let d = location.distance(p);
                match best {
                    Some((_, _, best_d)) if d >= best_d => {}
                    _ => best = Some((s, i, d)),
                }
            }
        }
        best.map(|(s, i, _)| (s, i))
    }
}
