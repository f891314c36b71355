//! Decomposition of the source canvas into round fragments.

use log::{debug, warn};
use rayon::prelude::*;

use super::canvas::Canvas;
use super::geometry::{Bowl, Point};
use super::spiral::SpiralSet;
use crate::schema::FlushConfig;

/// A tile of the source image travelling along a spiral.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    /// Position in lattice order; stable for the fragment's lifetime.
    pub id: usize,
    /// Tile pixels, `side * side`, row-major ARGB.
    pub image: Vec<u32>,
    /// Tile center on the canvas.
    pub location: Point,
    /// Index of the assigned spiral.
    pub spiral: usize,
    /// Current index into the assigned spiral's points.
    pub path_index: usize,
}

impl Fragment {
    /// Top-left corner of the tile for a fragment of side `side`.
    #[inline]
    pub fn corner(&self, side: u32) -> Point {
        let half = (side / 2) as i32;
        Point::new(self.location.x - half, self.location.y - half)
    }
}

/// Lattice of fragment centers inside the rim, x-major.
pub fn lattice(config: &FlushConfig) -> Vec<Point> {
    let bowl = Bowl::from_config(config);
    let start = (config.fragment_size / 2) as i32;
    let end = config.size as i32 - config.fragment_size as i32;
    let stride = config.fragment_stagger().max(1) as usize;

    let mut points = Vec::new();
    for x in (start..end).step_by(stride) {
        for y in (start..end).step_by(stride) {
            let p = Point::new(x, y);
            if bowl.distance_from_center(p) < bowl.radius as f64 {
                points.push(p);
            }
        }
    }
    points
}

/// Cut `source` into fragments and bind each to its nearest spiral point.
///
/// Fragments with no spiral point to follow are absorbed on the spot and
/// never returned.
pub fn decompose(source: &Canvas, config: &FlushConfig, spirals: &SpiralSet) -> Vec<Fragment> {
    let side = config.fragment_size;
    let half = (side / 2) as i32;
    let centers = lattice(config);

    let build = |(id, &location): (usize, &Point)| -> Option<Fragment> {
        let (spiral, path_index) = spirals.nearest(location)?;
        let corner = Point::new(location.x - half, location.y - half);
        Some(Fragment {
            id,
            image: source.region(corner, side),
            location,
            spiral,
            path_index,
        })
    };

    let assigned: Vec<Option<Fragment>> = centers.par_iter().enumerate().map(build).collect();

    let fragments: Vec<Fragment> = assigned.into_iter().flatten().collect();
    if fragments.len() < centers.len() {
        warn!(
            "{} fragments had no spiral point and were absorbed immediately",
            centers.len() - fragments.len()
        );
    }
    debug!(
        "Decomposed {}x{} canvas into {} fragments of side {}",
        config.size,
        config.size,
        fragments.len(),
        side
    );

    fragments
}
