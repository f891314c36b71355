//! Compute module - Geometry, spirals, fragments and the flush stepper.

mod canvas;
mod fragment;
mod generate;
mod geometry;
mod rng;
mod spiral;
mod stepper;

pub use canvas::*;
pub use fragment::*;
pub use generate::*;
pub use geometry::*;
pub use rng::*;
pub use spiral::*;
pub use stepper::*;
