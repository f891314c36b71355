//! Schema module - Generation parameters and source image types.

mod config;
mod source;

pub use config::*;
pub use source::*;
