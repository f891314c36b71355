//! Configuration types for flush generation parameters.

use serde::{Deserialize, Serialize};

use crate::animation::MAX_CASSETTE_SIZE;

/// Default canvas size when nothing else decides it.
pub const DEFAULT_SIZE: u32 = 300;
/// Hole diameter as a fraction of the canvas size.
pub const HOLE_SCALE: f64 = 0.1;
/// Fragment side as a fraction of the canvas size.
pub const FRAGMENT_SIZE_SCALE: f64 = 0.03;
/// Largest spiral scale. Anything at or above 1.0 can orbit forever.
pub const MAX_SPIRAL_SCALE: f64 = 0.99;

/// What the final frame of a flush cycle shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RechargeMode {
    /// Empty bowl: background and hole only.
    #[default]
    Blank,
    /// The undisturbed source canvas, so a looping player restarts cleanly.
    Restore,
}

/// Top-level flush generation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlushConfig {
    /// Canvas side in pixels (the "bowl").
    pub size: u32,
    /// Hole diameter in pixels.
    pub hole_size: u32,
    /// Fragment side in pixels.
    pub fragment_size: u32,
    /// Rotation applied per tick, in degrees (0-360).
    pub rotation_increment: u32,
    /// Display time of each flushing frame.
    pub flush_millis: u32,
    /// Display time of the final recharge frame.
    pub recharge_millis: u32,
    /// Number of spiral swirls.
    pub num_spiral: usize,
    /// Smallest per-spiral scale factor (0.00-0.99, 0.01 steps).
    pub min_spiral: f64,
    /// Largest per-spiral scale factor (0.00-0.99, 0.01 steps).
    pub max_spiral: f64,
    /// Pull toward the assigned spiral's next point (0.0-1.0).
    pub spiral_converge: f64,
    /// RNG seed. `None` draws one from entropy.
    #[serde(default)]
    pub random_seed: Option<u64>,
    /// Content of the recharge frame.
    #[serde(default)]
    pub recharge: RechargeMode,
}

impl Default for FlushConfig {
    fn default() -> Self {
        Self::for_size(DEFAULT_SIZE)
    }
}

impl FlushConfig {
    /// Default parameters with hole and fragment sizes derived from `size`.
    pub fn for_size(size: u32) -> Self {
        Self {
            size,
            hole_size: (size as f64 * HOLE_SCALE) as u32,
            fragment_size: ((size as f64 * FRAGMENT_SIZE_SCALE) as u32).max(1),
            rotation_increment: 15,
            flush_millis: 100,
            recharge_millis: 3000,
            num_spiral: 30,
            min_spiral: 0.50,
            max_spiral: 0.90,
            spiral_converge: 0.25,
            random_seed: None,
            recharge: RechargeMode::Blank,
        }
    }

    /// Radius of the playable disc.
    #[inline]
    pub fn radius(&self) -> i32 {
        (self.size / 2) as i32
    }

    /// Radius of the drain.
    #[inline]
    pub fn hole_radius(&self) -> i32 {
        (self.hole_size / 2) as i32
    }

    /// Lattice stride between fragment centers.
    ///
    /// Slightly less than the fragment side so circular fragments overlap
    /// and leave no seams.
    #[inline]
    pub fn fragment_stagger(&self) -> i32 {
        (self.fragment_size as f64 / std::f64::consts::SQRT_2).ceil() as i32
    }

    /// Number of pixels in one frame.
    #[inline]
    pub fn frame_len(&self) -> usize {
        self.size as usize * self.size as usize
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.size == 0 || self.size > MAX_CASSETTE_SIZE {
            return Err(ConfigError::InvalidSize(self.size));
        }
        if self.hole_size == 0 || self.hole_size > self.size {
            return Err(ConfigError::InvalidHoleSize {
                hole_size: self.hole_size,
                size: self.size,
            });
        }
        let hole_radius = self.hole_radius();
        if hole_radius <= 0 || hole_radius >= self.radius() {
            return Err(ConfigError::InvalidHoleRadius {
                hole_radius,
                radius: self.radius(),
            });
        }
        if self.fragment_size == 0 || self.fragment_size > self.size {
            return Err(ConfigError::InvalidFragmentSize {
                fragment_size: self.fragment_size,
                size: self.size,
            });
        }
        if self.rotation_increment > 360 {
            return Err(ConfigError::InvalidRotation(self.rotation_increment));
        }
        check_duration("flush_millis", self.flush_millis)?;
        check_duration("recharge_millis", self.recharge_millis)?;
        if self.num_spiral == 0 {
            return Err(ConfigError::InvalidSpiralCount);
        }
        check_spiral_scale("min_spiral", self.min_spiral)?;
        check_spiral_scale("max_spiral", self.max_spiral)?;
        if self.min_spiral > self.max_spiral {
            return Err(ConfigError::SpiralScaleOrder {
                min: self.min_spiral,
                max: self.max_spiral,
            });
        }
        if !(0.0..=1.0).contains(&self.spiral_converge) {
            return Err(ConfigError::InvalidConvergence(self.spiral_converge));
        }
        Ok(())
    }
}

/// Frame durations are stored as non-negative i32 milliseconds.
fn check_duration(name: &'static str, millis: u32) -> Result<(), ConfigError> {
    if i32::try_from(millis).is_err() {
        return Err(ConfigError::DurationTooLong { name, millis });
    }
    Ok(())
}

fn check_spiral_scale(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if !(0.0..=MAX_SPIRAL_SCALE).contains(&value) {
        return Err(ConfigError::SpiralScaleRange { name, value });
    }
    let hundredths = value * 100.0;
    if (hundredths - hundredths.round()).abs() > 1e-6 {
        return Err(ConfigError::SpiralScaleStep { name, value });
    }
    Ok(())
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Canvas size {0} is out of range")]
    InvalidSize(u32),
    #[error("Hole size {hole_size} must be in 1..={size}")]
    InvalidHoleSize { hole_size: u32, size: u32 },
    #[error("Hole radius {hole_radius} must be strictly between 0 and radius {radius}")]
    InvalidHoleRadius { hole_radius: i32, radius: i32 },
    #[error("Fragment size {fragment_size} must be in 1..={size}")]
    InvalidFragmentSize { fragment_size: u32, size: u32 },
    #[error("Rotation increment {0} must be in 0..=360 degrees")]
    InvalidRotation(u32),
    #[error("{name} {millis} exceeds the longest storable duration")]
    DurationTooLong { name: &'static str, millis: u32 },
    #[error("Spiral count must be non-zero")]
    InvalidSpiralCount,
    #[error("{name} {value} must be in 0.00..=0.99")]
    SpiralScaleRange { name: &'static str, value: f64 },
    #[error("{name} {value} must be a multiple of 0.01")]
    SpiralScaleStep { name: &'static str, value: f64 },
    #[error("min_spiral {min} must not exceed max_spiral {max}")]
    SpiralScaleOrder { min: f64, max: f64 },
    #[error("Spiral convergence {0} must be in 0.0..=1.0")]
    InvalidConvergence(f64),
}
