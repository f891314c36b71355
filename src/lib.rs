//! Flush Cassette - Spiral-drain image disintegration animations.
//!
//! An image is cut into small round fragments that swirl along randomly
//! scaled spirals into a central drain. Every tick is captured as a frame,
//! and the frames are recorded to a compact cassette for later playback.
//!
//! # Architecture
//!
//! - `schema`: Generation parameters and source image placement
//! - `compute`: Geometry, spirals, fragments and the flush stepper
//! - `animation`: Cassette format, recorder, player and deck
//!
//! # Example
//!
//! ```rust,no_run
//! use flush_cassette::{
//!     animation::{Cassette, CassetteHeader},
//!     cancel::CancelToken,
//!     compute::{FlushStepper, record_to_file},
//!     schema::{FlushConfig, Placement, SourceImage},
//! };
//!
//! let source = SourceImage::open("photo.png")?;
//! let config = FlushConfig {
//!     random_seed: Some(42),
//!     ..FlushConfig::for_size(source.fit_size())
//! };
//! let canvas = source.render_canvas(config.size, Placement::Clip);
//!
//! let header = CassetteHeader::new(config.size).with_title("Photo");
//! let stepper = FlushStepper::new(config, canvas)?;
//! record_to_file(stepper, header, "photo.flsh", &CancelToken::new())?;
//!
//! let cassette = Cassette::open("photo.flsh")?;
//! let mut cursor = cassette.cursor();
//! while let Some(frame) = cursor.current() {
//!     println!("{} ms", frame.show_millis);
//!     cursor.next();
//! }
//! # Ok::<(), flush_cassette::FlushError>(())
//! ```

pub mod animation;
pub mod cancel;
pub mod compute;
pub mod error;
pub mod schema;

// Re-export commonly used types
pub use animation::{Cassette, CassetteDeck, CassetteRecorder, Frame, PlaybackCursor};
pub use compute::{FlushPhase, FlushStepper};
pub use error::{FlushError, Result};
pub use schema::{FlushConfig, Placement, SourceImage};
