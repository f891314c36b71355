//! Cassette recording and playback for flush animations.
//!
//! A cassette is a header followed by raw frame records, the whole stream
//! LZ4-frame compressed. There is no frame count or index: readers stop at
//! the end of the stream, and a stream that ends inside a record is corrupt.
//!
//! # File Format
//!
//! ```text
//! Header:
//!   Magic: "FLSH" (4 bytes)
//!   Version: u16
//!   Title: option-string
//!   Sound reference: option-string
//!   Size: i32 (> 0)
//!
//! Frame record (repeated until end of stream):
//!   Pixels: size * size u32, row-major ARGB
//!   Show time: i32 milliseconds (>= 0)
//!
//! option-string:
//!   Present: u8 (0 or 1)
//!   Length: u32, then UTF-8 bytes (only when present)
//! ```
//!
//! All integers are little-endian.

mod deck;
mod format;
mod player;
mod recorder;

pub use deck::CassetteDeck;
pub use format::{
    CASSETTE_MAGIC, CASSETTE_VERSION, CassetteHeader, Frame, MAX_CASSETTE_SIZE, decode_pixels,
    encode_pixels, read_record, write_record,
};
pub use player::{Cassette, CassetteReader, PlaybackCursor};
pub use recorder::{CassetteRecorder, PendingFile, RecordingStats};
