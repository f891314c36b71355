//! Cassette playback: streaming reader, loaded cassette and cursor.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use log::{debug, info};
use lz4_flex::frame::FrameDecoder;

use super::format::{CassetteHeader, Frame, read_record};
use crate::cancel::CancelToken;
use crate::error::{FlushError, Result};

/// Sequential reader over a compressed cassette stream.
///
/// Frames come out one at a time; a corrupt record yields an error after
/// every earlier frame has been returned intact.
///
/// Usage:
/// ```ignore
/// let mut reader = CassetteReader::new(File::open("flush.flsh")?)?;
/// while let Some(frame) = reader.read_frame()? {
///     // Use frame...
/// }
/// ```
pub struct CassetteReader<R: Read> {
    decoder: FrameDecoder<R>,
    header: CassetteHeader,
    frames_read: u64,
    finished: bool,
    /// Record buffer reused across frames.
    decode_buffer: Vec<u8>,
}

impl<R: Read> CassetteReader<R> {
    /// Read the header and position at the first frame.
    pub fn new(reader: R) -> Result<Self> {
        let mut decoder = FrameDecoder::new(reader);
        let header = CassetteHeader::read_from(&mut decoder)?;
        debug!(
            "Cassette header: title={:?} sound={:?} size={}",
            header.title, header.sound_ref, header.size
        );

        Ok(Self {
            decoder,
            header,
            frames_read: 0,
            finished: false,
            decode_buffer: Vec::new(),
        })
    }

    pub fn header(&self) -> &CassetteHeader {
        &self.header
    }

    /// Frames returned so far.
    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// Read the next frame, `Ok(None)` at a clean end of stream.
    ///
    /// After an error or the end of stream every further call returns
    /// `Ok(None)`.
    pub fn read_frame(&mut self) -> Result<Option<Frame>> {
        if self.finished {
            return Ok(None);
        }
        let frame_len = self.header.frame_len();
        match read_record(&mut self.decoder, frame_len, &mut self.decode_buffer) {
            Ok(Some(frame)) => {
                self.frames_read += 1;
                Ok(Some(frame))
            }
            Ok(None) => {
                self.finished = true;
                Ok(None)
            }
            Err(e) => {
                self.finished = true;
                Err(e)
            }
        }
    }
}

impl<R: Read> Iterator for CassetteReader<R> {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_frame().transpose()
    }
}

/// A fully loaded, immutable cassette.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Cassette {
    header: CassetteHeader,
    frames: Vec<Frame>,
}

impl Cassette {
    /// The "no tape loaded" cassette: zero frames.
    pub fn blank() -> Self {
        Self::default()
    }

    /// Assemble a cassette from parts, checking every frame's size.
    pub fn from_frames(header: CassetteHeader, frames: Vec<Frame>) -> Result<Self> {
        let expected = header.frame_len();
        if let Some(bad) = frames.iter().find(|f| f.pixels.len() != expected) {
            return Err(FlushError::FrameSize {
                expected,
                actual: bad.pixels.len(),
            });
        }
        Ok(Self { header, frames })
    }

    /// Decode a whole cassette stream.
    pub fn read_from<R: Read>(reader: R) -> Result<Self> {
        Self::read_with_cancel(reader, &CancelToken::new())
    }

    /// Decode a whole cassette stream, checking `cancel` before each frame.
    pub fn read_with_cancel<R: Read>(reader: R, cancel: &CancelToken) -> Result<Self> {
        let mut reader = CassetteReader::new(reader)?;
        let mut frames = Vec::new();
        loop {
            cancel.check()?;
            match reader.read_frame()? {
                Some(frame) => frames.push(frame),
                None => break,
            }
        }
        info!(
            "Loaded cassette {:?}: {} frames of {}x{}",
            reader.header.title,
            frames.len(),
            reader.header.size,
            reader.header.size
        );
        Ok(Self {
            header: reader.header,
            frames,
        })
    }

    /// Open and decode a cassette file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::read_from(BufReader::new(file))
    }

    pub fn header(&self) -> &CassetteHeader {
        &self.header
    }

    pub fn title(&self) -> Option<&str> {
        self.header.title.as_deref()
    }

    pub fn sound_ref(&self) -> Option<&str> {
        self.header.sound_ref.as_deref()
    }

    /// Canvas side; zero for the blank cassette.
    pub fn size(&self) -> u32 {
        self.header.size
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn is_blank(&self) -> bool {
        self.frames.is_empty()
    }

    /// Total running time in milliseconds.
    pub fn total_millis(&self) -> u64 {
        self.frames.iter().map(|f| f.show_millis as u64).sum()
    }

    /// Cursor positioned at the first frame.
    pub fn cursor(&self) -> PlaybackCursor<'_> {
        PlaybackCursor {
            cassette: self,
            position: 0,
        }
    }
}

/// Read-only position within a cassette.
///
/// The cursor never mutates the cassette. Once past the last frame it stays
/// there: `next` and `current` keep returning `None` until `first`.
#[derive(Debug, Clone)]
pub struct PlaybackCursor<'a> {
    cassette: &'a Cassette,
    position: usize,
}

impl<'a> PlaybackCursor<'a> {
    /// Rewind to frame 0 and return it.
    pub fn first(&mut self) -> Option<&'a Frame> {
        self.position = 0;
        self.current()
    }

    /// Advance one frame and return it.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<&'a Frame> {
        if self.position < self.cassette.frames.len() {
            self.position += 1;
        }
        self.current()
    }

    /// Frame under the cursor.
    pub fn current(&self) -> Option<&'a Frame> {
        self.cassette.frames.get(self.position)
    }

    /// Index of the frame under the cursor.
    pub fn position(&self) -> usize {
        self.position
    }
}
