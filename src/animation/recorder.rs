//! Cassette recorder for capturing flush frames.

use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use lz4_flex::frame::FrameEncoder;
use log::{debug, info};
use tempfile::NamedTempFile;

use super::format::{CassetteHeader, Frame, write_record};
use crate::error::{FlushError, Result};

/// Cassette recorder that appends frames to an LZ4-compressed stream.
///
/// Usage:
/// ```ignore
/// let mut recorder = CassetteRecorder::new(std::io::stdout(), header)?;
/// for frame in frames {
///     recorder.record_frame(&frame)?;
/// }
/// recorder.finish()?;
/// ```
pub struct CassetteRecorder<W: Write> {
    encoder: FrameEncoder<W>,
    header: CassetteHeader,
    frames_written: u64,
    total_millis: u64,
    /// Pre-allocated buffer for record encoding.
    encode_buffer: Vec<u8>,
}

impl<W: Write> CassetteRecorder<W> {
    /// Start a cassette on `writer`, writing the header immediately.
    pub fn new(writer: W, header: CassetteHeader) -> Result<Self> {
        let mut encoder = FrameEncoder::new(writer);
        header.write_to(&mut encoder)?;
        debug!(
            "Started cassette {:?}: {}x{} pixels per frame",
            header.title, header.size, header.size
        );

        let record_size = header.record_size();
        Ok(Self {
            encoder,
            header,
            frames_written: 0,
            total_millis: 0,
            encode_buffer: Vec::with_capacity(record_size),
        })
    }

    /// Cassette header.
    pub fn header(&self) -> &CassetteHeader {
        &self.header
    }

    /// Append one frame.
    pub fn record_frame(&mut self, frame: &Frame) -> Result<()> {
        let expected = self.header.frame_len();
        if frame.pixels.len() != expected {
            return Err(FlushError::FrameSize {
                expected,
                actual: frame.pixels.len(),
            });
        }

        write_record(&mut self.encoder, frame, &mut self.encode_buffer)?;
        self.frames_written += 1;
        self.total_millis += frame.show_millis as u64;
        Ok(())
    }

    /// Get number of frames recorded so far.
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Flush the compressed stream and hand back the writer.
    pub fn finish(self) -> Result<(W, RecordingStats)> {
        let mut writer = self.encoder.finish().map_err(io::Error::other)?;
        writer.flush()?;

        let stats = RecordingStats {
            frame_count: self.frames_written,
            logical_bytes: self.frames_written * self.header.record_size() as u64,
            total_millis: self.total_millis,
        };
        info!("Recorded cassette: {}", stats);
        Ok((writer, stats))
    }
}

/// Output file that only appears at its destination once committed.
///
/// Frames go to a temporary file beside the destination. Dropping without
/// [`CassetteRecorder::commit`] removes the temporary, so an existing
/// cassette at the destination is never clobbered by a failed recording.
pub struct PendingFile {
    file: BufWriter<NamedTempFile>,
    destination: PathBuf,
}

impl PendingFile {
    fn create(destination: &Path) -> io::Result<Self> {
        let dir = match destination.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let temp = NamedTempFile::new_in(dir)?;
        Ok(Self {
            file: BufWriter::new(temp),
            destination: destination.to_path_buf(),
        })
    }

    fn persist(self) -> io::Result<PathBuf> {
        let temp = self.file.into_inner().map_err(|e| e.into_error())?;
        temp.as_file().sync_all()?;
        temp.persist(&self.destination).map_err(|e| e.error)?;
        Ok(self.destination)
    }
}

impl Write for PendingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl CassetteRecorder<PendingFile> {
    /// Record to a file at `path`, published atomically by [`Self::commit`].
    pub fn create<P: AsRef<Path>>(path: P, header: CassetteHeader) -> Result<Self> {
        let pending = PendingFile::create(path.as_ref())?;
        Self::new(pending, header)
    }

    /// Finish the stream and move the file into place.
    pub fn commit(self) -> Result<RecordingStats> {
        let (pending, stats) = self.finish()?;
        let path = pending.persist()?;
        debug!("Cassette written to {}", path.display());
        Ok(stats)
    }
}

/// Statistics from a recording session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingStats {
    /// Total frames recorded.
    pub frame_count: u64,
    /// Uncompressed size of the frame records.
    pub logical_bytes: u64,
    /// Sum of frame durations.
    pub total_millis: u64,
}

impl std::fmt::Display for RecordingStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} frames, {} bytes uncompressed, {} ms running time",
            self.frame_count, self.logical_bytes, self.total_millis
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn frame(size: u32, value: u32, millis: u32) -> Frame {
        Frame::new(vec![value; (size * size) as usize], millis)
    }

    #[test]
    fn test_recorder_basic() {
        let mut recorder = CassetteRecorder::new(Vec::new(), CassetteHeader::new(8)).unwrap();
        for i in 0..10 {
            recorder.record_frame(&frame(8, i, 100)).unwrap();
        }
        assert_eq!(recorder.frames_written(), 10);

        let (bytes, stats) = recorder.finish().unwrap();
        assert_eq!(stats.frame_count, 10);
        assert_eq!(stats.total_millis, 1000);
        assert_eq!(stats.logical_bytes, 10 * (8 * 8 * 4 + 4));
        // Uniform frames compress well below their logical size.
        assert!((bytes.len() as u64) < stats.logical_bytes);
    }

    #[test]
    fn test_recorder_rejects_wrong_frame_size() {
        let mut recorder = CassetteRecorder::new(Vec::new(), CassetteHeader::new(4)).unwrap();
        let err = recorder.record_frame(&frame(3, 0, 10)).unwrap_err();
        assert!(matches!(
            err,
            FlushError::FrameSize {
                expected: 16,
                actual: 9
            }
        ));
        assert_eq!(recorder.frames_written(), 0);
    }

    #[test]
    fn test_commit_publishes_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.flsh");

        let mut recorder = CassetteRecorder::create(&path, CassetteHeader::new(4)).unwrap();
        recorder.record_frame(&frame(4, 1, 10)).unwrap();
        assert!(!path.exists());

        let stats = recorder.commit().unwrap();
        assert_eq!(stats.frame_count, 1);
        assert!(path.exists());
        assert!(fs::metadata(&path).unwrap().len() > 0);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_abandoned_recording_keeps_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("keep.flsh");
        fs::write(&path, b"previous cassette").unwrap();

        {
            let mut recorder = CassetteRecorder::create(&path, CassetteHeader::new(4)).unwrap();
            recorder.record_frame(&frame(4, 1, 10)).unwrap();
            // Dropped without commit.
        }

        assert_eq!(fs::read(&path).unwrap(), b"previous cassette");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
