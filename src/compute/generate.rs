//! Frame generation: drives a stepper through a full cycle and records it.

use std::io::Write;
use std::path::Path;

use log::info;

use super::stepper::FlushStepper;
use crate::animation::{CassetteHeader, CassetteRecorder, Frame, RecordingStats};
use crate::cancel::CancelToken;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Initial,
    Flushing,
    Done,
}

/// Iterator over every frame of one flush cycle.
///
/// Yields the source frame, one frame per tick until the bowl is drained,
/// then the recharge frame.
pub struct FlushFrames {
    stepper: FlushStepper,
    stage: Stage,
}

impl FlushFrames {
    pub fn new(stepper: FlushStepper) -> Self {
        Self {
            stepper,
            stage: Stage::Initial,
        }
    }

    pub fn stepper(&self) -> &FlushStepper {
        &self.stepper
    }
}

impl Iterator for FlushFrames {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        match self.stage {
            Stage::Initial => {
                self.stage = Stage::Flushing;
                Some(self.stepper.initial_frame())
            }
            Stage::Flushing => match self.stepper.advance_tick() {
                Some(frame) => Some(frame),
                None => {
                    self.stage = Stage::Done;
                    Some(self.stepper.recharge_frame())
                }
            },
            Stage::Done => None,
        }
    }
}

impl FlushStepper {
    /// Consume the stepper as a frame iterator.
    pub fn into_frames(self) -> FlushFrames {
        FlushFrames::new(self)
    }
}

/// Summary of one generated cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GenerationStats {
    /// Fragments cut from the source.
    pub fragments: usize,
    /// Spirals traced.
    pub spirals: usize,
    /// Ticks until drained.
    pub ticks: u64,
    /// Frames emitted, including the source and recharge frames.
    pub frames: u64,
}

/// Run `stepper` to completion, feeding every frame to `recorder`.
///
/// `cancel` is checked before each frame. On error the recorder has seen a
/// prefix of the cycle and should be dropped.
pub fn record_flush<W: Write>(
    stepper: FlushStepper,
    recorder: &mut CassetteRecorder<W>,
    cancel: &CancelToken,
) -> Result<GenerationStats> {
    let fragments = stepper.live_count();
    let spirals = stepper.spirals().len();
    let mut frames = stepper.into_frames();
    let mut count = 0u64;

    loop {
        cancel.check()?;
        let Some(frame) = frames.next() else { break };
        recorder.record_frame(&frame)?;
        count += 1;
    }

    Ok(GenerationStats {
        fragments,
        spirals,
        ticks: frames.stepper().tick(),
        frames: count,
    })
}

/// Stream a full cycle into `writer`, returning it once the cassette is
/// finished.
///
/// Compressed blocks reach `writer` as they fill, so an interrupted run
/// leaves a partial stream behind.
pub fn record_to_writer<W: Write>(
    stepper: FlushStepper,
    header: CassetteHeader,
    writer: W,
    cancel: &CancelToken,
) -> Result<(W, RecordingStats, GenerationStats)> {
    let mut recorder = CassetteRecorder::new(writer, header)?;
    let generation = record_flush(stepper, &mut recorder, cancel)?;
    let (writer, recording) = recorder.finish()?;
    Ok((writer, recording, generation))
}

/// Generate a full cycle into an in-memory cassette.
pub fn record_to_vec(
    stepper: FlushStepper,
    header: CassetteHeader,
    cancel: &CancelToken,
) -> Result<(Vec<u8>, GenerationStats)> {
    let (bytes, _, generation) = record_to_writer(stepper, header, Vec::new(), cancel)?;
    Ok((bytes, generation))
}

/// Generate a full cycle into a cassette file.
///
/// The file only appears once the whole cycle has been written; a failed or
/// cancelled run leaves any existing file at `path` untouched.
pub fn record_to_file<P: AsRef<Path>>(
    stepper: FlushStepper,
    header: CassetteHeader,
    path: P,
    cancel: &CancelToken,
) -> Result<(RecordingStats, GenerationStats)> {
    let path = path.as_ref();
    let mut recorder = CassetteRecorder::create(path, header)?;
    let generation = record_flush(stepper, &mut recorder, cancel)?;
    let recording = recorder.commit()?;
    info!("Recorded {} to {}", recording, path.display());
    Ok((recording, generation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::Cassette;
    use crate::compute::canvas::Canvas;
    use crate::error::FlushError;
    use crate::schema::{FlushConfig, RechargeMode};
    use std::fs;
    use std::io::{self, Cursor};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    fn config(seed: u64) -> FlushConfig {
        FlushConfig {
            num_spiral: 4,
            random_seed: Some(seed),
            ..FlushConfig::for_size(48)
        }
    }

    fn source(size: u32) -> Canvas {
        let pixels = (0..size * size)
            .map(|i| 0xFF00_0000 | ((i % size) << 16) | ((i / size) << 8))
            .collect();
        Canvas::from_pixels(size, pixels).unwrap()
    }

    fn header() -> CassetteHeader {
        CassetteHeader::new(48).with_title("Test flush")
    }

    #[test]
    fn test_frame_sequence_shape() {
        let stepper = FlushStepper::new(config(3), source(48)).unwrap();
        let frames: Vec<Frame> = stepper.into_frames().collect();
        assert!(frames.len() >= 3);

        let first = &frames[0];
        assert_eq!(first.pixels, source(48).into_pixels());
        assert_eq!(first.show_millis, 100);

        let last = frames.last().unwrap();
        assert_eq!(last.show_millis, 3000);
        for frame in &frames[..frames.len() - 1] {
            assert_eq!(frame.show_millis, 100);
        }
    }

    #[test]
    fn test_iterator_is_fused() {
        let stepper = FlushStepper::new(config(3), source(48)).unwrap();
        let mut frames = stepper.into_frames();
        while frames.next().is_some() {}
        assert!(frames.next().is_none());
        assert!(frames.next().is_none());
    }

    #[test]
    fn test_same_seed_byte_identical() {
        let a = FlushStepper::new(config(11), source(48)).unwrap();
        let b = FlushStepper::new(config(11), source(48)).unwrap();
        let (bytes_a, stats_a) = record_to_vec(a, header(), &CancelToken::new()).unwrap();
        let (bytes_b, stats_b) = record_to_vec(b, header(), &CancelToken::new()).unwrap();
        assert_eq!(stats_a, stats_b);
        assert_eq!(bytes_a, bytes_b);
    }

    #[test]
    fn test_recording_plays_back() {
        let stepper = FlushStepper::new(config(5), source(48)).unwrap();
        let expected: Vec<Frame> = FlushStepper::new(config(5), source(48))
            .unwrap()
            .into_frames()
            .collect();

        let (bytes, stats) = record_to_vec(stepper, header(), &CancelToken::new()).unwrap();
        assert_eq!(stats.frames, expected.len() as u64);
        assert_eq!(stats.ticks + 2, stats.frames);

        let cassette = Cassette::read_from(Cursor::new(bytes)).unwrap();
        assert_eq!(cassette.title(), Some("Test flush"));
        assert_eq!(cassette.frames(), &expected[..]);
    }

    /// Writer that cancels generation as soon as any bytes arrive.
    struct CancelOnWrite {
        cancel: CancelToken,
        written: Arc<AtomicUsize>,
    }

    impl Write for CancelOnWrite {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.written.fetch_add(buf.len(), Ordering::Relaxed);
            self.cancel.cancel();
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_writer_receives_frames_before_finish() {
        let config = FlushConfig {
            num_spiral: 4,
            random_seed: Some(1),
            ..FlushConfig::for_size(128)
        };
        let stepper = FlushStepper::new(config, source(128)).unwrap();
        let cancel = CancelToken::new();
        let written = Arc::new(AtomicUsize::new(0));
        let writer = CancelOnWrite {
            cancel: cancel.clone(),
            written: Arc::clone(&written),
        };

        let result = record_to_writer(stepper, CassetteHeader::new(128), writer, &cancel);
        assert!(matches!(result, Err(FlushError::Interrupted)));
        assert!(written.load(Ordering::Relaxed) > 0);
    }

    #[test]
    fn test_writer_and_vec_agree() {
        let a = FlushStepper::new(config(4), source(48)).unwrap();
        let b = FlushStepper::new(config(4), source(48)).unwrap();
        let (bytes, _) = record_to_vec(a, header(), &CancelToken::new()).unwrap();
        let (streamed, recording, generation) =
            record_to_writer(b, header(), Vec::new(), &CancelToken::new()).unwrap();
        assert_eq!(bytes, streamed);
        assert_eq!(recording.frame_count, generation.frames);
    }

    #[test]
    fn test_restore_mode_loops_cleanly() {
        let config = FlushConfig {
            recharge: RechargeMode::Restore,
            ..config(9)
        };
        let frames: Vec<Frame> = FlushStepper::new(config, source(48))
            .unwrap()
            .into_frames()
            .collect();
        assert_eq!(frames.first().unwrap().pixels, frames.last().unwrap().pixels);
    }

    #[test]
    fn test_record_to_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("flush.flsh");
        let stepper = FlushStepper::new(config(2), source(48)).unwrap();
        let (recording, generation) =
            record_to_file(stepper, header(), &path, &CancelToken::new()).unwrap();
        assert_eq!(recording.frame_count, generation.frames);

        let cassette = Cassette::open(&path).unwrap();
        assert_eq!(cassette.frame_count() as u64, generation.frames);
    }

    #[test]
    fn test_cancelled_generation_writes_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cancelled.flsh");
        fs::write(&path, b"previous").unwrap();

        let cancel = CancelToken::new();
        cancel.cancel();
        let stepper = FlushStepper::new(config(2), source(48)).unwrap();
        let result = record_to_file(stepper, header(), &path, &cancel);
        assert!(matches!(result, Err(FlushError::Interrupted)));
        assert_eq!(fs::read(&path).unwrap(), b"previous");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_header_size_mismatch_fails() {
        let stepper = FlushStepper::new(config(2), source(48)).unwrap();
        let result = record_to_vec(stepper, CassetteHeader::new(32), &CancelToken::new());
        assert!(matches!(result, Err(FlushError::FrameSize { .. })));
    }
}
