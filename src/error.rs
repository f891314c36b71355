//! Error taxonomy shared by generation, recording and playback.

use std::io;

use crate::schema::ConfigError;

/// Errors produced by the flush engine and the cassette codec.
#[derive(Debug, thiserror::Error)]
pub enum FlushError {
    /// A generator parameter is out of range; nothing was generated.
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The source image could not be loaded or decoded.
    #[error("Cannot load source image: {0}")]
    Resource(String),

    /// The cassette stream is malformed or ends partway through a record.
    #[error("Corrupt cassette: {0}")]
    Corruption(String),

    /// Generation or loading was cancelled.
    #[error("Operation interrupted")]
    Interrupted,

    /// A frame handed to the recorder does not match the cassette size.
    #[error("Frame has {actual} pixels, cassette expects {expected}")]
    FrameSize { expected: usize, actual: usize },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl FlushError {
    /// Classify an I/O error raised while decoding a cassette.
    ///
    /// Early end of stream and undecodable compressed data are corruption;
    /// anything else stays an I/O failure.
    pub(crate) fn from_read(err: io::Error, context: &str) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof | io::ErrorKind::InvalidData => {
                FlushError::Corruption(format!("{}: {}", context, err))
            }
            _ => FlushError::Io(err),
        }
    }
}

/// Result alias for crate operations.
pub type Result<T> = std::result::Result<T, FlushError>;
