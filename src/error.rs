//! Error types for the `framesplit` crate.
//!
//! [`SplitError`] is the single error type returned by every fallible
//! operation. Each variant belongs to one [`FailureKind`], which is what the
//! batch driver looks at when deciding whether a failure is isolated to one
//! video or fatal to the whole run.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    io::Error as IoError,
    path::PathBuf,
};

use image::ImageError;
use thiserror::Error;

/// Coarse classification of a [`SplitError`].
///
/// Only [`FailureKind::Ledger`] (and configuration problems caught before a
/// run starts) abort a batch. Everything else is recorded against the video
/// that caused it and the batch moves on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// A directory could not be created or listed.
    Discovery,
    /// A source video or segment could not be opened or decoded.
    Decode,
    /// A segment or frame could not be written.
    Encode,
    /// The processing ledger could not be read or appended to.
    Ledger,
    /// Invalid settings were supplied.
    Configuration,
}

impl Display for FailureKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            FailureKind::Discovery => "discovery",
            FailureKind::Decode => "decode",
            FailureKind::Encode => "encode",
            FailureKind::Ledger => "ledger",
            FailureKind::Configuration => "configuration",
        };
        f.write_str(name)
    }
}

/// The unified error type for all `framesplit` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SplitError {
    /// The media file could not be opened.
    #[error("Failed to open media file at {path}: {reason}")]
    FileOpen {
        /// Path of the file that failed to open.
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The file does not contain a video stream.
    #[error("No video stream found in {0}")]
    NoVideoStream(PathBuf),

    /// A video frame could not be decoded.
    #[error("Failed to decode video frame: {0}")]
    VideoDecodeError(String),

    /// The audio track of a source could not be decoded.
    #[error("Failed to decode audio: {0}")]
    AudioDecodeError(String),

    /// The container does not report how long it is.
    #[error("Duration of {0} is unknown")]
    UnknownDuration(PathBuf),

    /// Video encoding failed while writing a segment.
    #[error("Video encoding error: {0}")]
    VideoEncodeError(String),

    /// Audio encoding failed while writing a segment.
    #[error("Audio encoding error: {0}")]
    AudioEncodeError(String),

    /// A sampled frame could not be written to disk.
    #[error("Failed to write frame to {path}: {source}")]
    FrameWriteError {
        /// Destination image path.
        path: PathBuf,
        /// Error reported by the image encoder.
        source: ImageError,
    },

    /// A directory could not be created or listed.
    #[error("Cannot access directory {path}: {source}")]
    Discovery {
        /// The directory involved.
        path: PathBuf,
        /// Underlying I/O error.
        source: IoError,
    },

    /// The processing ledger could not be read or written.
    #[error("Ledger store {location} is not accessible: {source}")]
    Ledger {
        /// Human-readable location of the store (a path for file stores).
        location: String,
        /// Underlying I/O error.
        source: IoError,
    },

    /// Segment duration outside the accepted range.
    #[error("Segment duration must be between {min} and {max} seconds (got {value})")]
    InvalidSegmentDuration {
        /// The rejected value.
        value: u64,
        /// Smallest accepted value.
        min: u64,
        /// Largest accepted value.
        max: u64,
    },

    /// A zero watch interval was provided.
    #[error("Watch interval must be greater than zero")]
    InvalidInterval,

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),
}

impl SplitError {
    /// Which failure class this error belongs to.
    pub fn kind(&self) -> FailureKind {
        match self {
            SplitError::FileOpen { .. }
            | SplitError::NoVideoStream(_)
            | SplitError::VideoDecodeError(_)
            | SplitError::AudioDecodeError(_)
            | SplitError::UnknownDuration(_) => FailureKind::Decode,
            SplitError::VideoEncodeError(_)
            | SplitError::AudioEncodeError(_)
            | SplitError::FrameWriteError { .. }
            | SplitError::IoError(_) => FailureKind::Encode,
            SplitError::Discovery { .. } => FailureKind::Discovery,
            SplitError::Ledger { .. } => FailureKind::Ledger,
            SplitError::InvalidSegmentDuration { .. } | SplitError::InvalidInterval => {
                FailureKind::Configuration
            }
        }
    }

    /// Returns `true` for errors that must stop the whole batch.
    pub fn is_fatal(&self) -> bool {
        matches!(self.kind(), FailureKind::Ledger | FailureKind::Configuration)
    }
}
