//! One frame per second from each segment.
//!
//! For a segment of `F` frames at `R` frames per second the duration is
//! `F / R`. Frames are taken at whole seconds `s = 0, 1, 2, ...` while
//! `s <= F / R`, using frame `round(s * R)`. The first frame that cannot be
//! decoded ends sampling for that segment; it is not an error.
//!
//! Numbering restarts at zero for every segment.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    backend::{FrameSource, MediaBackend},
    conversion,
    error::SplitError,
    progress::{NoOpProgress, OperationType, ProgressCallback, ProgressTracker},
};

/// Extension of written frame files.
pub const FRAME_EXTENSION: &str = "png";

/// One planned sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleOffset {
    /// Whole second within the segment.
    pub second: u64,
    /// Frame nearest to that second.
    pub frame_number: u64,
}

/// Plan the per-second samples of a segment.
///
/// A 4.7 second segment yields offsets for seconds 0 through 4. A
/// non-positive frame rate yields nothing.
pub fn sample_offsets(frames_per_second: f64, frame_count: u64) -> Vec<SampleOffset> {
    if frames_per_second <= 0.0 || !frames_per_second.is_finite() {
        return Vec::new();
    }
    let duration = frame_count as f64 / frames_per_second;
    (0u64..)
        .take_while(|&second| second as f64 <= duration)
        .map(|second| SampleOffset {
            second,
            frame_number: conversion::seconds_to_frame_number(second as f64, frames_per_second),
        })
        .collect()
}

/// File name for the frame sampled at `second` of segment `label`,
/// e.g. `holiday_segment_001_frame_004.png`.
pub fn frame_file_name(label: &str, second: u64) -> String {
    format!("{label}_frame_{second:03}.{FRAME_EXTENSION}")
}

/// Samples frames from segment files.
pub struct FrameSampler<'a, B: MediaBackend> {
    backend: &'a B,
    progress: Arc<dyn ProgressCallback>,
}

impl<'a, B: MediaBackend> FrameSampler<'a, B> {
    /// Sampler over `backend` with no progress reporting.
    pub fn new(backend: &'a B) -> Self {
        Self {
            backend,
            progress: Arc::new(NoOpProgress),
        }
    }

    /// Report each written frame to `callback`.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Write one PNG per whole second of `segment` into `output_dir`.
    ///
    /// Returns the number of frames written.
    ///
    /// # Errors
    ///
    /// - Decode-class errors if the segment cannot be opened.
    /// - [`SplitError::FrameWriteError`] if an image cannot be saved.
    pub fn sample(&self, segment: &Path, output_dir: &Path, label: &str) -> Result<u64, SplitError> {
        let mut source = self.backend.open_frames(segment)?;
        let frames_per_second = source.frames_per_second();
        let frame_count = source.frame_count();
        if frames_per_second <= 0.0 {
            return Err(SplitError::VideoDecodeError(format!(
                "{} reports no usable frame rate",
                segment.display()
            )));
        }

        fs::create_dir_all(output_dir).map_err(|source| SplitError::Discovery {
            path: output_dir.to_path_buf(),
            source,
        })?;

        let offsets = sample_offsets(frames_per_second, frame_count);
        let mut tracker = ProgressTracker::new(
            self.progress.clone(),
            OperationType::Sampling,
            Some(offsets.len() as u64),
        );
        let mut written = 0;

        for offset in offsets {
            let image = match source.decode_frame(offset.frame_number) {
                Ok(image) => image,
                Err(error) => {
                    log::debug!(
                        "Sampling of {} stopped at {}s (frame {}): {error}",
                        segment.display(),
                        offset.second,
                        offset.frame_number,
                    );
                    break;
                }
            };

            let path: PathBuf = output_dir.join(frame_file_name(label, offset.second));
            image
                .save(&path)
                .map_err(|source| SplitError::FrameWriteError {
                    path: path.clone(),
                    source,
                })?;
            log::info!("Saved frame: {}", path.display());

            tracker.advance(path);
            written += 1;
        }

        Ok(written)
    }
}
