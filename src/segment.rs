//! Cutting a source video into fixed-length segments.
//!
//! Planning is pure: [`plan_segments`] turns a duration into contiguous
//! whole-second spans. [`Segmenter`] then asks a [`MediaBackend`] to write
//! each span to its own container.
//!
//! For a 12 second source and 5 second segments the plan is
//! `[0,5) [5,10) [10,12)`. For a 10 second source it is `[0,5) [5,10)`;
//! the empty trailing span is never emitted.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    backend::MediaBackend,
    error::SplitError,
    progress::{NoOpProgress, OperationType, ProgressCallback, ProgressTracker},
};

/// Extension of written segment files.
pub const SEGMENT_EXTENSION: &str = "mp4";

/// One planned sub-range of a source, in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SegmentSpan {
    /// Zero-based position in the plan.
    pub index: usize,
    /// Inclusive start offset in seconds.
    pub start: u64,
    /// Exclusive end offset in seconds.
    pub end: u64,
}

impl SegmentSpan {
    /// One-based number used in file names.
    pub fn number(&self) -> usize {
        self.index + 1
    }

    /// Length in seconds.
    pub fn seconds(&self) -> u64 {
        self.end - self.start
    }

    /// Label for this span of the source with stem `stem`,
    /// e.g. `holiday_segment_002`.
    pub fn label(&self, stem: &str) -> String {
        format!("{stem}_segment_{:03}", self.number())
    }
}

/// Split `total_seconds` into spans of at most `segment_seconds`.
///
/// Spans are contiguous, cover `[0, total_seconds)`, and only the last one
/// may be shorter. Zero-length spans are skipped, so a zero duration gives an
/// empty plan. `segment_seconds` must be non-zero.
pub fn plan_segments(total_seconds: u64, segment_seconds: u64) -> Vec<SegmentSpan> {
    debug_assert!(segment_seconds > 0);
    let count = total_seconds / segment_seconds + 1;
    (0..count)
        .filter_map(|index| {
            let start = index * segment_seconds;
            let end = ((index + 1) * segment_seconds).min(total_seconds);
            (end > start).then_some(SegmentSpan {
                index: index as usize,
                start,
                end,
            })
        })
        .collect()
}

/// A segment file written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// The span of the source it covers.
    pub span: SegmentSpan,
    /// File name without extension; also the prefix of its frame files.
    pub label: String,
    /// Where it was written.
    pub path: PathBuf,
}

/// File stem of a source path, used as the segment name prefix.
pub fn source_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string())
}

/// Writes the segments of one source video.
pub struct Segmenter<'a, B: MediaBackend> {
    backend: &'a B,
    progress: Arc<dyn ProgressCallback>,
}

impl<'a, B: MediaBackend> Segmenter<'a, B> {
    /// Segmenter over `backend` with no progress reporting.
    pub fn new(backend: &'a B) -> Self {
        Self {
            backend,
            progress: Arc::new(NoOpProgress),
        }
    }

    /// Report each written segment to `callback`.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Cut `source` into segments of `segment_seconds` under `output_dir`.
    ///
    /// The source is opened before anything is written, so an unreadable
    /// source leaves no output. A failure while writing aborts the remaining
    /// segments; segments already written stay on disk.
    ///
    /// # Errors
    ///
    /// - [`SplitError::InvalidSegmentDuration`] if `segment_seconds` is zero.
    /// - Decode-class errors if the source cannot be opened.
    /// - Encode-class errors if a segment cannot be written.
    pub fn segment(
        &self,
        source: &Path,
        output_dir: &Path,
        segment_seconds: u64,
    ) -> Result<Vec<Segment>, SplitError> {
        if segment_seconds == 0 {
            return Err(SplitError::InvalidSegmentDuration {
                value: 0,
                min: 1,
                max: u64::MAX,
            });
        }

        let duration = self.backend.probe_duration(source)?;
        let spans = plan_segments(duration.as_secs(), segment_seconds);
        let stem = source_stem(source);

        log::debug!(
            "Planned {} segment(s) of {}s for {} ({:.2}s)",
            spans.len(),
            segment_seconds,
            source.display(),
            duration.as_secs_f64(),
        );

        fs::create_dir_all(output_dir).map_err(|source| SplitError::Discovery {
            path: output_dir.to_path_buf(),
            source,
        })?;

        let mut tracker = ProgressTracker::new(
            self.progress.clone(),
            OperationType::Segmenting,
            Some(spans.len() as u64),
        );
        let mut segments = Vec::with_capacity(spans.len());

        for span in spans {
            let label = span.label(&stem);
            let path = output_dir.join(format!("{label}.{SEGMENT_EXTENSION}"));

            self.backend.write_clip(source, &span, &path)?;

            log::info!(
                "Created segment {} [{}s, {}s): {}",
                span.number(),
                span.start,
                span.end,
                path.display(),
            );
            tracker.advance(path.clone());
            segments.push(Segment { span, label, path });
        }

        Ok(segments)
    }
}
