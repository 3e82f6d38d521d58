//! One pass over the input directory.
//!
//! [`BatchDriver::run_once`] lists candidate videos, consults the
//! [`Ledger`], and for each new video runs the [`Segmenter`] and then the
//! [`FrameSampler`] on every segment it produced. Failures are isolated per
//! video and come back as [`VideoOutcome::Failed`]; only ledger errors end
//! the pass early.
//!
//! A video is marked processed once its segments are all written, even if
//! frame sampling failed for some of them. Those failures are counted in
//! [`VideoOutcome::Processed::sampling_failures`] and are not retried.

use std::{
    ffi::OsStr,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    backend::MediaBackend,
    config::SplitConfig,
    error::{FailureKind, SplitError},
    fingerprint::Fingerprint,
    ledger::{Ledger, LedgerBackend},
    progress::{NoOpProgress, ProgressCallback},
    sampler::FrameSampler,
    segment::{Segment, Segmenter},
};

/// What happened to one candidate video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoOutcome {
    /// Segmented, sampled, and recorded in the ledger.
    Processed {
        /// Segments written, in order.
        segments: Vec<Segment>,
        /// Frames written across all segments.
        frames: u64,
        /// Segments whose sampling failed.
        sampling_failures: usize,
    },
    /// Already in the ledger; nothing was done.
    Skipped,
    /// Processing stopped; the ledger was not updated.
    Failed {
        /// Failure class.
        kind: FailureKind,
        /// Human-readable cause.
        reason: String,
    },
}

/// Outcome for one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoReport {
    /// The source video.
    pub path: PathBuf,
    /// What happened to it.
    pub outcome: VideoOutcome,
}

/// Result of one [`BatchDriver::run_once`] pass, in listing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// One entry per candidate video.
    pub videos: Vec<VideoReport>,
}

impl BatchReport {
    /// `true` if no candidate videos were found.
    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
    }

    /// Number of videos processed in this pass.
    pub fn processed(&self) -> usize {
        self.count(|outcome| matches!(outcome, VideoOutcome::Processed { .. }))
    }

    /// Number of videos skipped as already processed.
    pub fn skipped(&self) -> usize {
        self.count(|outcome| matches!(outcome, VideoOutcome::Skipped))
    }

    /// Number of videos that failed.
    pub fn failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, VideoOutcome::Failed { .. }))
    }

    /// Total frames written in this pass.
    pub fn frames(&self) -> u64 {
        self.videos
            .iter()
            .map(|video| match &video.outcome {
                VideoOutcome::Processed { frames, .. } => *frames,
                _ => 0,
            })
            .sum()
    }

    fn count(&self, predicate: impl Fn(&VideoOutcome) -> bool) -> usize {
        self.videos
            .iter()
            .filter(|video| predicate(&video.outcome))
            .count()
    }
}

/// List the regular files directly under `dir` whose extension is in
/// `extensions` (lowercase, no dot), compared case-insensitively.
///
/// Results are sorted by path so runs are reproducible.
///
/// # Errors
///
/// Returns [`SplitError::Discovery`] if the directory cannot be read.
pub fn discover_videos(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>, SplitError> {
    let discovery_error = |source| SplitError::Discovery {
        path: dir.to_path_buf(),
        source,
    };

    let mut videos = Vec::new();
    for entry in fs::read_dir(dir).map_err(discovery_error)? {
        let path = entry.map_err(discovery_error)?.path();
        if !path.is_file() {
            continue;
        }
        let matches = path
            .extension()
            .and_then(OsStr::to_str)
            .map(str::to_ascii_lowercase)
            .is_some_and(|extension| extensions.contains(&extension));
        if matches {
            videos.push(path);
        }
    }
    videos.sort();
    Ok(videos)
}

/// Runs segmentation and sampling over a directory of videos.
pub struct BatchDriver<B: MediaBackend> {
    config: SplitConfig,
    backend: B,
    progress: Arc<dyn ProgressCallback>,
}

impl<B: MediaBackend> BatchDriver<B> {
    /// Driver for `config` using `backend` for all media work.
    pub fn new(config: SplitConfig, backend: B) -> Self {
        Self {
            config,
            backend,
            progress: Arc::new(NoOpProgress),
        }
    }

    /// Forward segment and frame progress to `callback`.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// The configuration this driver runs with.
    pub fn config(&self) -> &SplitConfig {
        &self.config
    }

    /// The media backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Process every new video in the input directory once.
    ///
    /// Creates the input, segment, and frame directories if missing. Videos
    /// are handled one at a time in sorted order.
    ///
    /// # Errors
    ///
    /// - [`SplitError::Discovery`] if a directory cannot be created or the
    ///   input directory cannot be listed.
    /// - [`SplitError::Ledger`] if the ledger cannot be read or appended to.
    ///   The pass stops at that video.
    pub fn run_once<L: LedgerBackend>(
        &self,
        ledger: &mut Ledger<L>,
    ) -> Result<BatchReport, SplitError> {
        for dir in [
            self.config.input_dir(),
            self.config.segment_dir(),
            self.config.frame_dir(),
        ] {
            fs::create_dir_all(dir).map_err(|source| SplitError::Discovery {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let videos = discover_videos(self.config.input_dir(), self.config.extensions())?;
        if videos.is_empty() {
            log::info!("No videos found in {}", self.config.input_dir().display());
            return Ok(BatchReport::default());
        }
        log::debug!("Found {} candidate video(s)", videos.len());

        let mut report = BatchReport::default();
        for path in videos {
            let outcome = self.process(&path, ledger)?;
            report.videos.push(VideoReport { path, outcome });
        }

        log::info!(
            "Pass finished: {} processed, {} skipped, {} failed",
            report.processed(),
            report.skipped(),
            report.failed(),
        );
        Ok(report)
    }

    fn process<L: LedgerBackend>(
        &self,
        path: &Path,
        ledger: &mut Ledger<L>,
    ) -> Result<VideoOutcome, SplitError> {
        let fingerprint = match Fingerprint::of(path) {
            Ok(fingerprint) => fingerprint,
            Err(error) => {
                log::warn!("Cannot read {}: {error}", path.display());
                return Ok(VideoOutcome::Failed {
                    kind: FailureKind::Discovery,
                    reason: error.to_string(),
                });
            }
        };

        if ledger.is_processed(&fingerprint)? {
            log::info!("Skipping already processed video: {}", path.display());
            return Ok(VideoOutcome::Skipped);
        }

        log::info!("Processing video: {}", path.display());

        let segmenter = Segmenter::new(&self.backend).with_progress(self.progress.clone());
        let segments =
            match segmenter.segment(path, self.config.segment_dir(), self.config.segment_duration())
            {
                Ok(segments) => segments,
                Err(error) if error.is_fatal() => return Err(error),
                Err(error) => {
                    log::warn!("Error processing {}: {error}", path.display());
                    return Ok(VideoOutcome::Failed {
                        kind: error.kind(),
                        reason: error.to_string(),
                    });
                }
            };

        let sampler = FrameSampler::new(&self.backend).with_progress(self.progress.clone());
        let mut frames = 0;
        let mut sampling_failures = 0;
        for segment in &segments {
            match sampler.sample(&segment.path, self.config.frame_dir(), &segment.label) {
                Ok(count) => frames += count,
                Err(error) => {
                    sampling_failures += 1;
                    log::warn!(
                        "Failed to extract frames from {}: {error}",
                        segment.path.display()
                    );
                }
            }
        }

        ledger.mark_processed(&fingerprint)?;
        log::info!(
            "Finished {}: {} segment(s), {} frame(s)",
            path.display(),
            segments.len(),
            frames,
        );

        Ok(VideoOutcome::Processed {
            segments,
            frames,
            sampling_failures,
        })
    }
}
