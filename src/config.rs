//! Run configuration.
//!
//! [`SplitConfig`] is a builder that carries the directory layout, segment
//! duration, ledger location, accepted extensions, and encoding settings
//! through the batch driver without threading each value separately.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use framesplit::SplitConfig;
//!
//! let config = SplitConfig::new()
//!     .with_input_dir("incoming")
//!     .with_segment_duration(8)
//!     .with_watch_interval(Duration::from_secs(30));
//! config.validate().unwrap();
//! ```

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{encode::EncodeOptions, error::SplitError};

/// Default directory scanned for source videos.
pub const DEFAULT_INPUT_DIR: &str = "BeforeSplit";
/// Default directory receiving segment files.
pub const DEFAULT_SEGMENT_DIR: &str = "AfterSplit";
/// Default directory receiving sampled frames.
pub const DEFAULT_FRAME_DIR: &str = "ExtractedFrames";
/// Ledger file name, relative to the working directory.
pub const DEFAULT_LEDGER_FILE: &str = ".processed_videos";
/// Default segment length in seconds.
pub const DEFAULT_SEGMENT_SECONDS: u64 = 5;
/// Shortest accepted segment length in seconds.
pub const MIN_SEGMENT_SECONDS: u64 = 5;
/// Longest accepted segment length in seconds.
pub const MAX_SEGMENT_SECONDS: u64 = 10;
/// Default pause between watch-mode cycles.
pub const DEFAULT_WATCH_INTERVAL: Duration = Duration::from_secs(60);
/// Source extensions picked up by discovery (compared case-insensitively).
pub const SUPPORTED_EXTENSIONS: [&str; 6] = ["mp4", "avi", "mov", "mkv", "wmv", "flv"];

/// Settings for a batch run.
#[derive(Debug, Clone)]
pub struct SplitConfig {
    pub(crate) input_dir: PathBuf,
    pub(crate) segment_dir: PathBuf,
    pub(crate) frame_dir: PathBuf,
    pub(crate) ledger_path: PathBuf,
    pub(crate) segment_duration: u64,
    pub(crate) watch_interval: Duration,
    pub(crate) extensions: Vec<String>,
    pub(crate) encode: EncodeOptions,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SplitConfig {
    /// Configuration with the default layout and a 5 second segment length.
    pub fn new() -> Self {
        Self {
            input_dir: PathBuf::from(DEFAULT_INPUT_DIR),
            segment_dir: PathBuf::from(DEFAULT_SEGMENT_DIR),
            frame_dir: PathBuf::from(DEFAULT_FRAME_DIR),
            ledger_path: PathBuf::from(DEFAULT_LEDGER_FILE),
            segment_duration: DEFAULT_SEGMENT_SECONDS,
            watch_interval: DEFAULT_WATCH_INTERVAL,
            extensions: SUPPORTED_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            encode: EncodeOptions::default(),
        }
    }

    /// Directory scanned for source videos.
    #[must_use]
    pub fn with_input_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.input_dir = path.as_ref().to_path_buf();
        self
    }

    /// Directory receiving segment files.
    #[must_use]
    pub fn with_segment_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.segment_dir = path.as_ref().to_path_buf();
        self
    }

    /// Directory receiving sampled frames.
    #[must_use]
    pub fn with_frame_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.frame_dir = path.as_ref().to_path_buf();
        self
    }

    /// Location of the ledger file. The command-line tool never changes this.
    #[must_use]
    pub fn with_ledger_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.ledger_path = path.as_ref().to_path_buf();
        self
    }

    /// Segment length in whole seconds.
    #[must_use]
    pub fn with_segment_duration(mut self, seconds: u64) -> Self {
        self.segment_duration = seconds;
        self
    }

    /// Pause between watch-mode cycles.
    #[must_use]
    pub fn with_watch_interval(mut self, interval: Duration) -> Self {
        self.watch_interval = interval;
        self
    }

    /// Replace the accepted extensions. Leading dots and case are ignored.
    #[must_use]
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
            .collect();
        self
    }

    /// Encoder settings for segments.
    #[must_use]
    pub fn with_encode_options(mut self, options: EncodeOptions) -> Self {
        self.encode = options;
        self
    }

    /// Check that the settings are usable.
    ///
    /// # Errors
    ///
    /// - [`SplitError::InvalidSegmentDuration`] if the segment length is
    ///   outside `5..=10` seconds.
    /// - [`SplitError::InvalidInterval`] if the watch interval is zero.
    pub fn validate(&self) -> Result<(), SplitError> {
        if !(MIN_SEGMENT_SECONDS..=MAX_SEGMENT_SECONDS).contains(&self.segment_duration) {
            return Err(SplitError::InvalidSegmentDuration {
                value: self.segment_duration,
                min: MIN_SEGMENT_SECONDS,
                max: MAX_SEGMENT_SECONDS,
            });
        }
        if self.watch_interval.is_zero() {
            return Err(SplitError::InvalidInterval);
        }
        Ok(())
    }

    /// Directory scanned for source videos.
    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    /// Directory receiving segment files.
    pub fn segment_dir(&self) -> &Path {
        &self.segment_dir
    }

    /// Directory receiving sampled frames.
    pub fn frame_dir(&self) -> &Path {
        &self.frame_dir
    }

    /// Location of the ledger file.
    pub fn ledger_path(&self) -> &Path {
        &self.ledger_path
    }

    /// Segment length in whole seconds.
    pub fn segment_duration(&self) -> u64 {
        self.segment_duration
    }

    /// Pause between watch-mode cycles.
    pub fn watch_interval(&self) -> Duration {
        self.watch_interval
    }

    /// Accepted source extensions, lowercase and without dots.
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Encoder settings for segments.
    pub fn encode_options(&self) -> &EncodeOptions {
        &self.encode
    }
}
