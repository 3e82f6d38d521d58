//! FFmpeg log level configuration.
//!
//! FFmpeg prints its own warnings to stderr independently of the `log`
//! crate. Decoding every source and segment makes that output noisy, so the
//! command-line tool lowers it to errors by default.
//!
//! # Example
//!
//! ```no_run
//! use framesplit::FfmpegLogLevel;
//!
//! framesplit::set_ffmpeg_log_level(FfmpegLogLevel::Quiet);
//! ```

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

use ffmpeg_next::util::log::Level;

/// FFmpeg internal log verbosity level, most quiet first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FfmpegLogLevel {
    /// Print no output at all.
    Quiet,
    /// Unrecoverable errors after which the process aborts.
    Panic,
    /// Unrecoverable errors.
    Fatal,
    /// Recoverable errors.
    Error,
    /// Warnings (FFmpeg's own default).
    Warning,
    /// Informational messages.
    Info,
    /// Verbose informational messages.
    Verbose,
    /// Debugging messages.
    Debug,
    /// Extremely verbose tracing output.
    Trace,
}

/// Accepted spellings, in the order they are listed in error messages.
const NAMES: [(&str, FfmpegLogLevel); 10] = [
    ("quiet", FfmpegLogLevel::Quiet),
    ("panic", FfmpegLogLevel::Panic),
    ("fatal", FfmpegLogLevel::Fatal),
    ("error", FfmpegLogLevel::Error),
    ("warning", FfmpegLogLevel::Warning),
    ("warn", FfmpegLogLevel::Warning),
    ("info", FfmpegLogLevel::Info),
    ("verbose", FfmpegLogLevel::Verbose),
    ("debug", FfmpegLogLevel::Debug),
    ("trace", FfmpegLogLevel::Trace),
];

impl From<FfmpegLogLevel> for Level {
    fn from(level: FfmpegLogLevel) -> Self {
        match level {
            FfmpegLogLevel::Quiet => Level::Quiet,
            FfmpegLogLevel::Panic => Level::Panic,
            FfmpegLogLevel::Fatal => Level::Fatal,
            FfmpegLogLevel::Error => Level::Error,
            FfmpegLogLevel::Warning => Level::Warning,
            FfmpegLogLevel::Info => Level::Info,
            FfmpegLogLevel::Verbose => Level::Verbose,
            FfmpegLogLevel::Debug => Level::Debug,
            FfmpegLogLevel::Trace => Level::Trace,
        }
    }
}

/// A `--ffmpeg-log-level` value that matches none of the known names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLogLevel(pub String);

impl Display for UnknownLogLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let known: Vec<&str> = NAMES.iter().map(|(name, _)| *name).collect();
        write!(
            f,
            "unknown FFmpeg log level '{}' (expected one of: {})",
            self.0,
            known.join(", ")
        )
    }
}

impl std::error::Error for UnknownLogLevel {}

impl FromStr for FfmpegLogLevel {
    type Err = UnknownLogLevel;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim();
        NAMES
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(wanted))
            .map(|(_, level)| *level)
            .ok_or_else(|| UnknownLogLevel(value.to_string()))
    }
}

/// Set the FFmpeg internal log verbosity level.
///
/// Does not affect Rust-side `log` output.
pub fn set_ffmpeg_log_level(level: FfmpegLogLevel) {
    log::debug!("FFmpeg log level set to {level:?}");
    ffmpeg_next::util::log::set_level(level.into());
}
